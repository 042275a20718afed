//! Extraction of the JSON document from a model response.

/// Returns the body of the first markdown code fence in `content`, or the
/// trimmed content when it carries no fence.
///
/// A fence opener may name a language (```` ```json ````); an unterminated
/// fence runs to the end of the content.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[open + 3..];
    // Skip the language tag on the opener line.
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
    let body = &after_open[body_start..];

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_is_trimmed() {
        assert_eq!(strip_code_fence("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_json_fence() {
        let content = "```json\n{\"name\": \"orders\"}\n```";
        assert_eq!(strip_code_fence(content), "{\"name\": \"orders\"}");
    }

    #[test]
    fn test_bare_fence_with_prose() {
        let content = "Here is the pipeline:\n```\n{\"steps\": []}\n```\nLet me know.";
        assert_eq!(strip_code_fence(content), "{\"steps\": []}");
    }

    #[test]
    fn test_unterminated_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_empty() {
        assert_eq!(strip_code_fence("   "), "");
        assert_eq!(strip_code_fence("```\n```"), "");
    }
}
