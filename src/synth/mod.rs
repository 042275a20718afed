//! Pipeline synthesis from a natural-language description.
//!
//! The synthesizer sends one structured request `{description, sources}` to
//! the generative service and converts its answer into a validated
//! [`PipelineConfig`]. Nothing leaves this module unless it passed
//! validation.

pub mod response;

use std::sync::Arc;

use serde::Serialize;

use crate::error::SynthesisError;
use crate::inspect::SchemaSummary;
use crate::llm::{GenerationRequest, LlmProvider, Message, DEFAULT_MODEL};
use crate::pipeline::PipelineConfig;

pub use response::strip_code_fence;

/// Default sampling temperature; low to keep answers close to deterministic.
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

/// System prompt fixing the response format.
const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You design data pipelines.

The user message is a JSON object with:
- "description": what the pipeline must do, in plain language
- "sources": schema summaries of the input sources, each with "columns", "dtypes" and "row_count"

Answer with exactly one JSON object describing the pipeline:
{
  "name": "short_snake_case_name",
  "steps": [
    {"type": "extract|filter|map|join|aggregate|load|...", "...": "step parameters"}
  ]
}

Every step needs a non-empty string "type". Additional top-level keys are allowed.
IMPORTANT: Output ONLY the JSON object, no additional text."#;

/// The request payload sent as the single user message.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest<'a> {
    pub description: &'a str,
    pub sources: &'a [SchemaSummary],
}

impl SynthesisRequest<'_> {
    /// Serializes the request into the user message text.
    pub fn to_prompt(&self) -> Result<String, SynthesisError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Model parameters used for synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// Model identifier sent with each request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Optional cap on response tokens.
    pub max_tokens: Option<u32>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

impl SynthesisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the temperature (clamped to 0.0-2.0).
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Turns descriptions plus source schemas into pipeline configurations.
///
/// Holds no state besides its client and parameters, so one instance can
/// serve many concurrent calls.
pub struct PipelineSynthesizer {
    llm_client: Arc<dyn LlmProvider>,
    config: SynthesisConfig,
}

impl std::fmt::Debug for PipelineSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineSynthesizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineSynthesizer {
    pub fn new(llm_client: Arc<dyn LlmProvider>, config: SynthesisConfig) -> Self {
        Self { llm_client, config }
    }

    pub fn with_defaults(llm_client: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm_client, SynthesisConfig::default())
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Synthesizes a pipeline configuration.
    ///
    /// # Errors
    ///
    /// - [`SynthesisError::Service`] if the service call fails
    /// - [`SynthesisError::Parse`] if the answer is empty or not JSON
    /// - [`SynthesisError::InvalidConfig`] if the JSON is not a valid config
    pub async fn synthesize(
        &self,
        description: &str,
        sources: &[SchemaSummary],
    ) -> Result<PipelineConfig, SynthesisError> {
        let prompt = SynthesisRequest {
            description,
            sources,
        }
        .to_prompt()?;

        let mut request = GenerationRequest::new(
            self.config.model.clone(),
            vec![Message::system(SYNTHESIS_SYSTEM_PROMPT), Message::user(prompt)],
        )
        .with_temperature(self.config.temperature);
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::info!(
            model = %self.config.model,
            sources = sources.len(),
            "Synthesizing pipeline"
        );

        let response = self.llm_client.generate(request).await?;
        tracing::debug!(
            response_id = %response.id,
            total_tokens = response.usage.total_tokens,
            "Synthesis response received"
        );

        let content = response
            .first_content()
            .ok_or_else(|| SynthesisError::Parse("response has no choices".to_string()))?;

        parse_config(content)
    }
}

/// Parses a model answer into a validated [`PipelineConfig`].
pub fn parse_config(content: &str) -> Result<PipelineConfig, SynthesisError> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err(SynthesisError::Parse("empty response".to_string()));
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| SynthesisError::Parse(e.to_string()))?;

    Ok(PipelineConfig::from_value(value)?)
}
