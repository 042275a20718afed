//! Database schema constants for the pipeline store.
//!
//! Every statement is guarded with `IF NOT EXISTS` so applying the schema
//! more than once is harmless.

/// Tracks which schema parts have been applied.
pub const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    name        TEXT PRIMARY KEY,
    applied_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)
"#;

/// Pipeline definitions.
pub const CREATE_PIPELINES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS pipelines (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    config      TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    last_run    TEXT,
    status      TEXT NOT NULL DEFAULT 'created',
    error_log   TEXT NOT NULL DEFAULT '[]'
)
"#;

/// Run history. `pipeline_id` is a logical reference only.
pub const CREATE_PIPELINE_RUNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS pipeline_runs (
    id                TEXT PRIMARY KEY,
    pipeline_id       TEXT NOT NULL,
    started_at        TEXT NOT NULL,
    completed_at      TEXT,
    status            TEXT NOT NULL DEFAULT 'pending',
    records_processed INTEGER NOT NULL DEFAULT 0,
    errors            TEXT NOT NULL DEFAULT '[]'
)
"#;

pub const CREATE_PIPELINE_RUNS_PIPELINE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_pipeline_runs_pipeline_id ON pipeline_runs(pipeline_id)";

pub const CREATE_PIPELINES_CREATED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_pipelines_created_at ON pipelines(created_at)";

/// Returns all named schema statements in application order.
pub fn all_schema_statements() -> Vec<(&'static str, &'static str)> {
    vec![
        ("schema_v1_pipelines", CREATE_PIPELINES_TABLE),
        ("schema_v1_pipeline_runs", CREATE_PIPELINE_RUNS_TABLE),
        ("schema_v1_runs_index", CREATE_PIPELINE_RUNS_PIPELINE_INDEX),
        ("schema_v1_pipelines_index", CREATE_PIPELINES_CREATED_INDEX),
    ]
}

/// Table names in the schema.
pub mod tables {
    pub const PIPELINES: &str = "pipelines";
    pub const PIPELINE_RUNS: &str = "pipeline_runs";
    pub const MIGRATIONS: &str = "_migrations";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_schema_statements_order() {
        let statements = all_schema_statements();
        assert_eq!(statements.len(), 4);
        assert!(statements[0].1.contains(tables::PIPELINES));
        assert!(statements[1].1.contains(tables::PIPELINE_RUNS));
        assert!(statements[2].1.contains("CREATE INDEX"));
    }

    #[test]
    fn test_statements_are_idempotent() {
        for (_, sql) in all_schema_statements() {
            assert!(sql.contains("IF NOT EXISTS"), "not idempotent: {}", sql);
        }
        assert!(CREATE_MIGRATIONS_TABLE.contains("IF NOT EXISTS"));
    }
}
