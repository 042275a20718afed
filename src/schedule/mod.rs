//! Scheduling artifacts for an external orchestrator.
//!
//! Renders a pipeline definition into an Airflow DAG module. The rendered
//! task is a placeholder that only logs; the artifact registers the pipeline
//! with the scheduler but does not invoke its transformation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tera::{Context, Tera};

use crate::error::ScheduleError;
use crate::pipeline::PipelineDefinition;

/// Job id used when a pipeline name is empty.
pub const DEFAULT_JOB_ID: &str = "pipeline";

/// Default cadence: once a day.
pub const DEFAULT_CADENCE: &str = "@daily";

/// Default task id inside the DAG.
pub const DEFAULT_TASK_ID: &str = "run_pipeline";

const DAG_TEMPLATE: &str = r#"# Generated by pipeforge for pipeline {{ pipeline_id }}.
from airflow import DAG
from airflow.operators.python import PythonOperator
from datetime import datetime


def run_pipeline():
    print("Running pipeline {{ job_id }}")


with DAG(
    dag_id="{{ job_id }}",
    start_date=datetime({{ start_year }}, {{ start_month }}, {{ start_day }}),
    schedule_interval={{ cadence }},
    catchup={{ catchup }},
) as dag:
    task = PythonOperator(
        task_id={{ task_id }},
        python_callable=run_pipeline,
    )
"#;

/// Derives the scheduler job id from a pipeline name.
///
/// Lower-cases the name and replaces whitespace, and anything else outside
/// `[a-z0-9_.-]`, with `_`. Names that differ only in case or whitespace
/// map to the same id.
pub fn job_id(name: &str) -> String {
    if name.trim().is_empty() {
        return DEFAULT_JOB_ID.to_string();
    }

    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Quotes `value` as a double-quoted Python string literal.
fn python_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Fixed scheduling parameters applied to every rendered pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTemplate {
    pub start_date: NaiveDate,
    /// Cron expression or Airflow preset such as `@daily`.
    pub cadence: String,
    /// Whether the scheduler back-fills runs since `start_date`.
    pub catchup: bool,
    pub task_id: String,
}

impl Default for ScheduleTemplate {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            cadence: DEFAULT_CADENCE.to_string(),
            catchup: false,
            task_id: DEFAULT_TASK_ID.to_string(),
        }
    }
}

impl ScheduleTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    pub fn with_cadence(mut self, cadence: impl Into<String>) -> Self {
        self.cadence = cadence.into();
        self
    }

    pub fn with_catchup(mut self, catchup: bool) -> Self {
        self.catchup = catchup;
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }
}

/// Renders pipeline definitions into Airflow DAG modules.
#[derive(Debug, Clone, Default)]
pub struct ScheduleArtifactGenerator {
    template: ScheduleTemplate,
}

impl ScheduleArtifactGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(template: ScheduleTemplate) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &ScheduleTemplate {
        &self.template
    }

    /// Renders the DAG module for `definition`.
    pub fn render(&self, definition: &PipelineDefinition) -> Result<String, ScheduleError> {
        self.render_named(&definition.name, &definition.id.to_string())
    }

    /// Renders a DAG module for a bare pipeline name.
    pub fn render_for_name(&self, name: &str) -> Result<String, ScheduleError> {
        self.render_named(name, "(unsaved)")
    }

    fn render_named(&self, name: &str, pipeline_id: &str) -> Result<String, ScheduleError> {
        let template = &self.template;

        let mut context = Context::new();
        context.insert("pipeline_id", pipeline_id);
        context.insert("job_id", &job_id(name));
        context.insert("start_year", &template.start_date.year());
        context.insert("start_month", &template.start_date.month());
        context.insert("start_day", &template.start_date.day());
        context.insert("cadence", &python_str(&template.cadence));
        context.insert("catchup", if template.catchup { "True" } else { "False" });
        context.insert("task_id", &python_str(&template.task_id));

        Ok(Tera::one_off(DAG_TEMPLATE, &context, false)?)
    }

    /// Writes `<job_id>.py` for `definition` into `dir`, creating the
    /// directory if needed. Returns the written path.
    pub fn write_schedule(
        &self,
        definition: &PipelineDefinition,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf, ScheduleError> {
        let dir = dir.as_ref();
        let rendered = self.render(definition)?;

        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.py", job_id(&definition.name)));
        fs::write(&path, rendered)?;

        tracing::info!(pipeline_id = %definition.id, path = %path.display(), "Schedule written");
        Ok(path)
    }
}

/// Renders `definition` with the default template.
pub fn render_schedule(definition: &PipelineDefinition) -> Result<String, ScheduleError> {
    ScheduleArtifactGenerator::new().render(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineConfig, PipelineStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn definition(name: &str) -> PipelineDefinition {
        PipelineDefinition {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: "sync orders".to_string(),
            config: PipelineConfig::empty(),
            created_at: Utc::now(),
            last_run: None,
            status: PipelineStatus::Created,
            error_log: Vec::new(),
        }
    }

    #[test]
    fn test_job_id() {
        assert_eq!(job_id("Daily Sync"), "daily_sync");
        assert_eq!(job_id("daily_sync"), "daily_sync");
        assert_eq!(job_id("Orders\tETL v2.1"), "orders_etl_v2.1");
        assert_eq!(job_id("sales/report \"q1\""), "sales_report__q1_");
        assert_eq!(job_id(""), "pipeline");
        assert_eq!(job_id("   "), "pipeline");
    }

    #[test]
    fn test_case_and_whitespace_collide() {
        assert_eq!(job_id("Daily Sync"), job_id("daily\tsync"));
    }

    #[test]
    fn test_render_defaults() {
        let rendered = render_schedule(&definition("Daily Sync")).unwrap();
        assert!(rendered.contains(r#"dag_id="daily_sync""#));
        assert!(rendered.contains("start_date=datetime(2024, 1, 1)"));
        assert!(rendered.contains(r#"schedule_interval="@daily""#));
        assert!(rendered.contains("catchup=False"));
        assert!(rendered.contains(r#"task_id="run_pipeline""#));
        assert!(rendered.contains("python_callable=run_pipeline"));
    }

    #[test]
    fn test_render_empty_name() {
        let rendered = render_schedule(&definition("")).unwrap();
        assert!(rendered.contains(r#"dag_id="pipeline""#));
    }

    #[test]
    fn test_custom_template() {
        let template = ScheduleTemplate::new()
            .with_start_date(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
            .with_cadence("0 3 * * *")
            .with_catchup(true)
            .with_task_id("sync");
        let rendered = ScheduleArtifactGenerator::with_template(template)
            .render_for_name("Nightly")
            .unwrap();

        assert!(rendered.contains(r#"dag_id="nightly""#));
        assert!(rendered.contains("datetime(2025, 6, 15)"));
        assert!(rendered.contains(r#"schedule_interval="0 3 * * *""#));
        assert!(rendered.contains("catchup=True"));
        assert!(rendered.contains(r#"task_id="sync""#));
    }

    #[test]
    fn test_python_str_escapes() {
        assert_eq!(python_str(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(python_str("x\ny"), r#""x\ny""#);
    }

    #[test]
    fn test_write_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dags");
        let definition = definition("Daily Sync");

        let path = ScheduleArtifactGenerator::new()
            .write_schedule(&definition, &out)
            .unwrap();
        assert_eq!(path, out.join("daily_sync.py"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains(&definition.id.to_string()));
    }
}
