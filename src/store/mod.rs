//! SQLite-backed store for pipeline definitions and their run history.
//!
//! The store is the only shared mutable component. It is a cheap `Clone`
//! handle over a connection pool; every mutation touches a single pipeline
//! or run row atomically, and run finalization is a conditional update so
//! that a run can be finalized exactly once.

pub mod schema;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::pipeline::{
    ErrorRecord, PipelineConfig, PipelineDefinition, PipelineRun, PipelineStatus, RunOutcome,
    RunStatus,
};

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT_SECS: u64 = 5;

const PIPELINE_COLUMNS: &str =
    "id, name, description, config, created_at, last_run, status, error_log";
const RUN_COLUMNS: &str =
    "id, pipeline_id, started_at, completed_at, status, records_processed, errors";

/// Run counts for one pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Runs started but not yet finalized.
    pub open: u64,
}

/// Durable repository for pipelines and runs.
#[derive(Debug, Clone)]
pub struct PipelineStore {
    pool: SqlitePool,
}

impl PipelineStore {
    /// Opens (creating if missing) the database at `path` and ensures the
    /// schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let store = Self::from_pool(pool).await?;
        tracing::info!(path = %path.display(), "Pipeline store opened");
        Ok(store)
    }

    /// Wraps an existing pool and ensures the schema exists.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Creates the tables and indexes if they do not exist.
    ///
    /// Idempotent: applied parts are recorded in `_migrations` and skipped,
    /// and every statement is `IF NOT EXISTS` besides.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(schema::CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await?;

        for (name, sql) in schema::all_schema_statements() {
            let applied = sqlx::query("SELECT 1 FROM _migrations WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?
                .is_some();
            if applied {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            sqlx::query(sql).execute(&mut *tx).await?;
            sqlx::query("INSERT OR IGNORE INTO _migrations (name) VALUES (?1)")
                .bind(name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::debug!(migration = name, "Applied schema part");
        }

        Ok(())
    }

    /// Names of the applied schema parts, in application order.
    pub async fn applied_migrations(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT name FROM _migrations ORDER BY applied_at, rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(StoreError::from))
            .collect()
    }

    /// Stores a new pipeline definition with status `created`.
    pub async fn create_pipeline(
        &self,
        name: &str,
        description: &str,
        config: PipelineConfig,
    ) -> Result<PipelineDefinition, StoreError> {
        let definition = PipelineDefinition {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            config,
            created_at: now(),
            last_run: None,
            status: PipelineStatus::Created,
            error_log: Vec::new(),
        };

        sqlx::query(
            "INSERT INTO pipelines (id, name, description, config, created_at, last_run, status, error_log)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, '[]')",
        )
        .bind(definition.id.to_string())
        .bind(&definition.name)
        .bind(&definition.description)
        .bind(serde_json::to_string(&definition.config)?)
        .bind(format_timestamp(&definition.created_at))
        .bind(definition.status.as_str())
        .execute(&self.pool)
        .await?;

        tracing::info!(pipeline_id = %definition.id, name = %definition.name, "Pipeline created");
        Ok(definition)
    }

    /// Inserts a `pending` run for `pipeline_id`.
    ///
    /// The owning pipeline is not touched; its status only changes when the
    /// run is finalized.
    pub async fn record_run_start(&self, pipeline_id: Uuid) -> Result<PipelineRun, StoreError> {
        let run = PipelineRun {
            id: Uuid::new_v4(),
            pipeline_id,
            started_at: now(),
            completed_at: None,
            status: RunStatus::Pending,
            records_processed: 0,
            errors: Vec::new(),
        };

        let inserted = sqlx::query(
            "INSERT INTO pipeline_runs (id, pipeline_id, started_at, completed_at, status, records_processed, errors)
             SELECT ?1, ?2, ?3, NULL, ?4, 0, '[]'
             WHERE EXISTS (SELECT 1 FROM pipelines WHERE id = ?2)",
        )
        .bind(run.id.to_string())
        .bind(pipeline_id.to_string())
        .bind(format_timestamp(&run.started_at))
        .bind(run.status.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        if inserted == 0 {
            return Err(StoreError::PipelineNotFound(pipeline_id.to_string()));
        }

        tracing::info!(run_id = %run.id, pipeline_id = %pipeline_id, "Run started");
        Ok(run)
    }

    /// Finalizes a run and updates its pipeline.
    ///
    /// The run update only matches rows whose `completed_at` is still NULL,
    /// so of two concurrent finalizations exactly one succeeds. On failure a
    /// single [`ErrorRecord`] is appended to the pipeline's error log.
    pub async fn record_run_completion(
        &self,
        run_id: Uuid,
        outcome: RunOutcome,
        records_processed: u64,
        errors: &[String],
    ) -> Result<PipelineRun, StoreError> {
        let finished_at = now();
        let errors_json = serde_json::to_string(errors)?;
        let records = i64::try_from(records_processed)
            .map_err(|_| StoreError::CountOutOfRange(records_processed))?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE pipeline_runs
             SET completed_at = MAX(?1, started_at), status = ?2, records_processed = ?3, errors = ?4
             WHERE id = ?5 AND completed_at IS NULL
             RETURNING {}",
            RUN_COLUMNS
        ))
        .bind(format_timestamp(&finished_at))
        .bind(outcome.run_status().as_str())
        .bind(records)
        .bind(&errors_json)
        .bind(run_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let exists = sqlx::query("SELECT 1 FROM pipeline_runs WHERE id = ?1")
                .bind(run_id.to_string())
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            return Err(if exists {
                StoreError::RunAlreadyFinalized(run_id.to_string())
            } else {
                StoreError::RunNotFound(run_id.to_string())
            });
        };

        let run = run_from_row(&row)?;
        let completed_at = run.completed_at.unwrap_or(finished_at);

        let updated = match outcome {
            RunOutcome::Success => {
                sqlx::query("UPDATE pipelines SET last_run = ?1, status = ?2 WHERE id = ?3")
                    .bind(format_timestamp(&completed_at))
                    .bind(outcome.pipeline_status().as_str())
                    .bind(run.pipeline_id.to_string())
                    .execute(&mut *tx)
                    .await?
            }
            RunOutcome::Failed => {
                let record = ErrorRecord {
                    run_id: Some(run.id),
                    message: failure_message(errors),
                    recorded_at: completed_at,
                };
                sqlx::query(
                    "UPDATE pipelines
                     SET last_run = ?1, status = ?2,
                         error_log = json_insert(COALESCE(error_log, '[]'), '$[#]', json(?3))
                     WHERE id = ?4",
                )
                .bind(format_timestamp(&completed_at))
                .bind(outcome.pipeline_status().as_str())
                .bind(serde_json::to_string(&record)?)
                .bind(run.pipeline_id.to_string())
                .execute(&mut *tx)
                .await?
            }
        };
        if updated.rows_affected() == 0 {
            tracing::warn!(
                run_id = %run.id,
                pipeline_id = %run.pipeline_id,
                "Finalized run belongs to an unknown pipeline"
            );
        }

        tx.commit().await?;

        tracing::info!(
            run_id = %run.id,
            pipeline_id = %run.pipeline_id,
            status = %run.status,
            records_processed = run.records_processed,
            "Run finalized"
        );
        Ok(run)
    }

    /// Loads one pipeline definition.
    pub async fn get_pipeline(&self, id: Uuid) -> Result<PipelineDefinition, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pipelines WHERE id = ?1",
            PIPELINE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::PipelineNotFound(id.to_string()))?;

        pipeline_from_row(&row)
    }

    /// Lists all pipelines, newest first.
    pub async fn list_pipelines(&self) -> Result<Vec<PipelineDefinition>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pipelines ORDER BY created_at DESC, rowid DESC",
            PIPELINE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(pipeline_from_row).collect()
    }

    /// Loads one run.
    pub async fn get_run(&self, id: Uuid) -> Result<PipelineRun, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pipeline_runs WHERE id = ?1",
            RUN_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::RunNotFound(id.to_string()))?;

        run_from_row(&row)
    }

    /// Lists the runs of a pipeline, newest first.
    pub async fn list_runs(&self, pipeline_id: Uuid) -> Result<Vec<PipelineRun>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pipeline_runs WHERE pipeline_id = ?1 ORDER BY started_at DESC, rowid DESC",
            RUN_COLUMNS
        ))
        .bind(pipeline_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(run_from_row).collect()
    }

    /// Counts the runs of a pipeline by outcome.
    pub async fn run_stats(&self, pipeline_id: Uuid) -> Result<RunStats, StoreError> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0) AS succeeded,
                COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) AS failed,
                COALESCE(SUM(CASE WHEN completed_at IS NULL THEN 1 ELSE 0 END), 0) AS open
             FROM pipeline_runs WHERE pipeline_id = ?1",
        )
        .bind(pipeline_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(RunStats {
            total: row.try_get::<i64, _>("total")? as u64,
            succeeded: row.try_get::<i64, _>("succeeded")? as u64,
            failed: row.try_get::<i64, _>("failed")? as u64,
            open: row.try_get::<i64, _>("open")? as u64,
        })
    }
}

/// Current time at the precision the store persists.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// RFC 3339 with fixed microsecond precision, so text order is time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("{} '{}': {}", column, raw, e)))
}

fn parse_uuid(column: &str, raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("{} '{}': {}", column, raw, e)))
}

fn failure_message(errors: &[String]) -> String {
    if errors.is_empty() {
        "run failed without error detail".to_string()
    } else {
        errors.join("; ")
    }
}

fn pipeline_from_row(row: &SqliteRow) -> Result<PipelineDefinition, StoreError> {
    let id: String = row.try_get("id")?;
    let config: String = row.try_get("config")?;
    let created_at: String = row.try_get("created_at")?;
    let last_run: Option<String> = row.try_get("last_run")?;
    let status: String = row.try_get("status")?;
    let error_log: Option<String> = row.try_get("error_log")?;

    Ok(PipelineDefinition {
        id: parse_uuid("pipelines.id", &id)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        config: serde_json::from_str(&config)?,
        created_at: parse_timestamp("pipelines.created_at", &created_at)?,
        last_run: last_run
            .map(|raw| parse_timestamp("pipelines.last_run", &raw))
            .transpose()?,
        status: status.parse().map_err(StoreError::Corrupt)?,
        error_log: match error_log {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        },
    })
}

fn run_from_row(row: &SqliteRow) -> Result<PipelineRun, StoreError> {
    let id: String = row.try_get("id")?;
    let pipeline_id: String = row.try_get("pipeline_id")?;
    let started_at: String = row.try_get("started_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;
    let status: String = row.try_get("status")?;
    let records: i64 = row.try_get("records_processed")?;
    let errors: Option<String> = row.try_get("errors")?;

    Ok(PipelineRun {
        id: parse_uuid("pipeline_runs.id", &id)?,
        pipeline_id: parse_uuid("pipeline_runs.pipeline_id", &pipeline_id)?,
        started_at: parse_timestamp("pipeline_runs.started_at", &started_at)?,
        completed_at: completed_at
            .map(|raw| parse_timestamp("pipeline_runs.completed_at", &raw))
            .transpose()?,
        status: status.parse().map_err(StoreError::Corrupt)?,
        records_processed: u64::try_from(records).map_err(|_| {
            StoreError::Corrupt(format!("pipeline_runs.records_processed {}", records))
        })?,
        errors: match errors {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineStep;
    use std::sync::Arc;

    async fn open_temp() -> (tempfile::TempDir, PipelineStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PipelineStore::open(dir.path().join("pipelines.db"))
            .await
            .unwrap();
        (dir, store)
    }

    async fn schema_objects(store: &PipelineStore) -> Vec<String> {
        sqlx::query("SELECT type || ':' || name AS obj FROM sqlite_master ORDER BY type, name")
            .fetch_all(store.pool())
            .await
            .unwrap()
            .iter()
            .map(|row| row.get::<String, _>("obj"))
            .collect()
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let (_dir, store) = open_temp().await;
        let objects = schema_objects(&store).await;
        let migrations = store.applied_migrations().await.unwrap();
        assert!(objects.contains(&"table:pipelines".to_string()));
        assert!(objects.contains(&"table:pipeline_runs".to_string()));
        assert!(objects.contains(&"index:idx_pipeline_runs_pipeline_id".to_string()));

        for _ in 0..3 {
            store.ensure_schema().await.unwrap();
        }

        assert_eq!(schema_objects(&store).await, objects);
        assert_eq!(store.applied_migrations().await.unwrap(), migrations);
        assert_eq!(migrations.len(), schema::all_schema_statements().len());
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipelines.db");

        let store = PipelineStore::open(&path).await.unwrap();
        let created = store
            .create_pipeline("daily_sync", "sync orders", PipelineConfig::empty())
            .await
            .unwrap();
        store.close().await;

        let store = PipelineStore::open(&path).await.unwrap();
        let loaded = store.get_pipeline(created.id).await.unwrap();
        assert_eq!(loaded.name, "daily_sync");
        assert_eq!(loaded.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_create_pipeline_defaults() {
        let (_dir, store) = open_temp().await;
        let config = PipelineConfig::empty()
            .with_name("orders")
            .with_step(PipelineStep::new("extract").with_param("path", "orders.csv".into()));

        let created = store
            .create_pipeline("orders", "load orders", config.clone())
            .await
            .unwrap();
        assert_eq!(created.status, PipelineStatus::Created);
        assert!(created.last_run.is_none());
        assert!(created.error_log.is_empty());

        let loaded = store.get_pipeline(created.id).await.unwrap();
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.status, PipelineStatus::Created);
        assert!(loaded.last_run.is_none());
    }

    #[tokio::test]
    async fn test_not_found_errors() {
        let (_dir, store) = open_temp().await;
        let missing = Uuid::new_v4();

        assert!(matches!(
            store.get_pipeline(missing).await,
            Err(StoreError::PipelineNotFound(_))
        ));
        assert!(matches!(
            store.record_run_start(missing).await,
            Err(StoreError::PipelineNotFound(_))
        ));
        assert!(matches!(
            store.get_run(missing).await,
            Err(StoreError::RunNotFound(_))
        ));
        assert!(matches!(
            store
                .record_run_completion(missing, RunOutcome::Success, 0, &[])
                .await,
            Err(StoreError::RunNotFound(_))
        ));
        // No run row was left behind by the failed start.
        assert!(store.list_runs(missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_lifecycle_success() {
        let (_dir, store) = open_temp().await;
        let pipeline = store
            .create_pipeline("daily_sync", "sync orders", PipelineConfig::empty())
            .await
            .unwrap();

        let run = store.record_run_start(pipeline.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Pending);
        assert!(!run.is_finalized());
        let before = store.get_pipeline(pipeline.id).await.unwrap();
        assert_eq!(before.status, PipelineStatus::Created);
        assert!(before.last_run.is_none());

        let finished = store
            .record_run_completion(run.id, RunOutcome::Success, 500, &[])
            .await
            .unwrap();
        assert_eq!(finished.status, RunStatus::Success);
        assert_eq!(finished.records_processed, 500);
        assert!(finished.errors.is_empty());
        let completed_at = finished.completed_at.unwrap();
        assert!(completed_at >= finished.started_at);

        let pipeline = store.get_pipeline(pipeline.id).await.unwrap();
        assert_eq!(pipeline.status, PipelineStatus::Succeeded);
        assert_eq!(pipeline.last_run, Some(completed_at));
        assert!(pipeline.error_log.is_empty());
    }

    #[tokio::test]
    async fn test_open_run_keeps_last_outcome() {
        let (_dir, store) = open_temp().await;
        let pipeline = store
            .create_pipeline("daily_sync", "sync orders", PipelineConfig::empty())
            .await
            .unwrap();

        let first = store.record_run_start(pipeline.id).await.unwrap();
        store
            .record_run_completion(first.id, RunOutcome::Success, 3, &[])
            .await
            .unwrap();
        let last_run = store.get_pipeline(pipeline.id).await.unwrap().last_run;

        // A run that is never finalized, e.g. a cancelled execution.
        store.record_run_start(pipeline.id).await.unwrap();

        let stored = store.get_pipeline(pipeline.id).await.unwrap();
        assert_eq!(stored.status, PipelineStatus::Succeeded);
        assert_eq!(stored.last_run, last_run);
        assert_eq!(store.run_stats(pipeline.id).await.unwrap().open, 1);
    }

    #[tokio::test]
    async fn test_record_count_out_of_range() {
        let (_dir, store) = open_temp().await;
        let pipeline = store
            .create_pipeline("daily_sync", "sync orders", PipelineConfig::empty())
            .await
            .unwrap();
        let run = store.record_run_start(pipeline.id).await.unwrap();

        let result = store
            .record_run_completion(run.id, RunOutcome::Success, u64::MAX, &[])
            .await;
        assert!(matches!(result, Err(StoreError::CountOutOfRange(n)) if n == u64::MAX));

        // The rejected call left the run open.
        let stored = store.get_run(run.id).await.unwrap();
        assert!(!stored.is_finalized());
        store
            .record_run_completion(run.id, RunOutcome::Success, 7, &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failure_appends_error_log() {
        let (_dir, store) = open_temp().await;
        let pipeline = store
            .create_pipeline("daily_sync", "sync orders", PipelineConfig::empty())
            .await
            .unwrap();

        for attempt in 0..2 {
            let run = store.record_run_start(pipeline.id).await.unwrap();
            let errors = vec![format!("disk full ({})", attempt)];
            let finished = store
                .record_run_completion(run.id, RunOutcome::Failed, 0, &errors)
                .await
                .unwrap();
            assert_eq!(finished.status, RunStatus::Failed);
            assert_eq!(finished.errors, errors);
        }

        let pipeline = store.get_pipeline(pipeline.id).await.unwrap();
        assert_eq!(pipeline.status, PipelineStatus::Failed);
        assert_eq!(pipeline.error_log.len(), 2);
        assert_eq!(pipeline.error_log[0].message, "disk full (0)");
        assert_eq!(pipeline.error_log[1].message, "disk full (1)");
    }

    #[tokio::test]
    async fn test_double_finalize_is_rejected() {
        let (_dir, store) = open_temp().await;
        let pipeline = store
            .create_pipeline("p", "d", PipelineConfig::empty())
            .await
            .unwrap();
        let run = store.record_run_start(pipeline.id).await.unwrap();

        let first = store
            .record_run_completion(run.id, RunOutcome::Success, 10, &[])
            .await
            .unwrap();
        let second = store
            .record_run_completion(run.id, RunOutcome::Failed, 99, &["late".to_string()])
            .await;
        assert!(matches!(second, Err(StoreError::RunAlreadyFinalized(_))));

        let stored = store.get_run(run.id).await.unwrap();
        assert_eq!(stored.status, RunStatus::Success);
        assert_eq!(stored.records_processed, 10);
        assert_eq!(stored.completed_at, first.completed_at);
        assert!(store.get_pipeline(pipeline.id).await.unwrap().error_log.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_finalize_single_winner() {
        let (_dir, store) = open_temp().await;
        let pipeline = store
            .create_pipeline("p", "d", PipelineConfig::empty())
            .await
            .unwrap();
        let run_id = store.record_run_start(pipeline.id).await.unwrap().id;

        let store = Arc::new(store);
        let mut handles = Vec::new();
        for i in 0..4u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .record_run_completion(run_id, RunOutcome::Success, i, &[])
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(StoreError::RunAlreadyFinalized(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_all_logged() {
        let (_dir, store) = open_temp().await;
        let pipeline = store
            .create_pipeline("p", "d", PipelineConfig::empty())
            .await
            .unwrap();

        let mut runs = Vec::new();
        for _ in 0..6 {
            runs.push(store.record_run_start(pipeline.id).await.unwrap());
        }

        let mut handles = Vec::new();
        for run in runs {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .record_run_completion(run.id, RunOutcome::Failed, 0, &["boom".to_string()])
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let pipeline = store.get_pipeline(pipeline.id).await.unwrap();
        assert_eq!(pipeline.error_log.len(), 6);
        let stats = store.run_stats(pipeline.id).await.unwrap();
        assert_eq!(
            stats,
            RunStats {
                total: 6,
                succeeded: 0,
                failed: 6,
                open: 0
            }
        );
    }

    #[tokio::test]
    async fn test_listing_order_and_stats() {
        let (_dir, store) = open_temp().await;
        let first = store
            .create_pipeline("first", "d", PipelineConfig::empty())
            .await
            .unwrap();
        let second = store
            .create_pipeline("second", "d", PipelineConfig::empty())
            .await
            .unwrap();

        let names: Vec<String> = store
            .list_pipelines()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);

        let older = store.record_run_start(first.id).await.unwrap();
        store
            .record_run_completion(older.id, RunOutcome::Success, 1, &[])
            .await
            .unwrap();
        let newer = store.record_run_start(first.id).await.unwrap();

        let runs = store.list_runs(first.id).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, newer.id);
        assert_eq!(runs[1].id, older.id);
        assert!(store.list_runs(second.id).await.unwrap().is_empty());

        let stats = store.run_stats(first.id).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.open, 1);
        assert_eq!(store.run_stats(second.id).await.unwrap(), RunStats::default());
    }

    #[test]
    fn test_timestamp_format_sorts_lexically() {
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::microseconds(1);
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
        let parsed = parse_timestamp("t", &format_timestamp(&earlier)).unwrap();
        assert_eq!(parsed.timestamp_micros(), earlier.timestamp_micros());
    }

    #[test]
    fn test_corrupt_values() {
        assert!(matches!(
            parse_timestamp("t", "yesterday"),
            Err(StoreError::Corrupt(_))
        ));
        assert!(matches!(parse_uuid("id", "42"), Err(StoreError::Corrupt(_))));
    }
}
