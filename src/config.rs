//! Construction-time configuration.
//!
//! [`ForgeConfig`] gathers every setting the components need, including the
//! generative-service credential. Components receive their values from it
//! explicitly; nothing here reads or writes process-wide state.

use std::path::PathBuf;

use crate::error::{ConfigError, LlmError, StoreError};
use crate::inspect::{SourceInspector, DEFAULT_SAMPLE_LIMIT};
use crate::llm::{OpenAiClient, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::schedule::ScheduleArtifactGenerator;
use crate::store::PipelineStore;
use crate::synth::{SynthesisConfig, DEFAULT_TEMPERATURE};

/// Default SQLite database file.
pub const DEFAULT_DATABASE_PATH: &str = "pipelines.db";

/// Default output directory for schedule artifacts.
pub const DEFAULT_SCHEDULE_DIR: &str = "./dags";

/// Settings for a pipeforge session.
#[derive(Clone)]
pub struct ForgeConfig {
    /// Credential for the generative service; only synthesis needs it.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Model used for synthesis.
    pub model: String,
    /// Sampling temperature used for synthesis.
    pub temperature: f64,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Records sampled per inspected source.
    pub sample_limit: usize,
    /// Where schedule artifacts are written.
    pub schedule_dir: PathBuf,
}

impl std::fmt::Debug for ForgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("database_path", &self.database_path)
            .field("sample_limit", &self.sample_limit)
            .field("schedule_dir", &self.schedule_dir)
            .finish()
    }
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            schedule_dir: PathBuf::from(DEFAULT_SCHEDULE_DIR),
        }
    }
}

impl ForgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn with_schedule_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schedule_dir = dir.into();
        self
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "api_base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model cannot be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if self.sample_limit == 0 {
            return Err(ConfigError::ValidationFailed(
                "sample_limit must be greater than 0".to_string(),
            ));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database_path cannot be empty".to_string(),
            ));
        }

        if let Some(key) = &self.api_key {
            if key.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "api_key cannot be blank when set".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Builds the LLM client; fails with `MissingApiKey` without a credential.
    pub fn llm_client(&self) -> Result<OpenAiClient, LlmError> {
        let api_key = self.api_key.clone().ok_or(LlmError::MissingApiKey)?;
        OpenAiClient::new(self.api_base.clone(), api_key, self.model.clone())
    }

    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig::new()
            .with_model(self.model.clone())
            .with_temperature(self.temperature)
    }

    pub fn inspector(&self) -> SourceInspector {
        SourceInspector::new().with_sample_limit(self.sample_limit)
    }

    pub fn schedule_generator(&self) -> ScheduleArtifactGenerator {
        ScheduleArtifactGenerator::new()
    }

    /// Opens the configured store.
    pub async fn open_store(&self) -> Result<PipelineStore, StoreError> {
        PipelineStore::open(&self.database_path).await
    }
}
