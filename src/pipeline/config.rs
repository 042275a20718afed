//! Schema-checked pipeline configuration documents.
//!
//! A pipeline configuration is the structured document produced by synthesis
//! (or written by hand) that describes the transformation steps. Its shape is
//! deliberately loose, but every document passes through [`PipelineConfig::from_value`]
//! before it is stored or executed:
//!
//! - the top level must be a JSON object;
//! - `name`, when present, must be a string;
//! - `steps`, when present, must be an array of objects, each carrying a
//!   non-empty string `type`;
//! - every other key is kept verbatim.
//!
//! Deserialization goes through the same check, so a config loaded back from
//! storage is validated as well.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigValidationError;

/// One transformation step of a pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStep {
    kind: String,
    params: Map<String, Value>,
}

impl PipelineStep {
    /// Creates a step of the given type with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Map::new(),
        }
    }

    /// Adds a parameter to the step.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Returns the step type (the `type` key).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the remaining step keys.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    fn from_value(index: usize, value: Value) -> Result<Self, ConfigValidationError> {
        let Value::Object(mut params) = value else {
            return Err(ConfigValidationError::WrongType {
                field: format!("steps[{}]", index),
                expected: "an object",
            });
        };

        let kind = match params.shift_remove("type") {
            Some(Value::String(kind)) if !kind.trim().is_empty() => kind,
            _ => return Err(ConfigValidationError::MissingStepType { index }),
        };

        Ok(Self { kind, params })
    }

    fn into_value(self) -> Value {
        let mut object = Map::with_capacity(self.params.len() + 1);
        object.insert("type".to_string(), Value::String(self.kind));
        object.extend(self.params);
        Value::Object(object)
    }
}

/// A validated pipeline configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct PipelineConfig {
    name: Option<String>,
    steps: Option<Vec<PipelineStep>>,
    extra: Map<String, Value>,
}

impl PipelineConfig {
    /// Returns an empty configuration (`{}`).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validates an untyped document and converts it into a config.
    pub fn from_value(value: Value) -> Result<Self, ConfigValidationError> {
        let mut object = match value {
            Value::Object(object) => object,
            other => return Err(ConfigValidationError::NotAnObject(json_type_name(&other))),
        };

        let name = match object.shift_remove("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name),
            Some(_) => {
                return Err(ConfigValidationError::WrongType {
                    field: "name".to_string(),
                    expected: "a string",
                })
            }
        };

        let steps = match object.shift_remove("steps") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| PipelineStep::from_value(index, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => {
                return Err(ConfigValidationError::WrongType {
                    field: "steps".to_string(),
                    expected: "an array",
                })
            }
        };

        Ok(Self {
            name,
            steps,
            extra: object,
        })
    }

    /// Parses and validates a JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigValidationError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ConfigValidationError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Converts the config back into an untyped document.
    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }

    /// Sets the pipeline name embedded in the document.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a step.
    pub fn with_step(mut self, step: PipelineStep) -> Self {
        self.steps.get_or_insert_with(Vec::new).push(step);
        self
    }

    /// Name embedded in the document, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Transformation steps, in order.
    pub fn steps(&self) -> &[PipelineStep] {
        self.steps.as_deref().unwrap_or(&[])
    }

    /// Looks up any other top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// True for the empty document `{}`.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.steps.is_none() && self.extra.is_empty()
    }
}

impl TryFrom<Value> for PipelineConfig {
    type Error = ConfigValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<PipelineConfig> for Value {
    fn from(config: PipelineConfig) -> Self {
        let mut object = Map::new();
        if let Some(name) = config.name {
            object.insert("name".to_string(), Value::String(name));
        }
        if let Some(steps) = config.steps {
            object.insert(
                "steps".to_string(),
                Value::Array(steps.into_iter().map(PipelineStep::into_value).collect()),
            );
        }
        object.extend(config.extra);
        Value::Object(object)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
