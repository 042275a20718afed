//! Column type inference over sampled values.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inferred type tag for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Datetime,
    String,
    /// No non-empty value was sampled.
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Datetime => "datetime",
            ColumnType::String => "string",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single sampled value, reduced to what inference needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Integer,
    Float,
    Boolean,
    Datetime,
    Text,
}

impl Cell {
    /// Classifies a raw text value (CSV fields, JSON strings).
    pub fn from_text(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() {
            return Cell::Empty;
        }
        if value.parse::<i64>().is_ok() {
            return Cell::Integer;
        }
        // "inf" and "NaN" parse as f64 but are text in a sample
        if value.bytes().any(|b| b.is_ascii_digit()) && value.parse::<f64>().is_ok() {
            return Cell::Float;
        }
        if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            return Cell::Boolean;
        }
        if looks_like_datetime(value) {
            return Cell::Datetime;
        }
        Cell::Text
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

fn looks_like_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        || DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
}

/// Accumulates observations for one column.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeInference {
    seen: Option<ColumnType>,
}

impl TypeInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one sampled value into the running type.
    pub fn observe(&mut self, cell: Cell) {
        let observed = match cell {
            Cell::Empty => return,
            Cell::Integer => ColumnType::Integer,
            Cell::Float => ColumnType::Float,
            Cell::Boolean => ColumnType::Boolean,
            Cell::Datetime => ColumnType::Datetime,
            Cell::Text => ColumnType::String,
        };

        self.seen = Some(match (self.seen, observed) {
            (None, t) => t,
            (Some(current), t) if current == t => current,
            (Some(ColumnType::Integer), ColumnType::Float)
            | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
            _ => ColumnType::String,
        });
    }

    /// Final type tag for the column.
    pub fn finish(&self) -> ColumnType {
        self.seen.unwrap_or(ColumnType::Unknown)
    }
}
