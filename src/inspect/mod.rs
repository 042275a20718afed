//! Source inspection: probe a data source and summarize its shape.
//!
//! Inspection is bounded: at most `sample_limit` records are read, so the
//! reported `row_count` is the number of sampled rows, not the true size of
//! the source.
//!
//! # Example
//!
//! ```ignore
//! use pipeforge::inspect::SourceInspector;
//!
//! let summary = SourceInspector::new().inspect("orders.csv", "csv")?;
//! println!("{:?}", summary.dtypes);
//! ```

mod infer;
mod readers;

pub use infer::{Cell, ColumnType, TypeInference};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::InspectError;

/// Default number of records sampled per source.
pub const DEFAULT_SAMPLE_LIMIT: usize = 100;

/// Kind of data source understood by the inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Delimited text (CSV, TSV).
    TabularDelimited,
    /// Workbook (xlsx, xls, ods); the first worksheet is read.
    TabularSpreadsheet,
    /// JSON array of objects or JSON Lines.
    StructuredRecords,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::TabularDelimited => "tabular-delimited",
            SourceKind::TabularSpreadsheet => "tabular-spreadsheet",
            SourceKind::StructuredRecords => "structured-records",
        }
    }

    /// Guesses the kind from a file extension.
    pub fn from_path(path: &Path) -> Option<SourceKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" => Some(SourceKind::TabularDelimited),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(SourceKind::TabularSpreadsheet),
            "json" | "jsonl" | "ndjson" => Some(SourceKind::StructuredRecords),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tabular-delimited" | "csv" | "tsv" => Ok(SourceKind::TabularDelimited),
            "tabular-spreadsheet" | "excel" | "xlsx" | "xls" | "ods" => {
                Ok(SourceKind::TabularSpreadsheet)
            }
            "structured-records" | "json" | "jsonl" => Ok(SourceKind::StructuredRecords),
            _ => Err(InspectError::UnsupportedSourceKind(s.to_string())),
        }
    }
}

/// Normalized shape of a data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSummary {
    /// Column names in source-declared order.
    pub columns: Vec<String>,
    /// Inferred type per column, in column order.
    pub dtypes: IndexMap<String, ColumnType>,
    /// Number of rows sampled (bounded by the sample limit).
    pub row_count: usize,
}

impl SchemaSummary {
    /// Type tag of a column, if present.
    pub fn dtype(&self, column: &str) -> Option<ColumnType> {
        self.dtypes.get(column).copied()
    }

    fn from_sample(sample: readers::Sample) -> Self {
        let mut inferences = vec![TypeInference::new(); sample.columns.len()];
        for row in &sample.rows {
            for (inference, cell) in inferences.iter_mut().zip(row.iter()) {
                inference.observe(*cell);
            }
        }

        let dtypes = sample
            .columns
            .iter()
            .cloned()
            .zip(inferences.iter().map(TypeInference::finish))
            .collect();

        Self {
            columns: sample.columns,
            dtypes,
            row_count: sample.rows.len(),
        }
    }
}

/// Probes data sources and produces [`SchemaSummary`] values.
///
/// Stateless apart from its sample limit; cheap to copy and share.
#[derive(Debug, Clone, Copy)]
pub struct SourceInspector {
    sample_limit: usize,
}

impl Default for SourceInspector {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

impl SourceInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of records read per source.
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn sample_limit(&self) -> usize {
        self.sample_limit
    }

    /// Inspects `location` as a source of the named kind.
    ///
    /// The kind is parsed before the source is touched, so an unknown kind
    /// fails with [`InspectError::UnsupportedSourceKind`] without any I/O.
    pub fn inspect(
        &self,
        location: impl AsRef<Path>,
        kind: &str,
    ) -> Result<SchemaSummary, InspectError> {
        let kind: SourceKind = kind.parse()?;
        self.inspect_kind(location, kind)
    }

    /// Inspects `location` as a source of an already-parsed kind.
    pub fn inspect_kind(
        &self,
        location: impl AsRef<Path>,
        kind: SourceKind,
    ) -> Result<SchemaSummary, InspectError> {
        inspect(location.as_ref(), kind, self.sample_limit)
    }

    /// Runs [`inspect`](Self::inspect) on the blocking thread pool.
    pub async fn inspect_async(
        &self,
        location: impl Into<PathBuf>,
        kind: &str,
    ) -> Result<SchemaSummary, InspectError> {
        let kind: SourceKind = kind.parse()?;
        let location = location.into();
        let limit = self.sample_limit;
        let display = location.display().to_string();

        tokio::task::spawn_blocking(move || inspect(&location, kind, limit))
            .await
            .map_err(|e| InspectError::unreadable(display, e))?
    }
}

/// Reads up to `sample_limit` records of `location` and summarizes them.
pub fn inspect(
    location: &Path,
    kind: SourceKind,
    sample_limit: usize,
) -> Result<SchemaSummary, InspectError> {
    tracing::debug!(location = %location.display(), kind = %kind, sample_limit, "Inspecting source");

    let sample = match kind {
        SourceKind::TabularDelimited => readers::read_delimited(location, sample_limit)?,
        SourceKind::TabularSpreadsheet => readers::read_spreadsheet(location, sample_limit)?,
        SourceKind::StructuredRecords => readers::read_records(location, sample_limit)?,
    };

    let summary = SchemaSummary::from_sample(sample);
    tracing::info!(
        location = %location.display(),
        columns = summary.columns.len(),
        rows = summary.row_count,
        "Inspected source"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_source_kind_aliases() {
        assert_eq!("csv".parse::<SourceKind>().unwrap(), SourceKind::TabularDelimited);
        assert_eq!("XLSX".parse::<SourceKind>().unwrap(), SourceKind::TabularSpreadsheet);
        assert_eq!("jsonl".parse::<SourceKind>().unwrap(), SourceKind::StructuredRecords);
        assert_eq!(
            "structured-records".parse::<SourceKind>().unwrap(),
            SourceKind::StructuredRecords
        );
        assert!(matches!(
            "parquet".parse::<SourceKind>(),
            Err(InspectError::UnsupportedSourceKind(_))
        ));
    }

    #[test]
    fn test_source_kind_from_path() {
        assert_eq!(
            SourceKind::from_path(Path::new("data/Orders.TSV")),
            Some(SourceKind::TabularDelimited)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("book.ods")),
            Some(SourceKind::TabularSpreadsheet)
        );
        assert_eq!(SourceKind::from_path(Path::new("dump.parquet")), None);
        assert_eq!(SourceKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_unsupported_kind_fails_before_io() {
        // The path does not exist; a reader would report SourceUnreadable.
        let err = SourceInspector::new()
            .inspect("/nonexistent/dir/data.parquet", "parquet")
            .unwrap_err();
        assert!(matches!(err, InspectError::UnsupportedSourceKind(k) if k == "parquet"));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = SourceInspector::new()
            .inspect("/nonexistent/dir/data.csv", "csv")
            .unwrap_err();
        match err {
            InspectError::SourceUnreadable { location, .. } => {
                assert_eq!(location, "/nonexistent/dir/data.csv")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inspect_csv_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "orders.csv",
            "order_id,amount,paid,placed_at,note\n\
             1,9.99,true,2024-03-01,first\n\
             2,15,false,2024-03-02,\n\
             3,7.5,true,2024-03-03 10:00:00,rush\n",
        );

        let summary = SourceInspector::new().inspect(&path, "csv").unwrap();
        assert_eq!(
            summary.columns,
            vec!["order_id", "amount", "paid", "placed_at", "note"]
        );
        assert_eq!(summary.dtype("order_id"), Some(ColumnType::Integer));
        assert_eq!(summary.dtype("amount"), Some(ColumnType::Float));
        assert_eq!(summary.dtype("paid"), Some(ColumnType::Boolean));
        assert_eq!(summary.dtype("placed_at"), Some(ColumnType::Datetime));
        assert_eq!(summary.dtype("note"), Some(ColumnType::String));
        assert_eq!(summary.row_count, 3);
    }

    #[test]
    fn test_row_count_is_bounded_by_sample_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("n\n");
        for i in 0..250 {
            body.push_str(&format!("{}\n", i));
        }
        let path = write_file(&dir, "numbers.csv", &body);

        let summary = SourceInspector::new().inspect(&path, "csv").unwrap();
        assert_eq!(summary.row_count, DEFAULT_SAMPLE_LIMIT);

        let summary = SourceInspector::new()
            .with_sample_limit(10)
            .inspect(&path, "csv")
            .unwrap();
        assert_eq!(summary.row_count, 10);
    }

    #[test]
    fn test_header_only_columns_are_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.csv", "a,b\n");

        let summary = SourceInspector::new().inspect(&path, "csv").unwrap();
        assert_eq!(summary.row_count, 0);
        assert_eq!(summary.dtype("a"), Some(ColumnType::Unknown));
    }

    #[test]
    fn test_summary_wire_shape_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "users.json", r#"[{"zeta": 1, "alpha": "x"}]"#);

        let summary = SourceInspector::new().inspect(&path, "json").unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(
            json,
            r#"{"columns":["zeta","alpha"],"dtypes":{"zeta":"integer","alpha":"string"},"row_count":1}"#
        );
    }

    #[tokio::test]
    async fn test_inspect_async_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_file(&dir, "a.csv", "x\n1\n");
        let json = write_file(&dir, "b.jsonl", "{\"y\": true}\n");

        let inspector = SourceInspector::new();
        let (a, b) = tokio::join!(
            inspector.inspect_async(csv, "csv"),
            inspector.inspect_async(json, "jsonl")
        );
        assert_eq!(a.unwrap().dtype("x"), Some(ColumnType::Integer));
        assert_eq!(b.unwrap().dtype("y"), Some(ColumnType::Boolean));
    }
}
