//! Bounded readers for the supported source kinds.
//!
//! Each reader returns the header (column names in source order) and up to
//! `limit` sampled rows, already reduced to [`Cell`]s.

use calamine::{open_workbook_auto, Data, Reader};
use serde::de::{DeserializeSeed, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::infer::Cell;
use crate::error::InspectError;

/// Columns plus sampled rows, positionally aligned with the columns.
#[derive(Debug, Default)]
pub(crate) struct Sample {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

fn location(path: &Path) -> String {
    path.display().to_string()
}

/// Fills blank header names and disambiguates duplicates (`a`, `a.1`, ...).
fn normalize_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut columns: Vec<String> = Vec::new();
    for (idx, name) in raw.into_iter().enumerate() {
        let name = name.as_ref().trim();
        let base = if name.is_empty() {
            format!("column_{}", idx)
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while columns.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        columns.push(candidate);
    }
    columns
}

/// Reads a delimited text file. Tab-separated when the extension is `.tsv`.
pub(crate) fn read_delimited(path: &Path, limit: usize) -> Result<Sample, InspectError> {
    let delimiter = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| InspectError::unreadable(location(path), e))?;

    let headers = reader
        .headers()
        .map_err(|e| InspectError::unreadable(location(path), e))?
        .clone();
    if headers.is_empty() {
        return Err(InspectError::unreadable(location(path), "no header row"));
    }
    let columns = normalize_headers(headers.iter());

    let mut rows = Vec::new();
    for record in reader.records().take(limit) {
        let record = record.map_err(|e| InspectError::unreadable(location(path), e))?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }

    Ok(Sample { columns, rows })
}

fn spreadsheet_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(_) => Cell::Integer,
        // spreadsheets store whole numbers as floats
        Data::Float(f) if f.fract() == 0.0 => Cell::Integer,
        Data::Float(_) => Cell::Float,
        Data::Bool(_) => Cell::Boolean,
        Data::DateTime(_) | Data::DateTimeIso(_) => Cell::Datetime,
        Data::String(s) => Cell::from_text(s),
        _ => Cell::Text,
    }
}

/// Reads the first worksheet of a workbook; the first row is the header.
pub(crate) fn read_spreadsheet(path: &Path, limit: usize) -> Result<Sample, InspectError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| InspectError::unreadable(location(path), e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| InspectError::unreadable(location(path), "workbook has no worksheets"))?
        .map_err(|e| InspectError::unreadable(location(path), e))?;

    let mut sheet_rows = range.rows();
    let Some(header) = sheet_rows.next() else {
        return Err(InspectError::unreadable(location(path), "worksheet is empty"));
    };

    let columns = normalize_headers(header.iter().map(|cell| match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }));

    let rows = sheet_rows
        .take(limit)
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    Ok(Sample { columns, rows })
}

fn json_cell(value: Option<&Value>) -> Cell {
    match value {
        None | Some(Value::Null) => Cell::Empty,
        Some(Value::Bool(_)) => Cell::Boolean,
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Cell::Integer,
        Some(Value::Number(_)) => Cell::Float,
        Some(Value::String(s)) => Cell::from_text(s),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Cell::Text,
    }
}

/// Collects the first `limit` elements of a JSON array and stops there.
///
/// When it stops early the deserializer reports the unread tail as an error;
/// `truncated` tells the caller to ignore it.
struct ArraySample<'a> {
    limit: usize,
    records: &'a mut Vec<Value>,
    truncated: &'a mut bool,
}

impl<'de> DeserializeSeed<'de> for ArraySample<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ArraySample<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of records")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let ArraySample {
            limit,
            records,
            truncated,
        } = self;

        while records.len() < limit {
            match seq.next_element::<Value>()? {
                Some(value) => records.push(value),
                None => return Ok(()),
            }
        }
        *truncated = true;
        Ok(())
    }
}

/// Skips leading whitespace and returns the next byte without consuming it.
fn peek_non_whitespace<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(pos) => {
                let byte = buf[pos];
                reader.consume(pos);
                return Ok(Some(byte));
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Reads JSON records: a top-level array of objects, or a stream of objects
/// (JSON Lines or concatenated documents). Reading stops after `limit`
/// records in both cases.
pub(crate) fn read_records(path: &Path, limit: usize) -> Result<Sample, InspectError> {
    let file = File::open(path).map_err(|e| InspectError::unreadable(location(path), e))?;
    let mut reader = BufReader::new(file);
    let first = peek_non_whitespace(&mut reader)
        .map_err(|e| InspectError::unreadable(location(path), e))?;

    let mut records: Vec<Value> = Vec::new();
    if first == Some(b'[') {
        let mut de = serde_json::Deserializer::from_reader(reader);
        let mut truncated = false;
        let result = ArraySample {
            limit,
            records: &mut records,
            truncated: &mut truncated,
        }
        .deserialize(&mut de);
        if let Err(e) = result {
            if !truncated {
                return Err(InspectError::unreadable(location(path), e));
            }
        }
    } else {
        let stream = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();
        for value in stream.take(limit) {
            records.push(value.map_err(|e| InspectError::unreadable(location(path), e))?);
        }
    }

    let mut objects = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        match record {
            Value::Object(object) => objects.push(object),
            other => {
                return Err(InspectError::unreadable(
                    location(path),
                    format!("record {} is not an object: {}", idx, other),
                ))
            }
        }
    }

    // Columns in order of first appearance across the sample.
    let mut columns: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|column| json_cell(object.get(column)))
                .collect()
        })
        .collect();

    Ok(Sample { columns, rows })
}
