//! NDJSON (Newline Delimited JSON) record files
//!
//! Each non-blank line holds one record, either as an object
//! (`{"ID": 0, "NAME": "abc"}`) or as an array aligned with a column list
//! (`[0, "abc"]`). JSON `null` marks an absent value.

use crate::etl::Extractor;
use crate::record::{FieldValue, Record};

use eyre::{Context, Result, bail, eyre};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

/// Convert one JSON line into a record
///
/// Objects keep their key order unless `columns` is non-empty, in which case
/// fields follow `columns` and missing keys are absent. Arrays require
/// `columns`.
pub fn record_from_json(value: Value, columns: &[String]) -> Result<Record> {
    match value {
        Value::Object(object) if columns.is_empty() => object
            .into_iter()
            .map(|(name, v)| Ok((name, field_value(v)?)))
            .collect::<Result<Vec<_>>>()
            .map(to_record),
        Value::Object(mut object) => {
            let mut record = Record::new();
            for column in columns {
                let value = object.remove(column).unwrap_or(Value::Null);
                record.push(column, field_value(value)?);
            }
            if let Some(extra) = object.keys().next() {
                bail!("Unknown column '{}'", extra);
            }
            Ok(record)
        }
        Value::Array(_) if columns.is_empty() => {
            bail!("Array records need a column list")
        }
        Value::Array(values) => {
            if values.len() != columns.len() {
                bail!(
                    "Expected {} value(s), found {}",
                    columns.len(),
                    values.len()
                );
            }
            columns
                .iter()
                .zip(values)
                .map(|(name, v)| Ok((name.clone(), field_value(v)?)))
                .collect::<Result<Vec<_>>>()
                .map(to_record)
        }
        other => Err(eyre!("Expected an object or array, found {}", other)),
    }
}

fn to_record(fields: Vec<(String, Option<FieldValue>)>) -> Record {
    let mut record = Record::new();
    for (name, value) in fields {
        record.push(name, value);
    }
    record
}

fn field_value(value: Value) -> Result<Option<FieldValue>> {
    Ok(match value {
        Value::Null => None,
        Value::Bool(b) => Some(FieldValue::Boolean(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(FieldValue::Integer(i)),
            None => Some(match n.as_f64() {
                Some(f) if n.is_f64() => FieldValue::Real(f),
                _ => FieldValue::Text(n.to_string()),
            }),
        },
        Value::String(s) => Some(FieldValue::Text(s)),
        nested => bail!("Nested values are not supported: {}", nested),
    })
}

/// Lazily reads records from an NDJSON file
pub struct NdjsonRecordReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    columns: Vec<String>,
    line: usize,
}

impl NdjsonRecordReader {
    /// Open a record file
    ///
    /// `columns` may be empty when every line is an object.
    pub async fn open(path: impl AsRef<Path>, columns: Vec<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .with_context(|| format!("Failed to open NDJSON file: {}", path.display()))?;

        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            columns,
            line: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Extractor for NdjsonRecordReader {
    type Item = Record;

    async fn extract_next(&mut self) -> Result<Option<Self::Item>> {
        while let Some(line) = self
            .lines
            .next_line()
            .await
            .with_context(|| format!("Failed to read NDJSON file: {}", self.path.display()))?
        {
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(&line).with_context(|| {
                format!("Failed to parse JSON at {}:{}", self.path.display(), self.line)
            })?;
            let record = record_from_json(value, &self.columns).with_context(|| {
                format!("Invalid record at {}:{}", self.path.display(), self.line)
            })?;

            return Ok(Some(record));
        }

        Ok(None)
    }
}
