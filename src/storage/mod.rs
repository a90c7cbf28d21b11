//! File-based record sources
//!
//! This module handles reading import records from disk.

mod ndjson;

pub use ndjson::{NdjsonRecordReader, record_from_json};
