//! History Store - durable, append-only metric history
//!
//! **Append-Only Design**:
//! - Write pattern: one row per run, appended; rows are never rewritten
//! - Read pattern: full scan, filtered by experiment identity and backend
//!
//! ## Format
//!
//! Tab-separated, one header row, one row per run:
//!
//! ```text
//! experiment  started_at                      elapsed_secs  backend  metrics
//! mnist.yaml  2025-03-02T10:15:00.123456Z     41.7          CPU      {"test":{"MisclassPercentage":2.1},...}
//! ```
//!
//! `metrics` is a JSON object of split → metric → number (`null` for the
//! not-available sentinel). Quoting is handled by the `csv` writer, so any
//! identity round-trips.
//!
//! ## Concurrent writers
//!
//! Each row is encoded in memory and appended with a single write on an
//! append-mode handle, so concurrent runners interleave on row boundaries.
//! The header row assumes a single writer creates the file.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MetricRecord, RunResult};
use crate::output::OutputTarget;
use crate::{Error, Result};

const DELIMITER: u8 = b'\t';

/// Column layout of one store row.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    experiment: String,
    started_at: DateTime<Utc>,
    elapsed_secs: f64,
    backend: String,
    metrics: String,
}

impl StoredRow {
    fn from_record(record: &MetricRecord) -> Result<Self> {
        Ok(Self {
            experiment: record.experiment().to_string(),
            started_at: record.started_at(),
            elapsed_secs: record.elapsed_secs(),
            backend: record.backend().to_string(),
            metrics: serde_json::to_string(record.result())?,
        })
    }

    fn into_record(self) -> Result<MetricRecord> {
        let result: RunResult = serde_json::from_str(&self.metrics).map_err(|e| {
            Error::Store(format!(
                "bad metrics column for {} at {}: {e}",
                self.experiment, self.started_at
            ))
        })?;
        Ok(MetricRecord::builder(self.experiment, self.backend)
            .started_at(self.started_at)
            .elapsed_secs(self.elapsed_secs)
            .result(result)
            .build())
    }
}

/// Encode records as store rows, optionally preceded by the header row.
///
/// # Errors
///
/// Returns an error if a record cannot be serialized.
pub fn encode_records<'a>(
    records: impl IntoIterator<Item = &'a MetricRecord>,
    header: bool,
) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(header)
        .from_writer(Vec::new());
    for record in records {
        writer.serialize(StoredRow::from_record(record)?)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Store(format!("failed to flush encoded rows: {e}")))
}

/// Decode store rows.
///
/// Repeated header rows (from concatenated outputs) are skipped.
///
/// # Errors
///
/// Returns [`Error::Store`] for a row that does not decode.
pub fn decode_records(reader: impl Read) -> Result<Vec<MetricRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        if row == headers {
            continue;
        }
        let stored: StoredRow = row.deserialize(Some(&headers)).map_err(|e| {
            Error::Store(format!("row {}: {e}", index + 2))
        })?;
        records.push(stored.into_record()?);
    }
    Ok(records)
}

/// File-backed metric history.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record in store order.
    ///
    /// A missing file is an empty history.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for an unreadable file, or [`Error::Store`] for
    /// a malformed row.
    pub fn load(&self) -> Result<Vec<MetricRecord>> {
        match File::open(&self.path) {
            Ok(file) => decode_records(io::BufReader::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recording`] when the file cannot be opened or written.
    pub fn append(&self, record: &MetricRecord) -> Result<()> {
        append_to(&OutputTarget::File(self.path.clone()), record)
    }
}

/// Append `record` to `target`, writing the header on a fresh target.
///
/// # Errors
///
/// Returns [`Error::Recording`] when the target cannot be written.
pub fn append_to(target: &OutputTarget, record: &MetricRecord) -> Result<()> {
    let with_header = encode_records([record], true)?;
    let without_header = encode_records([record], false)?;
    target
        .append_with(|fresh| if fresh { with_header } else { without_header })
        .map_err(|source| Error::Recording {
            path: target
                .path()
                .map_or_else(|| PathBuf::from("<stdout>"), Path::to_path_buf),
            source,
        })
}
