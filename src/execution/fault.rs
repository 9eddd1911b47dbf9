//! Structured fault capture for failed runs

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::RunStage;
use crate::output::OutputTarget;
use crate::tracking::RunRecord;
use crate::Result;

/// Post-mortem report for an experiment fault.
#[derive(Debug, Clone, Serialize)]
pub struct FaultReport {
    /// Stage that failed
    pub stage: RunStage,
    /// Error message followed by its source chain
    pub error_chain: Vec<String>,
    /// Backtrace captured at report time
    pub backtrace: String,
    /// Run state when the fault surfaced
    pub run: RunRecord,
    /// When the report was captured
    pub captured_at: DateTime<Utc>,
}

impl FaultReport {
    /// Capture a report for `error` raised at `stage` during `run`.
    #[must_use]
    pub fn capture(stage: RunStage, error: &(dyn StdError + 'static), run: &RunRecord) -> Self {
        let mut error_chain = vec![error.to_string()];
        let mut source = error.source();
        while let Some(cause) = source {
            error_chain.push(cause.to_string());
            source = cause.source();
        }
        Self {
            stage,
            error_chain,
            backtrace: Backtrace::force_capture().to_string(),
            run: run.clone(),
            captured_at: Utc::now(),
        }
    }

    /// Write the report as pretty JSON. Standard output is replaced by
    /// standard error so fault reports never mix with recorded metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized or written.
    pub fn write_to(&self, target: &OutputTarget) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');
        match target {
            OutputTarget::Stdout => std::io::stderr().lock().write_all(&json)?,
            OutputTarget::File(_) => target.append_with(|_| json)?,
        }
        Ok(())
    }
}
