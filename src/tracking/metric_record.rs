//! Metric Record - one persisted run in the metric history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RunResult;

/// Metric Record represents one recorded run.
///
/// Records are append-only and keyed by experiment identity, which is not
/// unique: every run of the same description adds another record.
///
/// ## History Queries
///
/// Records are grouped by:
/// - `experiment` (+ optionally `backend`) to select comparable runs
/// - `started_at` to order runs within the group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    experiment: String,
    started_at: DateTime<Utc>,
    elapsed_secs: f64,
    backend: String,
    result: RunResult,
}

impl MetricRecord {
    /// Create a new metric record.
    ///
    /// # Arguments
    ///
    /// * `experiment` - Experiment identity (description file name)
    /// * `backend` - Backend display name (e.g., "CPU", "nervanagpu")
    /// * `result` - Normalized per-split metric values
    ///
    /// # Returns
    ///
    /// A new `MetricRecord` started now with zero elapsed time.
    #[must_use]
    pub fn new(
        experiment: impl Into<String>,
        backend: impl Into<String>,
        result: RunResult,
    ) -> Self {
        Self {
            experiment: experiment.into(),
            started_at: Utc::now(),
            elapsed_secs: 0.0,
            backend: backend.into(),
            result,
        }
    }

    /// Create a builder for constructing a metric record with optional fields.
    #[must_use]
    pub fn builder(
        experiment: impl Into<String>,
        backend: impl Into<String>,
    ) -> MetricRecordBuilder {
        MetricRecordBuilder::new(experiment, backend)
    }

    /// Get the experiment identity.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Get the wall-clock start of the run.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Get the run duration in seconds.
    #[must_use]
    pub const fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    /// Get the backend display name.
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Get the per-split metric values.
    #[must_use]
    pub const fn result(&self) -> &RunResult {
        &self.result
    }

    /// Whether `other` is the same run (same identity, start and backend).
    #[must_use]
    pub fn same_run(&self, other: &Self) -> bool {
        self.experiment == other.experiment
            && self.started_at == other.started_at
            && self.backend == other.backend
    }
}

/// Builder for `MetricRecord`.
#[derive(Debug)]
pub struct MetricRecordBuilder {
    experiment: String,
    started_at: DateTime<Utc>,
    elapsed_secs: f64,
    backend: String,
    result: RunResult,
}

impl MetricRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(experiment: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            started_at: Utc::now(),
            elapsed_secs: 0.0,
            backend: backend.into(),
            result: RunResult::default(),
        }
    }

    /// Set the run start timestamp.
    #[must_use]
    pub const fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Set the run duration in seconds.
    #[must_use]
    pub const fn elapsed_secs(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = elapsed_secs;
        self
    }

    /// Set the metric values.
    #[must_use]
    pub fn result(mut self, result: RunResult) -> Self {
        self.result = result;
        self
    }

    /// Build the `MetricRecord`.
    #[must_use]
    pub fn build(self) -> MetricRecord {
        MetricRecord {
            experiment: self.experiment,
            started_at: self.started_at,
            elapsed_secs: self.elapsed_secs,
            backend: self.backend,
            result: self.result,
        }
    }
}
