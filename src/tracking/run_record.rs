//! Run Record - lifecycle and timing of one experiment execution

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Run is created but not yet started.
    Pending,
    /// Run is currently executing.
    Running,
    /// Run completed successfully.
    Success,
    /// Run failed with an error.
    Failed,
}

/// Run Record tracks one execution of an experiment from start to completion.
///
/// Wall-clock timestamps are kept for the metric history; the elapsed
/// duration comes from a monotonic clock so it is immune to clock changes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunRecord {
    experiment: String,
    backend: String,
    status: RunStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    elapsed: Option<Duration>,
    #[serde(skip)]
    clock: Option<Instant>,
}

impl RunRecord {
    /// Create a new run record in Pending status.
    ///
    /// # Arguments
    ///
    /// * `experiment` - Experiment identity
    /// * `backend` - Backend display name
    #[must_use]
    pub fn new(experiment: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            backend: backend.into(),
            status: RunStatus::Pending,
            started_at: None,
            ended_at: None,
            elapsed: None,
            clock: None,
        }
    }

    /// Get the experiment identity.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Get the backend display name.
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Get the current run status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the start timestamp, if the run has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if the run has completed.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Elapsed time: final once completed, running while in progress.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed.or_else(|| self.clock.map(|c| c.elapsed()))
    }

    /// Elapsed time in seconds, zero before the run starts.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().map_or(0.0, |d| d.as_secs_f64())
    }

    /// Start the run, transitioning from Pending to Running.
    ///
    /// Sets the `started_at` timestamp to now.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        self.clock = Some(Instant::now());
        self.elapsed = None;
    }

    /// Complete the run with the given final status.
    ///
    /// Sets the `ended_at` timestamp to now and freezes the elapsed time.
    ///
    /// # Arguments
    ///
    /// * `status` - Final status (Success or Failed)
    pub fn complete(&mut self, status: RunStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
        self.elapsed = Some(self.clock.map_or(Duration::ZERO, |c| c.elapsed()));
    }
}
