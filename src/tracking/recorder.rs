//! Metrics Recorder - normalizes a run's result and appends it to the store

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

use super::store::append_to;
use super::{normalize, MetricRecord, RunResult};
use crate::config::MetricSets;
use crate::output::OutputTarget;
use crate::Result;

/// Run context stamped onto a record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordContext {
    /// Experiment identity
    pub experiment: String,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Duration in seconds
    pub elapsed_secs: f64,
    /// Backend display name
    pub backend: String,
}

/// Experiment identity for a description file: its file name, or the whole
/// path when it has none.
#[must_use]
pub fn experiment_identity(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Appends normalized run results to a store.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    target: OutputTarget,
}

impl MetricsRecorder {
    /// Recorder appending to `target`.
    #[must_use]
    pub const fn new(target: OutputTarget) -> Self {
        Self { target }
    }

    /// Where records are appended.
    #[must_use]
    pub const fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// Build the record for a run without writing it.
    #[must_use]
    pub fn build(result: Option<RunResult>, metrics: &MetricSets, context: RecordContext) -> MetricRecord {
        MetricRecord::builder(context.experiment, context.backend)
            .started_at(context.started_at)
            .elapsed_secs(context.elapsed_secs)
            .result(normalize(result, metrics))
            .build()
    }

    /// Append an already built record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Recording`] when the target cannot be written.
    pub fn append(&self, record: &MetricRecord) -> Result<()> {
        append_to(&self.target, record)?;
        info!(
            experiment = record.experiment(),
            backend = record.backend(),
            elapsed_secs = record.elapsed_secs(),
            output = %self.target,
            "Recorded run metrics"
        );
        Ok(())
    }

    /// Normalize `result` against `metrics`, stamp `context`, and append.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Recording`] when the target cannot be written.
    pub fn record(
        &self,
        result: Option<RunResult>,
        metrics: &MetricSets,
        context: RecordContext,
    ) -> Result<MetricRecord> {
        let record = Self::build(result, metrics, context);
        self.append(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{uniform_metric_sets, MetricKind, Split};
    use crate::tracking::HistoryStore;

    fn context() -> RecordContext {
        RecordContext {
            experiment: "cifar10_allcnn.yaml".into(),
            started_at: Utc::now(),
            elapsed_secs: 3.5,
            backend: "nervanagpu".into(),
        }
    }

    #[test]
    fn test_experiment_identity_is_file_name() {
        assert_eq!(
            experiment_identity(Path::new("examples/cifar10/allcnn.yaml")),
            "allcnn.yaml"
        );
        assert_eq!(experiment_identity(Path::new("/")), "/");
    }

    #[test]
    fn test_record_appends_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.tsv");
        let recorder = MetricsRecorder::new(OutputTarget::File(path.clone()));
        let metrics = uniform_metric_sets(&[MetricKind::MisclassPercentage]);

        let reported = RunResult::new().with(Split::Train, "MisclassPercentage", 4.0);
        let record = recorder.record(Some(reported), &metrics, context()).unwrap();
        assert_eq!(record.backend(), "nervanagpu");
        assert!(record
            .result()
            .get(Split::Validation, "MisclassPercentage")
            .unwrap()
            .is_nan());

        let loaded = HistoryStore::new(path).load().unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn test_record_never_rewrites_prior_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.tsv");
        let recorder = MetricsRecorder::new(OutputTarget::File(path.clone()));
        let metrics = MetricSets::new();

        let first = recorder.record(None, &metrics, context()).unwrap();
        let second = recorder.record(None, &metrics, context()).unwrap();
        assert_eq!(HistoryStore::new(path).load().unwrap(), vec![first, second]);
    }
}
