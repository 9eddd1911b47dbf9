//! History Comparator
//!
//! Compares a new run against the recent history of the same experiment.
//!
//! ```text
//! store records ─┬─ same identity (+ same backend)
//!                ├─ minus the run itself
//!                ├─ stable sort by started_at
//!                └─ last max_comps ──> per (split, metric): mean, std, delta
//! ```
//!
//! The flag is relative: `|current - mean| / max(|mean|, 1e-9) >= threshold`.
//! Values that are NaN in history are skipped; a metric with no usable
//! history is reported without statistics.

mod report;

pub use report::ReportFormat;

use tracing::{debug, warn};

use crate::config::Split;
use crate::tracking::MetricRecord;

/// Default number of historical runs compared against.
pub const DEFAULT_MAX_COMPS: usize = 10;

/// Default relative-change threshold for flagging a row.
pub const DEFAULT_COLOR_THRESHOLD: f64 = 0.01;

/// Lower bound on `|mean|` when computing relative change.
pub const MEAN_EPSILON: f64 = 1e-9;

/// Summary of the historical values of one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStats {
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (0 for a single value)
    pub std_dev: f64,
    /// Number of values summarized
    pub count: usize,
}

impl HistoryStats {
    /// Statistics over the finite values of `values`, `None` when there are none.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let values: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        if values.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std_dev = if values.len() < 2 {
            0.0
        } else {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        };
        Some(Self {
            mean,
            std_dev,
            count: values.len(),
        })
    }
}

/// Whether `current` differs from `mean` by at least `threshold`, relative to `mean`.
#[must_use]
pub fn is_flagged(current: f64, mean: f64, threshold: f64) -> bool {
    let relative = (current - mean).abs() / mean.abs().max(MEAN_EPSILON);
    relative >= threshold
}

/// One (split, metric) of the new run against its history.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// Dataset split
    pub split: Split,
    /// Metric name
    pub metric: String,
    /// Value in the new run
    pub current: f64,
    /// Historical statistics, `None` without usable history
    pub history: Option<HistoryStats>,
    /// `current - mean`
    pub delta: Option<f64>,
    /// Relative change reached the threshold
    pub flagged: bool,
}

/// Comparison of one run against its history.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    experiment: String,
    backend: String,
    comps: usize,
    rows: Vec<ComparisonRow>,
}

impl ComparisonReport {
    /// Experiment identity of the new run.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Backend display name of the new run.
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Number of historical runs selected.
    #[must_use]
    pub const fn comps(&self) -> usize {
        self.comps
    }

    /// All rows, in split then metric order.
    #[must_use]
    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    /// Row for `split` / `metric`.
    #[must_use]
    pub fn row(&self, split: Split, metric: &str) -> Option<&ComparisonRow> {
        self.rows
            .iter()
            .find(|row| row.split == split && row.metric == metric)
    }

    /// Rows whose change reached the threshold.
    pub fn flagged(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.rows.iter().filter(|row| row.flagged)
    }

    /// Whether there was no history to compare against.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.comps == 0
    }
}

/// Selects comparable history and computes per-metric statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryComparator {
    max_comps: usize,
    match_backend: bool,
    color_threshold: f64,
}

impl Default for HistoryComparator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMPS, false)
    }
}

impl HistoryComparator {
    /// Compare against at most `max_comps` runs, optionally only those on
    /// the same backend.
    #[must_use]
    pub const fn new(max_comps: usize, match_backend: bool) -> Self {
        Self {
            max_comps,
            match_backend,
            color_threshold: DEFAULT_COLOR_THRESHOLD,
        }
    }

    /// Relative change at which a row is flagged.
    #[must_use]
    pub const fn color_threshold(mut self, threshold: f64) -> Self {
        self.color_threshold = threshold;
        self
    }

    /// Records comparable to `current`, oldest first, at most `max_comps`.
    #[must_use]
    pub fn select_history<'a>(
        &self,
        records: &'a [MetricRecord],
        current: &MetricRecord,
    ) -> Vec<&'a MetricRecord> {
        let mut history: Vec<&MetricRecord> = records
            .iter()
            .filter(|r| r.experiment() == current.experiment())
            .filter(|r| !self.match_backend || r.backend() == current.backend())
            .filter(|r| !r.same_run(current))
            .collect();
        history.sort_by_key(|r| r.started_at());
        let skip = history.len().saturating_sub(self.max_comps);
        history.split_off(skip)
    }

    /// Compare `current` against `records`.
    ///
    /// An empty selection yields a report with no rows and a warning.
    #[must_use]
    pub fn compare(&self, records: &[MetricRecord], current: &MetricRecord) -> ComparisonReport {
        let history = self.select_history(records, current);
        let mut report = ComparisonReport {
            experiment: current.experiment().to_string(),
            backend: current.backend().to_string(),
            comps: history.len(),
            rows: Vec::new(),
        };
        if history.is_empty() {
            warn!(
                experiment = current.experiment(),
                backend = current.backend(),
                match_backend = self.match_backend,
                "No comparable history found"
            );
            return report;
        }
        debug!(
            experiment = current.experiment(),
            comps = history.len(),
            "Comparing against history"
        );

        report.rows = current
            .result()
            .iter()
            .map(|(split, metric, value)| {
                let stats = HistoryStats::from_values(
                    history
                        .iter()
                        .filter_map(|r| r.result().get(split, metric)),
                );
                let delta = stats.map(|s| value - s.mean);
                let flagged = stats
                    .is_some_and(|s| is_flagged(value, s.mean, self.color_threshold));
                ComparisonRow {
                    split,
                    metric: metric.to_string(),
                    current: value,
                    history: stats,
                    delta,
                    flagged,
                }
            })
            .collect();
        report
    }
}
