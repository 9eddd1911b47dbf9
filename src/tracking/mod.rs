//! Run Tracking (metric recording and history)
//!
//! ## Schema Overview
//!
//! ```text
//! RunRecord (lifecycle, timing)
//!     │
//!     └── MetricRecord (1 per run) ──> HistoryStore (append-only TSV)
//!             │
//!             └── RunResult (split → metric → value)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_runner::config::{uniform_metric_sets, MetricKind, Split};
//! use trueno_runner::tracking::{normalize, RunRecord, RunResult, RunStatus};
//!
//! let mut run = RunRecord::new("mnist_mlp.yaml", "CPU");
//! run.start();
//! let raw = RunResult::new().with(Split::Test, "MisclassPercentage", 2.1);
//! run.complete(RunStatus::Success);
//!
//! let metrics = uniform_metric_sets(&[MetricKind::MisclassPercentage]);
//! let result = normalize(Some(raw), &metrics);
//! assert!(result.get(Split::Train, "MisclassPercentage").unwrap().is_nan());
//! ```

mod metric_record;
mod recorder;
mod result;
mod run_record;
mod store;

pub use metric_record::{MetricRecord, MetricRecordBuilder};
pub use recorder::{experiment_identity, MetricsRecorder, RecordContext};
pub use result::{normalize, RunResult};
pub use run_record::{RunRecord, RunStatus};
pub use store::{append_to, decode_records, encode_records, HistoryStore};
