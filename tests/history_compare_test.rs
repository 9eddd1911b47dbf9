//! History comparison tests
//!
//! Runs are recorded to a store file, then compared against the most recent
//! comparable history.
//!
//! Toyota Way: Jidoka (stop on regressions against the run's own history)

use chrono::{DateTime, Duration, TimeZone, Utc};
use trueno_runner::compare::{
    is_flagged, HistoryComparator, ReportFormat, DEFAULT_COLOR_THRESHOLD,
};
use trueno_runner::config::{uniform_metric_sets, MetricKind, Split};
use trueno_runner::output::OutputTarget;
use trueno_runner::tracking::{HistoryStore, MetricRecord, MetricsRecorder, RecordContext, RunResult};

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
}

fn run(experiment: &str, backend: &str, minute: i64, misclass: f64) -> MetricRecord {
    MetricRecord::builder(experiment, backend)
        .started_at(at(minute))
        .elapsed_secs(30.0)
        .result(RunResult::new().with(Split::Test, "MisclassPercentage", misclass))
        .build()
}

// =============================================================================
// History Selection
// =============================================================================

#[test]
fn test_window_keeps_ten_most_recent() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path().join("history.tsv"));
    for minute in 0..15 {
        store
            .append(&run("alexnet.yaml", "nervanagpu", minute, 1.0 + minute as f64))
            .unwrap();
    }
    let current = run("alexnet.yaml", "nervanagpu", 30, 12.0);
    store.append(&current).unwrap();

    let records = store.load().unwrap();
    assert_eq!(records.len(), 16);

    let comparator = HistoryComparator::new(10, false);
    let history = comparator.select_history(&records, &current);
    assert_eq!(history.len(), 10);
    assert_eq!(history.first().unwrap().started_at(), at(5));
    assert_eq!(history.last().unwrap().started_at(), at(14));

    // Values 6..=15 for minutes 5..=14.
    let report = comparator.compare(&records, &current);
    let row = report.row(Split::Test, "MisclassPercentage").unwrap();
    let stats = row.history.unwrap();
    assert_eq!(stats.count, 10);
    assert!((stats.mean - 10.5).abs() < 1e-12);
    assert!((row.delta.unwrap() - 1.5).abs() < 1e-12);
}

#[test]
fn test_match_backend_filters_history() {
    let records = vec![
        run("alexnet.yaml", "CPU", 0, 50.0),
        run("alexnet.yaml", "nervanagpu", 1, 10.0),
        run("alexnet.yaml", "nervanagpu", 2, 10.0),
        run("vgg.yaml", "nervanagpu", 3, 99.0),
    ];
    let current = run("alexnet.yaml", "nervanagpu", 4, 10.0);

    let any_backend = HistoryComparator::new(10, false).compare(&records, &current);
    assert_eq!(any_backend.comps(), 3);

    let same_backend = HistoryComparator::new(10, true).compare(&records, &current);
    assert_eq!(same_backend.comps(), 2);
    let row = same_backend.row(Split::Test, "MisclassPercentage").unwrap();
    assert!(!row.flagged);
    assert!(row.history.unwrap().std_dev.abs() < f64::EPSILON);
}

#[test]
fn test_equal_timestamps_keep_store_order() {
    let records = vec![
        run("a.yaml", "CPU", 0, 1.0),
        run("a.yaml", "CPU", 0, 2.0),
        run("a.yaml", "CPU", 0, 3.0),
    ];
    let current = run("a.yaml", "nervanagpu", 1, 3.0);
    let history = HistoryComparator::new(2, false).select_history(&records, &current);
    let values: Vec<f64> = history
        .iter()
        .filter_map(|r| r.result().get(Split::Test, "MisclassPercentage"))
        .collect();
    assert_eq!(values, vec![2.0, 3.0]);
}

#[test]
fn test_no_history_is_not_a_fault() {
    let current = run("new.yaml", "CPU", 0, 1.0);
    let report = HistoryComparator::default().compare(&[], &current);
    assert!(report.is_empty());
    assert_eq!(report.flagged().count(), 0);
}

// =============================================================================
// Threshold Flagging
// =============================================================================

#[test]
fn test_threshold_boundary_is_inclusive() {
    let history = vec![run("a.yaml", "CPU", 0, 0.5)];

    let at_threshold = HistoryComparator::new(10, false)
        .color_threshold(0.5)
        .compare(&history, &run("a.yaml", "CPU", 1, 0.75));
    assert_eq!(at_threshold.flagged().count(), 1);

    let below_threshold = HistoryComparator::new(10, false)
        .color_threshold(0.5)
        .compare(&history, &run("a.yaml", "CPU", 1, 0.7));
    assert_eq!(below_threshold.flagged().count(), 0);
}

#[test]
fn test_default_threshold_both_sides() {
    let history = vec![run("a.yaml", "CPU", 0, 0.5)];
    let comparator = HistoryComparator::default();

    let flagged = comparator.compare(&history, &run("a.yaml", "CPU", 1, 0.51));
    assert_eq!(flagged.flagged().count(), 1);

    let steady = comparator.compare(&history, &run("a.yaml", "CPU", 1, 0.504));
    assert_eq!(steady.flagged().count(), 0);

    // Relative delta of exactly the threshold is flagged.
    let boundary = comparator.compare(&history, &run("a.yaml", "CPU", 1, 0.505));
    assert_eq!(boundary.flagged().count(), 1);
    assert!(is_flagged(0.505, 0.50, DEFAULT_COLOR_THRESHOLD));
}

#[test]
fn test_nan_history_values_skipped() {
    let history = vec![
        run("a.yaml", "CPU", 0, f64::NAN),
        run("a.yaml", "CPU", 1, 4.0),
    ];
    let report = HistoryComparator::default().compare(&history, &run("a.yaml", "CPU", 2, 4.0));
    let stats = report.row(Split::Test, "MisclassPercentage").unwrap().history.unwrap();
    assert_eq!(stats.count, 1);
    assert!((stats.mean - 4.0).abs() < f64::EPSILON);
}

// =============================================================================
// Record, Then Compare
// =============================================================================

#[test]
fn test_recorded_runs_render_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.tsv");
    let recorder = MetricsRecorder::new(OutputTarget::File(path.clone()));
    let metrics = uniform_metric_sets(&[MetricKind::MisclassPercentage, MetricKind::Auc]);

    for (minute, misclass) in [(0, 8.0), (1, 8.0)] {
        recorder
            .record(
                Some(RunResult::new().with(Split::Test, "MisclassPercentage", misclass)),
                &metrics,
                RecordContext {
                    experiment: "mnist.yaml".into(),
                    started_at: at(minute),
                    elapsed_secs: 12.0,
                    backend: "CPU".into(),
                },
            )
            .unwrap();
    }
    let current = MetricsRecorder::build(
        Some(RunResult::new().with(Split::Test, "MisclassPercentage", 9.0)),
        &metrics,
        RecordContext {
            experiment: "mnist.yaml".into(),
            started_at: at(2),
            elapsed_secs: 12.0,
            backend: "CPU".into(),
        },
    );

    let records = HistoryStore::new(&path).load().unwrap();
    let report = HistoryComparator::default().compare(&records, &current);
    // 3 splits x 2 metrics
    assert_eq!(report.rows().len(), 6);
    assert_eq!(report.flagged().count(), 1);

    let format = ReportFormat {
        color: false,
        ..ReportFormat::default()
    };
    let text = format.render(&report);
    assert_eq!(text.lines().count(), 7);
    assert!(text
        .lines()
        .any(|l| l == "mnist.yaml\tCPU\ttest\tMisclassPercentage\t9.0000\t8.0000\t0.0000\t1.0000\t2"));
    assert!(text
        .lines()
        .any(|l| l == "mnist.yaml\tCPU\ttrain\tAUC\tnan\t-\t-\t-\t0"));
}
