//! Comparison table rendering

use std::fmt::Write;

use super::{ComparisonReport, ComparisonRow};
use crate::config::MetricKind;

const RED: &str = "\x1b[0;31m";
const GREEN: &str = "\x1b[0;32m";
const NC: &str = "\x1b[0m";

const COLUMNS: [&str; 9] = [
    "experiment",
    "backend",
    "split",
    "metric",
    "current",
    "mean",
    "std",
    "delta",
    "comps",
];

/// Table layout for a [`ComparisonReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFormat {
    /// Separator placed between cells
    pub field_sep: String,
    /// Emit a header row
    pub header: bool,
    /// Pad cells to a common column width
    pub pad: bool,
    /// Color flagged rows (red regression, green improvement)
    pub color: bool,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self {
            field_sep: "\t".to_string(),
            header: true,
            pad: false,
            color: true,
        }
    }
}

impl ReportFormat {
    /// Render `report` as text, one line per row.
    #[must_use]
    pub fn render(&self, report: &ComparisonReport) -> String {
        let mut lines: Vec<(Vec<String>, Option<&str>)> = Vec::new();
        if self.header {
            lines.push((COLUMNS.iter().map(ToString::to_string).collect(), None));
        }
        for row in report.rows() {
            let color = if self.color && row.flagged {
                Some(if is_improvement(row) { GREEN } else { RED })
            } else {
                None
            };
            lines.push((cells(report, row), color));
        }

        let widths = if self.pad {
            column_widths(lines.iter().map(|(cells, _)| cells))
        } else {
            [0; COLUMNS.len()]
        };

        let mut out = String::new();
        for (cells, color) in &lines {
            let mut line = String::new();
            for (i, cell) in cells.iter().enumerate() {
                if i > 0 {
                    line.push_str(&self.field_sep);
                }
                let _ = write!(line, "{cell:<width$}", width = widths[i]);
            }
            let line = line.trim_end_matches(' ');
            match color {
                Some(color) => {
                    let _ = writeln!(out, "{color}{line}{NC}");
                }
                None => {
                    let _ = writeln!(out, "{line}");
                }
            }
        }
        out
    }
}

fn is_improvement(row: &ComparisonRow) -> bool {
    let higher_is_better = MetricKind::from_name(&row.metric).is_some_and(MetricKind::higher_is_better);
    row.delta
        .is_some_and(|delta| if higher_is_better { delta > 0.0 } else { delta < 0.0 })
}

fn cells(report: &ComparisonReport, row: &ComparisonRow) -> Vec<String> {
    let (mean, std, comps) = row.history.map_or_else(
        || ("-".to_string(), "-".to_string(), 0),
        |h| (number(h.mean), number(h.std_dev), h.count),
    );
    vec![
        report.experiment().to_string(),
        report.backend().to_string(),
        row.split.to_string(),
        row.metric.clone(),
        number(row.current),
        mean,
        std,
        row.delta.map_or_else(|| "-".to_string(), number),
        comps.to_string(),
    ]
}

fn number(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.4}")
    }
}

fn column_widths<'a>(rows: impl Iterator<Item = &'a Vec<String>>) -> [usize; COLUMNS.len()] {
    let mut widths = [0; COLUMNS.len()];
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::HistoryComparator;
    use crate::config::Split;
    use crate::tracking::{MetricRecord, RunResult};
    use chrono::{Duration, TimeZone, Utc};

    fn record(minute: i64, misclass: f64, auc: f64) -> MetricRecord {
        MetricRecord::builder("cifar.yaml", "CPU")
            .started_at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute))
            .result(
                RunResult::new()
                    .with(Split::Test, "MisclassPercentage", misclass)
                    .with(Split::Test, "AUC", auc),
            )
            .build()
    }

    fn report(current: &MetricRecord) -> ComparisonReport {
        let history = vec![record(0, 10.0, 0.8), record(1, 10.0, 0.8)];
        HistoryComparator::new(10, false).compare(&history, current)
    }

    #[test]
    fn test_plain_tab_table() {
        let format = ReportFormat {
            color: false,
            ..ReportFormat::default()
        };
        let text = format.render(&report(&record(2, 10.0, 0.8)));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], COLUMNS.join("\t"));
        assert_eq!(
            lines[2],
            "cifar.yaml\tCPU\ttest\tMisclassPercentage\t10.0000\t10.0000\t0.0000\t0.0000\t2"
        );
    }

    #[test]
    fn test_no_header_custom_separator() {
        let format = ReportFormat {
            field_sep: ",".into(),
            header: false,
            pad: false,
            color: false,
        };
        let text = format.render(&report(&record(2, 10.0, 0.8)));
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("cifar.yaml,CPU,test,AUC,"));
    }

    #[test]
    fn test_padding_aligns_columns() {
        let format = ReportFormat {
            field_sep: " ".into(),
            pad: true,
            color: false,
            ..ReportFormat::default()
        };
        let text = format.render(&report(&record(2, 10.0, 0.8)));
        let offsets: Vec<usize> = text.lines().map(|l| l.find("CPU").unwrap_or(0)).collect();
        assert_eq!(offsets[1], offsets[2]);
        assert_eq!(text.lines().next().unwrap().find("backend"), Some(offsets[1]));
    }

    #[test]
    fn test_colors_follow_metric_direction() {
        let text = ReportFormat::default().render(&report(&record(2, 12.0, 0.9)));
        let auc = text.lines().find(|l| l.contains("AUC")).unwrap();
        let misclass = text.lines().find(|l| l.contains("Misclass")).unwrap();
        assert!(auc.starts_with(GREEN));
        assert!(misclass.starts_with(RED));
        assert!(misclass.ends_with(NC));
    }

    #[test]
    fn test_missing_history_rendered_as_dash() {
        let history = vec![record(0, f64::NAN, 0.8)];
        let current = record(1, 5.0, 0.8);
        let report = HistoryComparator::new(10, false).compare(&history, &current);
        let format = ReportFormat {
            color: false,
            header: false,
            ..ReportFormat::default()
        };
        let text = format.render(&report);
        let misclass = text.lines().find(|l| l.contains("Misclass")).unwrap();
        assert!(misclass.ends_with("5.0000\t-\t-\t-\t0"));
    }
}
