//! Splits and metric kinds declared by an experiment description

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three canonical experiment stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    /// Training set
    Train,
    /// Held-out test set
    Test,
    /// Validation set
    Validation,
}

impl Split {
    /// All canonical splits, in record order.
    pub const ALL: [Self; 3] = [Self::Train, Self::Test, Self::Validation];

    /// Lower-case split name as it appears in descriptions and records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
            Self::Validation => "validation",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric instances an experiment can be asked to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Percentage of misclassified samples
    MisclassPercentage,
    /// Fraction of misclassified samples
    MisclassRate,
    /// Count of misclassified samples
    MisclassSum,
    /// Area under the ROC curve
    #[serde(rename = "AUC")]
    Auc,
    /// Mean log loss per sample
    LogLossMean,
    /// Summed log loss
    LogLossSum,
}

impl MetricKind {
    /// Standard production triple assigned when a description declares no metrics.
    pub const STANDARD: [Self; 3] = [Self::MisclassPercentage, Self::Auc, Self::LogLossMean];

    /// Name under which the metric value is reported and recorded.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MisclassPercentage => "MisclassPercentage",
            Self::MisclassRate => "MisclassRate",
            Self::MisclassSum => "MisclassSum",
            Self::Auc => "AUC",
            Self::LogLossMean => "LogLossMean",
            Self::LogLossSum => "LogLossSum",
        }
    }

    /// Look up a metric kind by its recorded name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::MisclassPercentage,
            Self::MisclassRate,
            Self::MisclassSum,
            Self::Auc,
            Self::LogLossMean,
            Self::LogLossSum,
        ]
        .into_iter()
        .find(|kind| kind.name() == name)
    }

    /// Whether an increase in this metric is an improvement.
    #[must_use]
    pub const fn higher_is_better(self) -> bool {
        matches!(self, Self::Auc)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-split ordered metric lists.
pub type MetricSets = BTreeMap<Split, Vec<MetricKind>>;

/// Build a metric set assigning the same metrics to every canonical split.
#[must_use]
pub fn uniform_metric_sets(metrics: &[MetricKind]) -> MetricSets {
    Split::ALL
        .into_iter()
        .map(|split| (split, metrics.to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_name_lookup() {
        for kind in MetricKind::STANDARD {
            assert_eq!(MetricKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(MetricKind::from_name("Perplexity"), None);
    }

    #[test]
    fn test_metric_sets_deserialize() {
        let sets: MetricSets =
            serde_yaml::from_str("train: [MisclassPercentage]\ntest: [AUC, LogLossMean]\n").unwrap();
        assert_eq!(sets[&Split::Train], vec![MetricKind::MisclassPercentage]);
        assert_eq!(sets[&Split::Test], vec![MetricKind::Auc, MetricKind::LogLossMean]);
        assert!(!sets.contains_key(&Split::Validation));
    }

    #[test]
    fn test_uniform_metric_sets() {
        let sets = uniform_metric_sets(&MetricKind::STANDARD);
        assert_eq!(sets.len(), 3);
        assert!(sets.values().all(|m| m.as_slice() == MetricKind::STANDARD));
    }
}
