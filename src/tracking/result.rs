//! Per-split metric values produced by a run

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{MetricSets, Split};

type RawRunResult = BTreeMap<Split, BTreeMap<String, Option<f64>>>;

/// Metric values keyed by split, then metric name.
///
/// `f64::NAN` marks a value the run did not produce. In JSON the sentinel
/// is written as `null` so it survives a round trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawRunResult", into = "RawRunResult")]
pub struct RunResult {
    splits: BTreeMap<Split, BTreeMap<String, f64>>,
}

impl RunResult {
    /// Sentinel for a metric the run did not produce.
    pub const NOT_AVAILABLE: f64 = f64::NAN;

    /// Create an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` on `split` to `value`.
    pub fn insert(&mut self, split: Split, name: impl Into<String>, value: f64) {
        self.splits
            .entry(split)
            .or_default()
            .insert(name.into(), value);
    }

    /// Builder-style [`RunResult::insert`].
    #[must_use]
    pub fn with(mut self, split: Split, name: impl Into<String>, value: f64) -> Self {
        self.insert(split, name, value);
        self
    }

    /// Value of `name` on `split`.
    #[must_use]
    pub fn get(&self, split: Split, name: &str) -> Option<f64> {
        self.splits.get(&split).and_then(|m| m.get(name)).copied()
    }

    /// All metrics of `split`.
    #[must_use]
    pub fn split(&self, split: Split) -> Option<&BTreeMap<String, f64>> {
        self.splits.get(&split)
    }

    /// Whether `split` is present, even if it holds no metrics.
    #[must_use]
    pub fn has_split(&self, split: Split) -> bool {
        self.splits.contains_key(&split)
    }

    /// Whether no split is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Iterate `(split, metric name, value)` in split then name order.
    pub fn iter(&self) -> impl Iterator<Item = (Split, &str, f64)> {
        self.splits.iter().flat_map(|(split, metrics)| {
            metrics
                .iter()
                .map(move |(name, value)| (*split, name.as_str(), *value))
        })
    }
}

impl PartialEq for RunResult {
    /// Values compare equal when both are the not-available sentinel.
    fn eq(&self, other: &Self) -> bool {
        self.splits.len() == other.splits.len()
            && self.splits.iter().zip(&other.splits).all(|((sa, ma), (sb, mb))| {
                sa == sb
                    && ma.len() == mb.len()
                    && ma.iter().zip(mb).all(|((na, va), (nb, vb))| {
                        na == nb && (va == vb || (va.is_nan() && vb.is_nan()))
                    })
            })
    }
}

impl From<RawRunResult> for RunResult {
    fn from(raw: RawRunResult) -> Self {
        let splits = raw
            .into_iter()
            .map(|(split, metrics)| {
                let metrics = metrics
                    .into_iter()
                    .map(|(name, value)| (name, value.unwrap_or(Self::NOT_AVAILABLE)))
                    .collect();
                (split, metrics)
            })
            .collect();
        Self { splits }
    }
}

impl From<RunResult> for RawRunResult {
    fn from(result: RunResult) -> Self {
        result
            .splits
            .into_iter()
            .map(|(split, metrics)| {
                let metrics = metrics
                    .into_iter()
                    .map(|(name, value)| (name, (!value.is_nan()).then_some(value)))
                    .collect();
                (split, metrics)
            })
            .collect()
    }
}

/// Give `result` a uniform shape.
///
/// Every canonical split is present, and every metric declared for a split
/// is present. A declared metric the run did not produce gets the
/// [`RunResult::NOT_AVAILABLE`] sentinel. Values the run produced beyond the
/// declared set are kept.
#[must_use]
pub fn normalize(result: Option<RunResult>, metrics: &MetricSets) -> RunResult {
    let mut result = result.unwrap_or_default();
    for split in Split::ALL {
        let values = result.splits.entry(split).or_default();
        for kind in metrics.get(&split).into_iter().flatten() {
            values
                .entry(kind.name().to_string())
                .or_insert(RunResult::NOT_AVAILABLE);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{uniform_metric_sets, MetricKind};

    #[test]
    fn test_normalize_empty_result() {
        let metrics = uniform_metric_sets(&MetricKind::STANDARD);
        let result = normalize(None, &metrics);
        for split in Split::ALL {
            for kind in MetricKind::STANDARD {
                assert!(result.get(split, kind.name()).unwrap().is_nan());
            }
        }
    }

    #[test]
    fn test_normalize_keeps_reported_values() {
        let metrics = uniform_metric_sets(&[MetricKind::MisclassPercentage, MetricKind::Auc]);
        let reported = RunResult::new()
            .with(Split::Test, "MisclassPercentage", 12.5)
            .with(Split::Test, "Perplexity", 3.0);
        let result = normalize(Some(reported), &metrics);
        assert_eq!(result.get(Split::Test, "MisclassPercentage"), Some(12.5));
        assert_eq!(result.get(Split::Test, "Perplexity"), Some(3.0));
        assert!(result.get(Split::Test, "AUC").unwrap().is_nan());
    }

    #[test]
    fn test_normalize_dropped_split_present_but_empty() {
        let mut metrics = uniform_metric_sets(&[MetricKind::MisclassPercentage]);
        metrics.remove(&Split::Validation);
        let result = normalize(None, &metrics);
        assert!(result.has_split(Split::Validation));
        assert!(result.split(Split::Validation).unwrap().is_empty());
    }

    #[test]
    fn test_json_null_is_sentinel() {
        let result: RunResult =
            serde_json::from_str(r#"{"train": {"AUC": null, "LogLossMean": 0.25}}"#).unwrap();
        assert!(result.get(Split::Train, "AUC").unwrap().is_nan());
        assert_eq!(result.get(Split::Train, "LogLossMean"), Some(0.25));

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"train":{"AUC":null,"LogLossMean":0.25}}"#);
    }

    #[test]
    fn test_nan_sentinels_compare_equal() {
        let a = RunResult::new().with(Split::Train, "AUC", f64::NAN);
        let b = RunResult::new().with(Split::Train, "AUC", f64::NAN);
        let c = RunResult::new().with(Split::Train, "AUC", 0.5);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
