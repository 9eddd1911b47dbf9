//! Run-mode override pipeline
//!
//! Each step takes an [`ExperimentConfig`] by value and returns the
//! overridden config. Every step forces absolute values, so the pipeline
//! is idempotent for a given mode and dataset.
//!
//! Integration mode (fast correctness check):
//! 1. Metrics: misclassification percentage on every split
//! 2. Determinism: stochastic layers removed
//! 3. No disk state: serialization paths cleared
//! 4. Dataset shrinkage per [`DatasetKind::shrink_policy`]
//!
//! Production mode:
//! 5. Standard metric triple when the description declares none

use std::fmt;

use tracing::debug;

use crate::config::{uniform_metric_sets, DatasetKind, ExperimentConfig, MetricKind};

/// Run profile selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Full-fidelity run
    #[default]
    Production,
    /// Reduced-fidelity run for fast correctness checks
    Integration,
}

impl RunMode {
    /// Mode for the `--integration` flag.
    #[must_use]
    pub const fn from_integration_flag(integration: bool) -> Self {
        if integration {
            Self::Integration
        } else {
            Self::Production
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Integration => f.write_str("integration"),
        }
    }
}

/// Apply every override for `mode` in order.
#[must_use]
pub fn apply_overrides(
    config: ExperimentConfig,
    mode: RunMode,
    dataset: Option<&DatasetKind>,
) -> ExperimentConfig {
    debug!(%mode, dataset = ?dataset.map(DatasetKind::as_str), "Applying run-mode overrides");
    match mode {
        RunMode::Integration => {
            let config = integration_metrics(config);
            let config = strip_stochastic_layers(config);
            let config = suppress_serialization(config);
            shrink_dataset(config, dataset)
        }
        RunMode::Production => assign_standard_metrics(config),
    }
}

/// Replace all metrics with misclassification percentage on every split.
#[must_use]
pub fn integration_metrics(mut config: ExperimentConfig) -> ExperimentConfig {
    config.metrics = Some(uniform_metric_sets(&[MetricKind::MisclassPercentage]));
    config
}

/// Remove layers that draw random numbers, keeping the order of the rest.
#[must_use]
pub fn strip_stochastic_layers(mut config: ExperimentConfig) -> ExperimentConfig {
    if let Some(model) = config.model.as_mut() {
        let before = model.layers.len();
        model.layers.retain(|layer| !layer.is_stochastic());
        let removed = before - model.layers.len();
        if removed > 0 {
            debug!(removed, "Removed stochastic layers");
        }
    }
    config
}

/// Clear every model state persistence setting.
#[must_use]
pub fn suppress_serialization(mut config: ExperimentConfig) -> ExperimentConfig {
    if let Some(model) = config.model.as_mut() {
        model.serialized_path = None;
        model.deserialized_path = None;
        model.serialize_schedule = None;
    }
    config
}

/// Apply the dataset's shrink policy.
#[must_use]
pub fn shrink_dataset(
    mut config: ExperimentConfig,
    dataset: Option<&DatasetKind>,
) -> ExperimentConfig {
    let Some(kind) = dataset else {
        return config;
    };
    let policy = kind.shrink_policy();

    if let Some(data) = config.dataset.as_mut() {
        if let Some(n) = policy.num_train_samples {
            data.num_train_samples = Some(n);
        }
        if let Some(n) = policy.num_valid_samples {
            data.num_valid_samples = Some(n);
        }
        if policy.disable_augmentation {
            data.augment = Some(false);
        }
        if let Some(pct) = policy.sample_pct {
            data.sample_pct = Some(pct);
        }
    }
    if let (Some(epochs), Some(model)) = (policy.num_epochs, config.model.as_mut()) {
        model.num_epochs = epochs;
    }
    if let (Some(split), Some(metrics)) = (policy.drop_split, config.metrics.as_mut()) {
        metrics.remove(&split);
    }
    config
}

/// Assign the standard metric triple when no metrics are declared.
#[must_use]
pub fn assign_standard_metrics(mut config: ExperimentConfig) -> ExperimentConfig {
    if !config.defines_metrics() {
        config.metrics = Some(uniform_metric_sets(&MetricKind::STANDARD));
    }
    config
}

/// Set live inference mode when requested.
#[must_use]
pub fn with_live(mut config: ExperimentConfig, live: bool) -> ExperimentConfig {
    if live {
        config.live = Some(true);
    }
    config
}
