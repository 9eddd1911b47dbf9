//! Experiment description
//!
//! An experiment description is a YAML document deserialized once per
//! process. Every optional block is an explicit `Option`, so the rest of the
//! runner checks presence through the type instead of probing attributes.
//!
//! ```yaml
//! experiment:
//!   command: [python, train.py]
//! dataset:
//!   type: CIFAR10
//!   batch_size: 128
//! model:
//!   num_epochs: 20
//!   layers:
//!     - {name: input, type: data}
//!     - {name: fc1, type: fully_connected, nout: 200}
//!     - {name: drop, type: dropout, keep: 0.5}
//! metrics:
//!   train: [MisclassPercentage]
//!   test: [MisclassPercentage, AUC]
//! logging:
//!   level: debug
//! ```

mod dataset;
mod metrics;
mod model;

pub use dataset::{DatasetConfig, DatasetKind, ShrinkPolicy};
pub use metrics::{uniform_metric_sets, MetricKind, MetricSets, Split};
pub use model::{LayerConfig, LayerKind, ModelConfig, DEFAULT_NUM_EPOCHS};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::backend::BackendHandle;
use crate::{Error, Result};

/// Log line layout selectable from a description's `logging.format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Timestamp, level, target, fields
    #[default]
    Full,
    /// Single-line abbreviated layout
    Compact,
    /// Multi-line human-oriented layout
    Pretty,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::Configuration(format!(
                "unknown log format '{other}' (expected full, compact, pretty or json)"
            ))),
        }
    }
}

/// `logging` block of an experiment description.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Redirect log output to this file instead of the console
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<PathBuf>,
    /// Line layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Minimum severity (`trace`, `debug`, `info`, `warn`, `error`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl LoggingConfig {
    /// Parsed line layout, defaulting to [`LogFormat::Full`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown layout name.
    pub fn log_format(&self) -> Result<LogFormat> {
        self.format
            .as_deref()
            .map_or(Ok(LogFormat::default()), LogFormat::from_str)
    }

    /// Parsed minimum severity, if one was declared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown level name.
    pub fn level_filter(&self) -> Result<Option<LevelFilter>> {
        self.level
            .as_deref()
            .map(|level| {
                LevelFilter::from_str(level).map_err(|_| {
                    Error::Configuration(format!("unknown log level '{level}'"))
                })
            })
            .transpose()
    }
}

/// How the runner launches the experiment's training program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentSpec {
    /// Program and arguments
    pub command: Vec<String>,
    /// Working directory for the program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// A complete experiment description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Training program launched by the runner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<ExperimentSpec>,
    /// Pre-bound backend; skips hint resolution when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendHandle>,
    /// Metrics to report per split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricSets>,
    /// Model block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,
    /// Dataset block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetConfig>,
    /// Logging reconfiguration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
    /// Live inference mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live: Option<bool>,
}

impl ExperimentConfig {
    /// Parse a description from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`] when the text is not a valid description.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a description file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Description`] naming the file when it cannot be read
    /// or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Description {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&text).map_err(|e| Error::Description {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Dataset identity, if a dataset block is present.
    #[must_use]
    pub fn dataset_kind(&self) -> Option<&DatasetKind> {
        self.dataset.as_ref().map(|d| &d.kind)
    }

    /// Declared metric sets, or an empty set when none are declared.
    #[must_use]
    pub fn metric_sets(&self) -> MetricSets {
        self.metrics.clone().unwrap_or_default()
    }

    /// Whether the description declares at least one metric set.
    #[must_use]
    pub fn defines_metrics(&self) -> bool {
        self.metrics.as_ref().is_some_and(|m| !m.is_empty())
    }
}
