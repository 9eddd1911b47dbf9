//! Error types for trueno-runner
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error raised by an opaque experiment implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Lifecycle stage of an experiment in which a fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStage {
    /// `Experiment::initialize`
    Initialize,
    /// `Experiment::run`
    Run,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => f.write_str("initialize"),
            Self::Run => f.write_str("run"),
        }
    }
}

/// trueno-runner error types
#[derive(Error, Debug)]
pub enum Error {
    /// Contradictory backend hints, malformed numeric-error policy, bad logging block
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Experiment description could not be read or deserialized
    #[error("Invalid experiment description {}: {message}", path.display())]
    Description {
        /// Description file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Experiment raised during initialization or run
    #[error("Experiment failed during {stage}: {source}")]
    Experiment {
        /// Stage that failed
        stage: RunStage,
        /// Error raised by the experiment
        #[source]
        source: BoxError,
    },

    /// Metric record could not be appended to the store
    #[error("Failed to record metrics to {}: {source}\nThe run result was printed to stdout instead.", path.display())]
    Recording {
        /// Store file
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// History store row could not be decoded
    #[error("Store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Delimited store error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Wrap an experiment error raised at `stage`.
    pub fn experiment(stage: RunStage, source: impl Into<BoxError>) -> Self {
        Self::Experiment {
            stage,
            source: source.into(),
        }
    }
}
