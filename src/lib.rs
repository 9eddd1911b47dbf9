//! # Trueno-Runner: Experiment Runner with Metric Regression Tracking
//!
//! **Version**: 0.1.0
//!
//! Trueno-Runner launches a machine-learning experiment described by a YAML
//! file, binds it to a compute backend chosen from hardware hints, optionally
//! shrinks it for a quick integration run, and appends the resulting metrics
//! to a durable history that later runs are compared against.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: Conflicting hardware hints fail before any work runs
//! - **Jidoka**: Regressions are flagged against the experiment's own history
//! - **Muda elimination**: Integration mode strips epochs, samples and disk I/O
//! - **Genchi Genbutsu**: Every run records wall-clock timing and its backend
//!
//! ## Example Usage
//!
//! ```rust
//! use trueno_runner::backend::{BackendHints, BackendResolver, GpuVariant};
//! use trueno_runner::config::{ExperimentConfig, Split};
//! use trueno_runner::overrides::{apply_overrides, RunMode};
//!
//! let config = ExperimentConfig::from_yaml("dataset: {type: MNIST}\nmodel: {num_epochs: 40}\n")?;
//! let dataset = config.dataset_kind().cloned();
//! let config = apply_overrides(config, RunMode::Integration, dataset.as_ref());
//! assert_eq!(config.model.as_ref().map(|m| m.num_epochs), Some(5));
//! assert!(config.metric_sets().contains_key(&Split::Train));
//!
//! let hints = BackendHints { gpu: Some(GpuVariant::NervanaGpu), ..BackendHints::default() };
//! let backend = BackendResolver::resolve_for(&config, &hints)?;
//! assert_eq!(backend.display_name(), "nervanagpu");
//! # Ok::<(), trueno_runner::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod backend;
pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod output;
pub mod overrides;
pub mod tracking;

pub use error::{Error, Result};
