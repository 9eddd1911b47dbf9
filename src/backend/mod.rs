//! Compute backend resolution
//!
//! Turns the hardware hints given on the command line into exactly one
//! backend handle, or refuses. An explicit hardware request never degrades
//! to a default backend.
//!
//! Toyota Way Principles:
//! - Poka-Yoke: contradictory hints fail before any run starts
//! - Jidoka: device ids without a hardware flag stop the line instead of being ignored

mod numerr;

pub use numerr::{NumErrAction, NumErrCondition, NumErrPolicy};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ExperimentConfig;
use crate::{Error, Result};

/// GPU backend implementations selectable with `--gpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVariant {
    /// cuda-convnet based kernels
    CudaNet,
    /// Maxwell assembler kernels
    NervanaGpu,
}

impl GpuVariant {
    /// Lower-case variant name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CudaNet => "cudanet",
            Self::NervanaGpu => "nervanagpu",
        }
    }
}

impl FromStr for GpuVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cudanet" => Ok(Self::CudaNet),
            "nervanagpu" => Ok(Self::NervanaGpu),
            other => Err(Error::Configuration(format!(
                "unknown gpu variant '{other}' (expected cudanet or nervanagpu)"
            ))),
        }
    }
}

impl fmt::Display for GpuVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Host CPU
    Cpu,
    /// Flexpoint number format emulated on the host CPU
    Flexpoint,
    /// cuda-convnet GPU backend
    CudaNet,
    /// nervanagpu GPU backend
    NervanaGpu,
    /// Nervana specialized hardware
    #[serde(rename = "nrv")]
    NervanaHardware,
}

impl BackendKind {
    /// Whether the backend runs on an accelerator.
    #[must_use]
    pub const fn is_accelerator(self) -> bool {
        matches!(self, Self::CudaNet | Self::NervanaGpu | Self::NervanaHardware)
    }

    /// Whether the backend implements stochastic rounding.
    #[must_use]
    pub const fn supports_stochastic_rounding(self) -> bool {
        matches!(
            self,
            Self::NervanaGpu | Self::NervanaHardware | Self::Flexpoint
        )
    }

    /// Name recorded alongside metrics: `CPU` for host execution, otherwise
    /// the lower-cased accelerator name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Cpu | Self::Flexpoint => "CPU",
            Self::CudaNet => "cudanet",
            Self::NervanaGpu => "nervanagpu",
            Self::NervanaHardware => "nrv",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cpu => "cpu",
            Self::Flexpoint => "flexpoint",
            Self::CudaNet => "cudanet",
            Self::NervanaGpu => "nervanagpu",
            Self::NervanaHardware => "nrv",
        };
        f.write_str(name)
    }
}

/// Hardware hints collected from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendHints {
    /// GPU implementation
    pub gpu: Option<GpuVariant>,
    /// Specialized hardware
    pub nrv: bool,
    /// Flexpoint numeric precision
    pub flexpoint: bool,
    /// Stochastic rounding: unset, 0 or 1
    pub rounding: Option<u8>,
    /// Random number generator seed
    pub rng_seed: Option<u64>,
    /// Devices to bind; only meaningful with a hardware flag
    pub device_ids: Option<Vec<u32>>,
    /// Floating-point error handling
    pub numerr: NumErrPolicy,
}

impl BackendHints {
    /// Name recorded for a run using these hints.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match (self.gpu, self.nrv) {
            (Some(gpu), _) => gpu.as_str(),
            (None, true) => BackendKind::NervanaHardware.display_name(),
            (None, false) => BackendKind::Cpu.display_name(),
        }
    }
}

/// Opaque handle to a resolved backend.
///
/// Carries everything the experiment needs to construct its numeric
/// backend. It is serialized into the execution plan handed to the
/// experiment program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHandle {
    /// Implementation
    #[serde(rename = "type")]
    pub kind: BackendKind,
    /// Random number generator seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
    /// Stochastic rounding enabled
    #[serde(default)]
    pub stochastic_round: bool,
    /// Flexpoint number format on specialized hardware
    #[serde(default)]
    pub flexpoint: bool,
    /// Bound devices
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_ids: Vec<u32>,
    /// Floating-point error handling
    #[serde(default, skip_serializing_if = "NumErrPolicy::is_empty")]
    pub numerr: NumErrPolicy,
}

impl BackendHandle {
    /// Handle for `kind` with default settings.
    #[must_use]
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            rng_seed: None,
            stochastic_round: false,
            flexpoint: false,
            device_ids: Vec::new(),
            numerr: NumErrPolicy::default(),
        }
    }

    /// Name recorded alongside metrics.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        self.kind.display_name()
    }
}

/// Maps hardware hints to a backend handle.
pub struct BackendResolver {
    _private: (),
}

impl BackendResolver {
    /// Resolve hints into a backend handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the conflicting hints when no
    /// single backend satisfies them.
    pub fn resolve(hints: &BackendHints) -> Result<BackendHandle> {
        if let (Some(gpu), true) = (hints.gpu, hints.nrv) {
            return Err(Error::Configuration(format!(
                "--gpu {gpu} and --nrv select different hardware; pass only one"
            )));
        }
        if let (Some(gpu), true) = (hints.gpu, hints.flexpoint) {
            return Err(Error::Configuration(format!(
                "--flexpoint is not available on --gpu {gpu}; use --nrv or CPU emulation"
            )));
        }
        if let Some(ids) = &hints.device_ids {
            if hints.gpu.is_none() && !hints.nrv {
                return Err(Error::Configuration(
                    "--device_id requires a hardware flag (--gpu or --nrv)".to_string(),
                ));
            }
            if ids.is_empty() {
                return Err(Error::Configuration(
                    "--device_id needs at least one device".to_string(),
                ));
            }
        }

        let kind = match (hints.gpu, hints.nrv, hints.flexpoint) {
            (Some(GpuVariant::CudaNet), ..) => BackendKind::CudaNet,
            (Some(GpuVariant::NervanaGpu), ..) => BackendKind::NervanaGpu,
            (None, true, _) => BackendKind::NervanaHardware,
            (None, false, true) => BackendKind::Flexpoint,
            (None, false, false) => BackendKind::Cpu,
        };

        let stochastic_round = match hints.rounding {
            None | Some(0) => false,
            Some(1) if kind.supports_stochastic_rounding() => true,
            Some(1) => {
                return Err(Error::Configuration(format!(
                    "--rounding 1 requested but the {kind} backend has no stochastic rounding"
                )))
            }
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "--rounding must be 0 or 1, got {other}"
                )))
            }
        };

        let handle = BackendHandle {
            kind,
            rng_seed: hints.rng_seed,
            stochastic_round,
            flexpoint: hints.flexpoint && kind == BackendKind::NervanaHardware,
            device_ids: hints.device_ids.clone().unwrap_or_default(),
            numerr: hints.numerr.clone(),
        };
        debug!(backend = %handle.kind, devices = ?handle.device_ids, "Resolved backend");
        Ok(handle)
    }

    /// Resolve the backend for `config`, reusing a pre-bound backend if the
    /// description carries one.
    ///
    /// # Errors
    ///
    /// Same as [`BackendResolver::resolve`] when no backend is pre-bound.
    pub fn resolve_for(config: &ExperimentConfig, hints: &BackendHints) -> Result<BackendHandle> {
        if let Some(bound) = &config.backend {
            info!(
                backend = %bound.kind,
                "Using backend bound in the experiment description; command-line hints ignored"
            );
            return Ok(bound.clone());
        }
        Self::resolve(hints)
    }
}
