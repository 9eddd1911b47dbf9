//! Command-line drivers
//!
//! `trueno-run` loads an experiment description, applies the run-mode
//! overrides, resolves a backend, runs the experiment and optionally
//! records its metrics. `trueno-compare` compares recorded runs against
//! their history.

use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};

use crate::backend::{BackendHints, BackendResolver, GpuVariant, NumErrPolicy};
use crate::compare::{HistoryComparator, ReportFormat, DEFAULT_COLOR_THRESHOLD, DEFAULT_MAX_COMPS};
use crate::config::ExperimentConfig;
use crate::execution::{CommandExperiment, ExecutionController, Profiler};
use crate::logging::{LogSink, TraceTarget};
use crate::output::OutputTarget;
use crate::overrides::{apply_overrides, with_live, RunMode};
use crate::tracking::{encode_records, experiment_identity, HistoryStore, MetricsRecorder, RecordContext};
use crate::Result;

/// Run an experiment described by a YAML file.
#[derive(Parser, Debug, Clone)]
#[command(name = "trueno-run", version, about, long_about = None)]
pub struct RunArgs {
    /// Experiment description (YAML)
    pub config: PathBuf,

    /// GPU backend: cudanet or nervanagpu
    #[arg(long)]
    pub gpu: Option<GpuVariant>,

    /// Stochastic rounding (0 or 1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub rounding: Option<u8>,

    /// Run on specialized hardware
    #[arg(long)]
    pub nrv: bool,

    /// Use flexpoint numeric precision
    #[arg(long)]
    pub flexpoint: bool,

    /// Random number generator seed
    #[arg(long = "rng_seed")]
    pub rng_seed: Option<u64>,

    /// Device ids to bind (requires --gpu or --nrv)
    #[arg(long = "device_id", num_args = 1..)]
    pub device_id: Option<Vec<u32>>,

    /// Floating-point error handling, e.g. "{all: warn, divide: raise}"
    #[arg(long = "numerr_handling")]
    pub numerr_handling: Option<String>,

    /// Profile the run; report to PATH or stdout
    #[arg(long, num_args = 0..=1, default_missing_value = "-", value_name = "PATH")]
    pub profile: Option<OutputTarget>,

    /// Append run metrics to PATH or stdout
    #[arg(long, num_args = 0..=1, default_missing_value = "-", value_name = "PATH")]
    pub output: Option<OutputTarget>,

    /// Trace calls from source files matching FILTER into PATH
    #[arg(long, num_args = 2, value_names = ["FILTER", "PATH"])]
    pub trace: Option<Vec<String>>,

    /// Write a fault report to PATH (stderr without a path) if the run fails
    #[arg(long, num_args = 0..=1, default_missing_value = "-", value_name = "PATH")]
    pub debug: Option<OutputTarget>,

    /// Shrink the experiment for a quick integration run
    #[arg(long)]
    pub integration: bool,

    /// Request cloud execution (runs locally)
    #[arg(long)]
    pub cloud: bool,

    /// Mark the run as live
    #[arg(long)]
    pub live: bool,
}

impl RunArgs {
    /// Backend hints from the hardware flags.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] for a malformed
    /// `--numerr_handling` literal.
    pub fn hints(&self) -> Result<BackendHints> {
        let numerr = match &self.numerr_handling {
            Some(literal) => NumErrPolicy::parse(literal)?,
            None => NumErrPolicy::default(),
        };
        Ok(BackendHints {
            gpu: self.gpu,
            nrv: self.nrv,
            flexpoint: self.flexpoint,
            rounding: self.rounding,
            rng_seed: self.rng_seed,
            device_ids: self.device_id.clone(),
            numerr,
        })
    }

    /// Call-tracing target from `--trace FILTER PATH`.
    #[must_use]
    pub fn trace_target(&self) -> Option<TraceTarget> {
        match self.trace.as_deref() {
            Some([filter, path]) => Some(TraceTarget {
                filter: filter.clone(),
                path: PathBuf::from(path),
            }),
            _ => None,
        }
    }
}

/// Compare new run metrics against recorded history.
#[derive(Parser, Debug, Clone)]
#[command(name = "trueno-compare", version, about, long_about = None)]
pub struct CompareArgs {
    /// Store file with the runs to check
    pub new_metrics: PathBuf,

    /// Store file with the recorded history
    pub history: PathBuf,

    /// Compare against at most this many recent runs
    #[arg(long = "max_comps", default_value_t = DEFAULT_MAX_COMPS)]
    pub max_comps: usize,

    /// Only compare runs on the same backend
    #[arg(long = "match_backend")]
    pub match_backend: bool,

    /// Output field separator
    #[arg(long = "field_sep", default_value = "\t")]
    pub field_sep: String,

    /// Omit the header row
    #[arg(long = "no_header")]
    pub no_header: bool,

    /// Pad columns to a common width
    #[arg(long)]
    pub pad: bool,

    /// Relative change at which a row is colored
    #[arg(long = "color_threshold", default_value_t = DEFAULT_COLOR_THRESHOLD)]
    pub color_threshold: f64,

    /// Disable colored output
    #[arg(long = "no_color")]
    pub no_color: bool,
}

impl CompareArgs {
    /// Table layout from the formatting flags.
    #[must_use]
    pub fn report_format(&self) -> ReportFormat {
        ReportFormat {
            field_sep: self.field_sep.clone(),
            header: !self.no_header,
            pad: self.pad,
            color: !self.no_color,
        }
    }
}

/// Entry point of `trueno-run`.
///
/// # Errors
///
/// Returns the first configuration, experiment or recording error. When
/// recording fails, the record is printed to stdout first.
pub fn run_main(args: &RunArgs) -> anyhow::Result<()> {
    let console = LogSink::console_traced(args.trace_target())?;
    let console_scope = console.set_default();

    let config = ExperimentConfig::load(&args.config)?;
    let experiment = experiment_identity(&args.config);
    if args.cloud {
        warn!("Cloud execution is not available; running locally");
    }
    let hints = args.hints()?;

    let mode = RunMode::from_integration_flag(args.integration);
    let dataset = config.dataset_kind().cloned();
    let config = with_live(apply_overrides(config, mode, dataset.as_ref()), args.live);

    let profiler = args.profile.as_ref().map(|_| Profiler::new());
    let sink = console.handoff(config.logging.as_ref(), profiler.clone())?;
    drop(console_scope);
    let _sink_scope = sink.set_default();
    info!(experiment = %experiment, %mode, "Loaded experiment description");

    let backend = BackendResolver::resolve_for(&config, &hints)?;
    let mut command = CommandExperiment::from_config(&config)?;

    let mut controller = ExecutionController::new(&sink, experiment.clone());
    if let (Some(profiler), Some(target)) = (profiler, args.profile.clone()) {
        controller = controller.profiler(profiler, target);
    }
    if let Some(target) = args.debug.clone() {
        controller = controller.fault_sink(target);
    }
    let outcome = controller.run(&config, &backend, &mut command)?;

    let context = RecordContext {
        experiment,
        started_at: outcome.run.started_at().unwrap_or_else(Utc::now),
        elapsed_secs: outcome.run.elapsed_secs(),
        backend: backend.display_name().to_string(),
    };
    let record = MetricsRecorder::build(outcome.result, &config.metric_sets(), context);
    for (split, metric, value) in record.result().iter() {
        info!(%split, metric, value, "Run metric");
    }

    let Some(output) = &args.output else {
        return Ok(());
    };
    if let Err(e) = MetricsRecorder::new(output.clone()).append(&record) {
        error!(output = %output, error = %e, "Recording failed; printing the record instead");
        let row = encode_records([&record], true)?;
        io::stdout().lock().write_all(&row)?;
        return Err(e.into());
    }
    Ok(())
}

/// Entry point of `trueno-compare`.
///
/// A missing or empty new-metrics file produces no report and a warning.
///
/// # Errors
///
/// Returns an error when a store file is unreadable or malformed.
pub fn compare_main(args: &CompareArgs) -> anyhow::Result<()> {
    let console = LogSink::console();
    let _scope = console.set_default();

    let current = HistoryStore::new(&args.new_metrics).load()?;
    if current.is_empty() {
        warn!(
            file = %args.new_metrics.display(),
            "No runs to compare; new metrics file is missing or empty"
        );
        return Ok(());
    }
    let history = HistoryStore::new(&args.history).load()?;

    let comparator = HistoryComparator::new(args.max_comps, args.match_backend)
        .color_threshold(args.color_threshold);
    let mut format = args.report_format();
    let mut stdout = io::stdout().lock();
    for record in &current {
        let report = comparator.compare(&history, record);
        stdout.write_all(format.render(&report).as_bytes())?;
        format.header = false;
    }
    stdout.flush()?;
    Ok(())
}
