//! Execution Controller
//!
//! Binds a resolved backend to a finalized configuration, drives the
//! experiment lifecycle, and captures timing and instrumentation around it.
//!
//! ```text
//! sink dispatcher (logging + call tracing + profiler layers)
//!   └─ profiler on → RunRecord::start
//!        ├─ span "initialize": Experiment::initialize(backend, config)
//!        └─ span "run":        Experiment::run() -> Option<RunResult>
//!      profiler off → report → RunRecord::complete
//! ```
//!
//! A failing stage is returned as [`Error::Experiment`]. With a fault sink
//! configured, a [`FaultReport`] is written first.

mod command;
mod fault;
mod profiler;

pub use command::CommandExperiment;
pub use fault::FaultReport;
pub use profiler::{ProfileLayer, ProfileReport, Profiler, SpanTiming};

use tracing::{error, info, info_span, warn};

use crate::backend::BackendHandle;
use crate::config::ExperimentConfig;
use crate::error::{BoxError, RunStage};
use crate::logging::LogSink;
use crate::output::OutputTarget;
use crate::tracking::{RunRecord, RunResult, RunStatus};
use crate::{Error, Result};

/// Capability interface of an experiment.
///
/// The training loop, model graph and numeric kernels live behind this
/// trait; the runner only sequences the calls.
pub trait Experiment {
    /// Bind the experiment to `backend` and its finalized configuration.
    ///
    /// # Errors
    ///
    /// Any error aborts the run before [`Experiment::run`] is called.
    fn initialize(
        &mut self,
        backend: &BackendHandle,
        config: &ExperimentConfig,
    ) -> std::result::Result<(), BoxError>;

    /// Execute the experiment. `None` means the run produced no metrics.
    ///
    /// # Errors
    ///
    /// Any error fails the run.
    fn run(&mut self) -> std::result::Result<Option<RunResult>, BoxError>;
}

/// Completed run: lifecycle record plus the raw result.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Timing and status
    pub run: RunRecord,
    /// Metrics reported by the experiment
    pub result: Option<RunResult>,
}

/// Runs one experiment under a logging sink with optional instrumentation.
pub struct ExecutionController<'a> {
    sink: &'a LogSink,
    experiment: String,
    profiler: Option<(Profiler, OutputTarget)>,
    fault_sink: Option<OutputTarget>,
}

impl<'a> ExecutionController<'a> {
    /// Controller for experiment identity `experiment` logging to `sink`.
    #[must_use]
    pub fn new(sink: &'a LogSink, experiment: impl Into<String>) -> Self {
        Self {
            sink,
            experiment: experiment.into(),
            profiler: None,
            fault_sink: None,
        }
    }

    /// Profile the run and write the report to `target`.
    ///
    /// `profiler` must be the one attached to the sink, otherwise the
    /// report stays empty.
    #[must_use]
    pub fn profiler(mut self, profiler: Profiler, target: OutputTarget) -> Self {
        self.profiler = Some((profiler, target));
        self
    }

    /// Write a [`FaultReport`] to `target` when the experiment fails.
    #[must_use]
    pub fn fault_sink(mut self, target: OutputTarget) -> Self {
        self.fault_sink = Some(target);
        self
    }

    /// Initialize and run `experiment` on `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Experiment`] with the failing stage when
    /// initialization or the run fails.
    pub fn run(
        &self,
        config: &ExperimentConfig,
        backend: &BackendHandle,
        experiment: &mut dyn Experiment,
    ) -> Result<RunOutcome> {
        tracing::dispatcher::with_default(self.sink.dispatch(), || {
            self.run_instrumented(config, backend, experiment)
        })
    }

    fn run_instrumented(
        &self,
        config: &ExperimentConfig,
        backend: &BackendHandle,
        experiment: &mut dyn Experiment,
    ) -> Result<RunOutcome> {
        let mut run = RunRecord::new(&self.experiment, backend.display_name());
        if let Some((profiler, _)) = &self.profiler {
            profiler.enable();
        }
        run.start();
        info!(
            experiment = %self.experiment,
            backend = %backend.kind,
            live = config.live.unwrap_or(false),
            "Starting experiment"
        );

        let outcome = execute(config, backend, experiment);

        if let Some((profiler, target)) = &self.profiler {
            profiler.disable();
            let report = profiler.report().to_string();
            if let Err(e) = target.append_with(|_| report.into_bytes()) {
                warn!(output = %target, error = %e, "Failed to write profile report");
            }
        }

        match outcome {
            Ok(result) => {
                run.complete(RunStatus::Success);
                info!(
                    experiment = %self.experiment,
                    elapsed_secs = run.elapsed_secs(),
                    has_result = result.is_some(),
                    "Experiment finished"
                );
                Ok(RunOutcome { run, result })
            }
            Err((stage, source)) => {
                run.complete(RunStatus::Failed);
                error!(
                    experiment = %self.experiment,
                    %stage,
                    error = %source,
                    elapsed_secs = run.elapsed_secs(),
                    "Experiment failed"
                );
                if let Some(target) = &self.fault_sink {
                    let report = FaultReport::capture(stage, source.as_ref(), &run);
                    if let Err(e) = report.write_to(target) {
                        warn!(output = %target, error = %e, "Failed to write fault report");
                    }
                }
                Err(Error::experiment(stage, source))
            }
        }
    }
}

fn execute(
    config: &ExperimentConfig,
    backend: &BackendHandle,
    experiment: &mut dyn Experiment,
) -> std::result::Result<Option<RunResult>, (RunStage, BoxError)> {
    info_span!("initialize")
        .in_scope(|| experiment.initialize(backend, config))
        .map_err(|e| (RunStage::Initialize, e))?;
    info_span!("run")
        .in_scope(|| experiment.run())
        .map_err(|e| (RunStage::Run, e))
}
