//! Experiment backed by an external training program
//!
//! The program receives the execution plan as JSON on stdin:
//!
//! ```json
//! {"backend": {"type": "nervanagpu", "rng_seed": 0, ...}, "config": {...}}
//! ```
//!
//! and reports its result as a JSON document on stdout:
//!
//! ```json
//! {"train": {"MisclassPercentage": 4.2}, "test": {"MisclassPercentage": 5.0, "AUC": null}}
//! ```
//!
//! Empty stdout means the run produced no result. The program's stderr is
//! passed through.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use serde::Serialize;
use tracing::{debug, instrument};

use super::Experiment;
use crate::backend::BackendHandle;
use crate::config::{ExperimentConfig, ExperimentSpec};
use crate::error::BoxError;
use crate::tracking::RunResult;
use crate::{Error, Result};

#[derive(Serialize)]
struct ExecutionPlan<'a> {
    backend: &'a BackendHandle,
    config: &'a ExperimentConfig,
}

/// Runs the program declared in the description's `experiment` block.
#[derive(Debug, Clone)]
pub struct CommandExperiment {
    spec: ExperimentSpec,
    plan: Option<Vec<u8>>,
}

impl CommandExperiment {
    /// Experiment for the given launch spec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the command is empty.
    pub fn new(spec: ExperimentSpec) -> Result<Self> {
        if spec.command.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(Error::Configuration(
                "experiment.command must name a program".to_string(),
            ));
        }
        Ok(Self { spec, plan: None })
    }

    /// Experiment declared by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the description has no
    /// `experiment` block or its command is empty.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        let spec = config.experiment.clone().ok_or_else(|| {
            Error::Configuration(
                "experiment description has no 'experiment' block naming a command".to_string(),
            )
        })?;
        Self::new(spec)
    }
}

impl Experiment for CommandExperiment {
    fn initialize(
        &mut self,
        backend: &BackendHandle,
        config: &ExperimentConfig,
    ) -> std::result::Result<(), BoxError> {
        let plan = serde_json::to_vec(&ExecutionPlan { backend, config })?;
        debug!(bytes = plan.len(), "Prepared execution plan");
        self.plan = Some(plan);
        Ok(())
    }

    #[instrument(name = "command", skip_all)]
    fn run(&mut self) -> std::result::Result<Option<RunResult>, BoxError> {
        let plan = self
            .plan
            .take()
            .ok_or("experiment run before initialize")?;

        let (program, args) = self
            .spec
            .command
            .split_first()
            .ok_or("experiment command is empty")?;
        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&self.spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.spec.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| format!("failed to start '{program}': {e}"))?;
        let mut stdin = child.stdin.take().ok_or("child stdin unavailable")?;
        let feeder = thread::spawn(move || stdin.write_all(&plan));

        let output = child.wait_with_output()?;
        match feeder.join() {
            Ok(Ok(())) => {}
            // Programs that never read their plan close stdin early.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err("plan writer thread panicked".into()),
        }

        if !output.status.success() {
            return Err(format!("'{program}' exited with {}", output.status).into());
        }

        let stdout = String::from_utf8(output.stdout)?;
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(None);
        }
        let result: RunResult = serde_json::from_str(stdout)
            .map_err(|e| format!("'{program}' printed an invalid result: {e}"))?;
        Ok(Some(result))
    }
}
