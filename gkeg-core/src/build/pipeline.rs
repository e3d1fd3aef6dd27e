// gkeg-core/src/build/pipeline.rs
//! Strictly ordered execution of planned build steps.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use gkeg_aio::process::{combined_output, run_command};
use gkeg_common::error::{GkegError, Result};
use serde::Serialize;
use tracing::{debug, error, info};

use super::env::BuildEnvironment;
use super::layout::{copy_out, stage_archive};
use super::steps::{BuildStep, StepAction, StepKind};

const OUTPUT_TAIL_LINES: usize = 50;

/// What a finished external command left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub code: Option<i32>,
    pub success: bool,
    /// Tail of stdout followed by stderr.
    pub output: String,
}

impl CommandOutcome {
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            success: true,
            output: String::new(),
        }
    }

    pub fn failed(code: i32, output: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            output: output.into(),
        }
    }
}

/// Seam between the pipeline and process execution.
pub trait CommandRunner {
    /// Runs `program` to completion. `env`, when given, is the complete
    /// environment of the child. Only a failure to start is an `Err`.
    fn run(
        &mut self,
        program: &str,
        args: &[String],
        cwd: &Path,
        env: Option<&BTreeMap<String, String>>,
    ) -> Result<CommandOutcome>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &mut self,
        program: &str,
        args: &[String],
        cwd: &Path,
        env: Option<&BTreeMap<String, String>>,
    ) -> Result<CommandOutcome> {
        let output = run_command(program, args, Some(cwd), env)?;
        Ok(CommandOutcome {
            code: output.status.code(),
            success: output.status.success(),
            output: combined_output(&output, OUTPUT_TAIL_LINES),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    EnvPrepared,
    Bootstrapped,
    Configured,
    Built,
    ResourceStaged,
    Installed,
    Done,
    Failed { step: StepKind },
}

impl PipelineState {
    /// The state after `kind` succeeds, or `None` if `kind` may not run now.
    fn advance(self, kind: StepKind, previous: Option<StepKind>) -> Option<Self> {
        use PipelineState::*;
        match (self, kind) {
            (Init, StepKind::PrepareEnv) => Some(EnvPrepared),
            (EnvPrepared, StepKind::SubmoduleInit) if previous == Some(StepKind::PrepareEnv) => {
                Some(EnvPrepared)
            }
            (EnvPrepared, StepKind::Bootstrap) => Some(Bootstrapped),
            (Bootstrapped, StepKind::Configure) => Some(Configured),
            (Configured, StepKind::Build) => Some(Built),
            (Built | ResourceStaged, StepKind::StageResource) => Some(ResourceStaged),
            (ResourceStaged, StepKind::Install) => Some(Installed),
            (Installed, StepKind::CopyOut) => Some(Done),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { step } => write!(f, "Failed({step})"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub completed: Vec<StepKind>,
    pub state: PipelineState,
    /// Files moved into the keg by copy-out.
    pub copied: usize,
}

/// Walks a step list through the pipeline state machine.
pub struct Executor<'a, R: CommandRunner> {
    env: &'a BuildEnvironment,
    runner: &'a mut R,
    state: PipelineState,
    previous: Option<StepKind>,
    completed: Vec<StepKind>,
    copied: usize,
}

impl<'a, R: CommandRunner> Executor<'a, R> {
    pub fn new(env: &'a BuildEnvironment, runner: &'a mut R) -> Self {
        Self {
            env,
            runner,
            state: PipelineState::Init,
            previous: None,
            completed: Vec::new(),
            copied: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs every step in order. Stops at the first failure, which is terminal.
    pub fn run(mut self, steps: &[BuildStep]) -> Result<ExecutionReport> {
        for (index, step) in steps.iter().enumerate() {
            self.run_step(index, step)?;
        }
        if self.state != PipelineState::Done {
            return Err(GkegError::ValidationError(format!(
                "Build steps ended in state {} instead of Done",
                self.state
            )));
        }
        Ok(ExecutionReport {
            completed: self.completed,
            state: self.state,
            copied: self.copied,
        })
    }

    fn run_step(&mut self, index: usize, step: &BuildStep) -> Result<()> {
        if let PipelineState::Failed { step: failed } = self.state {
            return Err(GkegError::ValidationError(format!(
                "Pipeline already failed at {failed}; refusing to run step {index} ({})",
                step.kind
            )));
        }
        let next = self.state.advance(step.kind, self.previous).ok_or_else(|| {
            error!(
                "Rejecting step {} ({}) in state {}",
                index, step.kind, self.state
            );
            GkegError::ValidationError(format!(
                "Step {index} ({}) cannot run in state {}",
                step.kind, self.state
            ))
        })?;

        info!("==> {}", step);
        if let Err(e) = self.perform(index, step) {
            self.state = PipelineState::Failed { step: step.kind };
            error!("Step {} ({}) failed: {}", index, step.kind, e);
            return Err(e);
        }
        debug!("State {} -> {}", self.state, next);
        self.state = next;
        self.previous = Some(step.kind);
        self.completed.push(step.kind);
        Ok(())
    }

    fn perform(&mut self, index: usize, step: &BuildStep) -> Result<()> {
        match &step.action {
            StepAction::PrepareEnv => match self.env.path_string() {
                Some(path) if !path.is_empty() => Ok(()),
                _ => Err(GkegError::BuildEnvError(
                    "Build environment has no PATH".to_string(),
                )),
            },
            StepAction::Command { program, args, env } => {
                let vars = self.env.with_overrides(env);
                let outcome = self.runner.run(program, args, &step.cwd, Some(&vars))?;
                if outcome.success {
                    return Ok(());
                }
                let mut output = outcome.output;
                if step.kind == StepKind::Configure {
                    if let Some(tail) = config_log_tail(&step.cwd) {
                        output.push_str("\n--- Last lines of config.log ---\n");
                        output.push_str(&tail);
                    }
                }
                Err(GkegError::BuildStepFailed {
                    index,
                    step: format!("{} `{}`", step.kind, program),
                    code: outcome.code,
                    output,
                })
            }
            StepAction::StageResource {
                archive,
                destination,
                ..
            } => stage_archive(archive, destination),
            StepAction::CopyOut {
                layout,
                staged_prefix,
                keg,
            } => {
                self.copied = copy_out(layout, staged_prefix, keg)?;
                Ok(())
            }
        }
    }
}

/// Runs `steps` with `env`, returning the report of a pipeline that reached `Done`.
pub fn execute<R: CommandRunner>(
    steps: &[BuildStep],
    env: &BuildEnvironment,
    runner: &mut R,
) -> Result<ExecutionReport> {
    Executor::new(env, runner).run(steps)
}

fn config_log_tail(cwd: &Path) -> Option<String> {
    let content = fs::read_to_string(cwd.join("config.log")).ok()?;
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    Some(lines[start..].join("\n"))
}
