// gkeg-core/src/build/mod.rs
pub mod env;
pub mod layout;
pub mod patch;
pub mod pipeline;
pub mod steps;

pub use env::BuildEnvironment;
pub use pipeline::{
    execute, CommandOutcome, CommandRunner, ExecutionReport, Executor, PipelineState,
    SystemRunner,
};
pub use steps::{plan_steps, BuildStep, StepAction, StepContext, StepKind};
