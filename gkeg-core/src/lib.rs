// gkeg-core/src/lib.rs
pub mod build;
pub mod check;
pub mod install;
pub mod requirement;

pub use build::{BuildEnvironment, CommandRunner, SystemRunner};
pub use install::{caveats, InstallOptions, InstallOutcome, Installer};
pub use requirement::RequirementCheck;
