// gkeg-common/src/lib.rs
pub mod config;
pub mod dependency;
pub mod error;
pub mod formulary;
pub mod model;
pub mod platform;

pub use config::Config;
pub use error::{GkegError, Result};
pub use model::formula::Formula;
pub use platform::HostPlatform;
