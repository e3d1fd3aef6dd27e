use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GkegError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("DownloadError: Failed to download '{0}' from '{1}': {2}")]
    DownloadError(String, String, String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Generic Error: {0}")]
    Generic(String),

    #[error("HttpError: {0}")]
    HttpError(String),

    #[error("Checksum Mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Dependency Error: {0}")]
    DependencyError(String),

    #[error("Unsatisfied requirement '{name}': {message}")]
    UnsatisfiedRequirement { name: String, message: String },

    #[error("Patch '{0}' failed to apply: {1}")]
    PatchFailed(String, String),

    #[error("Build step {index} ({step}) failed with {}:\n{output}", describe_exit(.code))]
    BuildStepFailed {
        index: usize,
        step: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Partial install: copied {copied} artifact(s) before failing: {reason}")]
    PartialInstall { copied: usize, reason: String },

    #[error("Build environment setup failed: {0}")]
    BuildEnvError(String),

    #[error("IoError: {0}")]
    IoError(String),

    #[error("Failed to execute command: {0}")]
    CommandExecError(String),

    #[error("Installation Error: {0}")]
    InstallError(String),
}

impl From<std::io::Error> for GkegError {
    fn from(err: std::io::Error) -> Self {
        GkegError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for GkegError {
    fn from(err: reqwest::Error) -> Self {
        GkegError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for GkegError {
    fn from(err: serde_json::Error) -> Self {
        GkegError::Json(Arc::new(err))
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, GkegError>;
