//! Host platform detection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GkegError;

/// The operating system a formula is being planned or built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    MacOs,
    Linux,
    Other,
}

impl HostPlatform {
    #[cfg(target_os = "macos")]
    pub const fn current() -> Self {
        HostPlatform::MacOs
    }

    #[cfg(target_os = "linux")]
    pub const fn current() -> Self {
        HostPlatform::Linux
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    pub const fn current() -> Self {
        HostPlatform::Other
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            HostPlatform::MacOs => "macos",
            HostPlatform::Linux => "linux",
            HostPlatform::Other => "other",
        }
    }

    pub fn is_macos(&self) -> bool {
        *self == HostPlatform::MacOs
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostPlatform {
    type Err = GkegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "macos" | "darwin" | "osx" => Ok(HostPlatform::MacOs),
            "linux" => Ok(HostPlatform::Linux),
            "other" => Ok(HostPlatform::Other),
            other => Err(GkegError::ValidationError(format!(
                "Unknown platform '{other}' (expected macos, linux or other)"
            ))),
        }
    }
}
