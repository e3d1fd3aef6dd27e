// gkeg-common/src/dependency/requirement.rs
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::definition::PlatformScope;

/// A dependency the package manager cannot install itself.
///
/// Satisfaction is a narrow filesystem check: `header` must exist as a regular
/// file and neither it nor `alias_guard` may be a symbolic link. The search
/// paths are appended to the build environment when the requirement holds and
/// the package-manager prefix is not `conventional_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalRequirement {
    pub name: String,
    pub header: PathBuf,
    pub alias_guard: PathBuf,
    pub library_dir: PathBuf,
    pub include_dir: PathBuf,
    pub conventional_prefix: PathBuf,
    pub message: String,
    #[serde(default)]
    pub scope: PlatformScope,
}

impl fmt::Display for ExternalRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (expects {})", self.name, self.header.display())
    }
}
