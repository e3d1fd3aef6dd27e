// gkeg-common/src/model/artifact.rs
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The logical kind of file the copy-out step moves from the staged root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactClass {
    /// Every entry under `bin/`.
    Binaries,
    /// One named header under `include/`.
    Header { name: String },
    /// Every entry under `lib/`.
    Libraries,
    /// Every entry under `share/man/man<section>/`.
    ManPages { section: u8 },
}

impl ArtifactClass {
    /// Location of this class relative to an install prefix.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Self::Binaries => PathBuf::from("bin"),
            Self::Header { name } => Path::new("include").join(name),
            Self::Libraries => PathBuf::from("lib"),
            Self::ManPages { section } => Path::new("share")
                .join("man")
                .join(format!("man{section}")),
        }
    }

    /// True when the class names a single file rather than a directory's contents.
    pub fn is_single_file(&self) -> bool {
        matches!(self, Self::Header { .. })
    }
}

impl fmt::Display for ArtifactClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binaries => f.write_str("binaries"),
            Self::Header { name } => write!(f, "header {name}"),
            Self::Libraries => f.write_str("libraries"),
            Self::ManPages { section } => write!(f, "man{section} pages"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub class: ArtifactClass,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Selective mapping from a staged install root to the final keg.
///
/// Anything the staged root contains outside these classes is left behind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstallLayout {
    pub classes: Vec<ArtifactClass>,
}

impl InstallLayout {
    pub fn new(classes: Vec<ArtifactClass>) -> Self {
        Self { classes }
    }

    /// Resolves every class against `staged_prefix` (source) and `keg` (destination).
    pub fn entries(&self, staged_prefix: &Path, keg: &Path) -> Vec<LayoutEntry> {
        self.classes
            .iter()
            .map(|class| {
                let rel = class.relative_path();
                LayoutEntry {
                    class: class.clone(),
                    source: staged_prefix.join(&rel),
                    destination: keg.join(&rel),
                }
            })
            .collect()
    }
}
