// gkeg-common/src/model/formula.rs
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::artifact::InstallLayout;
use super::resource::{PatchSpec, ResourceSpec};
use crate::dependency::{Dependency, ExternalRequirement};

/// A fixed environment export applied to every build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvSetting {
    pub key: String,
    pub value: String,
}

impl EnvSetting {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Extract a fetched resource into a directory relative to the keg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStage {
    pub resource: String,
    pub keg_subdir: PathBuf,
}

/// Where the source tree comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceOrigin {
    /// A release archive, integrity-checked before extraction.
    Archive { url: String, sha256: String },
    /// A version-control checkout of the development branch.
    Head { repository: String },
    /// An existing tree on disk; `head` records whether it is a checkout.
    Local { path: PathBuf, head: bool },
}

impl SourceOrigin {
    /// Uses `path` in place. A `.git` entry marks it as a version-control checkout.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let head = path.join(".git").exists();
        Self::Local { path, head }
    }

    pub fn is_head(&self) -> bool {
        match self {
            Self::Archive { .. } => false,
            Self::Head { .. } => true,
            Self::Local { head, .. } => *head,
        }
    }
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive { url, .. } => write!(f, "archive {url}"),
            Self::Head { repository } => write!(f, "HEAD of {repository}"),
            Self::Local { path, head } => write!(
                f,
                "local {} {}",
                if *head { "checkout" } else { "tree" },
                path.display()
            ),
        }
    }
}

/// The autotools build recipe: what the pipeline runs, not how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecipe {
    pub bootstrap: Vec<String>,
    /// Arguments passed to `./configure` after `--prefix=<keg>` is slotted in.
    pub configure_args: Vec<String>,
    pub deparallelize: bool,
    pub install_args: Vec<String>,
    pub env: Vec<EnvSetting>,
    /// Dependencies whose `lib/pkgconfig` is prepended to `PKG_CONFIG_PATH`, in order.
    pub pkg_config_deps: Vec<String>,
    /// Package-management tools the configure script must not detect.
    pub disabled_package_tools: Vec<String>,
    pub staged_resources: Vec<ResourceStage>,
    pub layout: InstallLayout,
    pub test_target: Option<String>,
    /// Variables for using the installed keg; values are relative to the keg.
    pub runtime_env: Vec<EnvSetting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    pub desc: String,
    pub homepage: String,
    pub version: String,
    pub url: String,
    pub sha256: String,
    pub head: Option<String>,
    pub dependencies: Vec<Dependency>,
    pub requirements: Vec<ExternalRequirement>,
    pub resources: Vec<ResourceSpec>,
    pub patches: Vec<PatchSpec>,
    pub recipe: BuildRecipe,
    /// Post-install guidance; `{prefix}` expands to the keg path.
    pub caveats: Option<String>,
}

impl Formula {
    pub fn stable_origin(&self) -> SourceOrigin {
        SourceOrigin::Archive {
            url: self.url.clone(),
            sha256: self.sha256.clone(),
        }
    }

    pub fn head_origin(&self) -> Option<SourceOrigin> {
        self.head.as_ref().map(|repository| SourceOrigin::Head {
            repository: repository.clone(),
        })
    }

    /// Version string for the keg directory; head builds get their own keg.
    pub fn keg_version(&self, origin: &SourceOrigin) -> String {
        if origin.is_head() {
            "HEAD".to_string()
        } else {
            self.version.clone()
        }
    }

    pub fn render_caveats(&self, keg: &Path) -> Option<String> {
        self.caveats
            .as_ref()
            .map(|text| text.replace("{prefix}", &keg.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_origin_detects_checkout_marker() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!SourceOrigin::local(dir.path()).is_head());
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(SourceOrigin::local(dir.path()).is_head());
    }

    #[test]
    fn head_builds_use_head_keg() {
        let formula = crate::formulary::libguestfs(Path::new("/usr/local"));
        assert_eq!(formula.keg_version(&formula.stable_origin()), "1.49.5");
        let head = formula.head_origin().unwrap();
        assert_eq!(formula.keg_version(&head), "HEAD");
    }
}
