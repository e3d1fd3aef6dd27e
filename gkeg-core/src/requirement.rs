// gkeg-core/src/requirement.rs
//! Filesystem checks for requirements the package manager cannot install.

use std::path::{Path, PathBuf};

use gkeg_aio::fs::{is_regular_file_no_follow, is_symlink};
use gkeg_common::dependency::{DependencyPlan, ExternalRequirement};
use gkeg_common::error::{GkegError, Result};
use gkeg_common::platform::HostPlatform;
use tracing::{debug, error};

/// A search-path entry appended to a path-list variable of the build environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvAddition {
    pub key: &'static str,
    pub path: PathBuf,
}

pub const LIBRARY_PATHS_VAR: &str = "HOMEBREW_LIBRARY_PATHS";
pub const INCLUDE_PATHS_VAR: &str = "HOMEBREW_INCLUDE_PATHS";

pub trait RequirementCheck {
    /// True iff the header is a regular file and neither the header nor the
    /// guarded include directory is a symbolic link.
    fn satisfied(&self) -> bool;

    /// Like `satisfied`, but reports the remediation message on failure.
    fn check(&self) -> Result<()>;

    /// Search paths the build needs when the requirement lives outside the
    /// package-manager prefix. Empty unless on macOS with a non-default prefix.
    fn env_additions(&self, platform: HostPlatform, prefix: &Path) -> Vec<EnvAddition>;
}

impl RequirementCheck for ExternalRequirement {
    fn satisfied(&self) -> bool {
        let header_ok = is_regular_file_no_follow(&self.header);
        let guard_aliased = is_symlink(&self.alias_guard);
        debug!(
            "Requirement '{}': header {} regular={}, guard {} symlink={}",
            self.name,
            self.header.display(),
            header_ok,
            self.alias_guard.display(),
            guard_aliased
        );
        header_ok && !guard_aliased
    }

    fn check(&self) -> Result<()> {
        if self.satisfied() {
            Ok(())
        } else {
            error!("Requirement '{}' is not satisfied", self.name);
            Err(GkegError::UnsatisfiedRequirement {
                name: self.name.clone(),
                message: self.message.clone(),
            })
        }
    }

    fn env_additions(&self, platform: HostPlatform, prefix: &Path) -> Vec<EnvAddition> {
        if !platform.is_macos() || prefix == self.conventional_prefix {
            return Vec::new();
        }
        vec![
            EnvAddition {
                key: LIBRARY_PATHS_VAR,
                path: self.library_dir.clone(),
            },
            EnvAddition {
                key: INCLUDE_PATHS_VAR,
                path: self.include_dir.clone(),
            },
        ]
    }
}

/// Checks every requirement of `plan`, stopping at the first unsatisfied one.
pub fn check_all(plan: &DependencyPlan) -> Result<()> {
    plan.requirements.iter().try_for_each(|req| req.check())
}

/// Collects the environment additions of every requirement of `plan`.
pub fn env_additions_for(plan: &DependencyPlan, prefix: &Path) -> Vec<EnvAddition> {
    plan.requirements
        .iter()
        .flat_map(|req| req.env_additions(plan.platform, prefix))
        .collect()
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::symlink;

    use gkeg_common::formulary::macfuse_requirement;

    use super::*;

    fn install_header(root: &Path) {
        let include = root.join("include/fuse");
        fs::create_dir_all(&include).unwrap();
        fs::write(include.join("fuse.h"), "/* fuse */").unwrap();
    }

    #[test]
    fn absent_header_is_unsatisfied_with_verbatim_message() {
        let dir = tempfile::tempdir().unwrap();
        let req = macfuse_requirement(dir.path());
        assert!(!req.satisfied());
        match req.check().unwrap_err() {
            GkegError::UnsatisfiedRequirement { name, message } => {
                assert_eq!(name, "macfuse");
                assert_eq!(
                    message,
                    "macFUSE is required to build libguestfs. Please run `brew install --cask macfuse` first."
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn real_header_satisfies() {
        let dir = tempfile::tempdir().unwrap();
        install_header(dir.path());
        let req = macfuse_requirement(dir.path());
        assert!(req.satisfied());
        req.check().unwrap();
    }

    #[test]
    fn symlinked_include_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        install_header(&real);
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("include")).unwrap();
        symlink(real.join("include/fuse"), root.join("include/fuse")).unwrap();

        let req = macfuse_requirement(&root);
        assert!(req.header.exists());
        assert!(!req.satisfied());
    }

    #[test]
    fn symlinked_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let include = dir.path().join("include/fuse");
        fs::create_dir_all(&include).unwrap();
        fs::write(dir.path().join("fuse.h.real"), "/* fuse */").unwrap();
        symlink(dir.path().join("fuse.h.real"), include.join("fuse.h")).unwrap();

        assert!(!macfuse_requirement(dir.path()).satisfied());
    }

    #[test]
    fn header_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("include/fuse/fuse.h")).unwrap();
        assert!(!macfuse_requirement(dir.path()).satisfied());
    }

    #[test]
    fn env_additions_only_for_non_default_macos_prefix() {
        let req = macfuse_requirement(Path::new("/usr/local"));
        let additions = req.env_additions(HostPlatform::MacOs, Path::new("/opt/homebrew"));
        assert_eq!(
            additions,
            vec![
                EnvAddition {
                    key: LIBRARY_PATHS_VAR,
                    path: PathBuf::from("/usr/local/lib"),
                },
                EnvAddition {
                    key: INCLUDE_PATHS_VAR,
                    path: PathBuf::from("/usr/local/include/fuse"),
                },
            ]
        );
        assert!(req
            .env_additions(HostPlatform::MacOs, Path::new("/usr/local"))
            .is_empty());
        assert!(req
            .env_additions(HostPlatform::Linux, Path::new("/opt/homebrew"))
            .is_empty());
    }
}
