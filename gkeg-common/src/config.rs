// gkeg-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tracing::debug;

use super::error::Result;

// Fallbacks used when HOMEBREW_PREFIX is not set or is empty.
const DEFAULT_MACOS_ROOT: &str = "/opt/homebrew";
const DEFAULT_LINUX_ROOT: &str = "/home/linuxbrew/.linuxbrew";
/// Where macFUSE installs itself; also the conventional Homebrew prefix on Intel Macs.
pub const CONVENTIONAL_PREFIX: &str = "/usr/local";

#[derive(Debug, Clone)]
pub struct Config {
    pub gkeg_root: PathBuf,
    /// Root of the out-of-band macFUSE installation (`<root>/include/fuse`, `<root>/lib`).
    pub fuse_root: PathBuf,
    pub cache_override: Option<PathBuf>,
    pub temp_override: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading gkeg configuration");

        let root_str = env::var("HOMEBREW_PREFIX")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                let fallback = default_root();
                debug!(
                    "HOMEBREW_PREFIX environment variable not set or empty, falling back to default: {}",
                    fallback
                );
                fallback.to_string()
            });
        let gkeg_root = PathBuf::from(&root_str);
        debug!("Effective prefix set to: {}", gkeg_root.display());

        let fuse_root = env::var("GKEG_FUSE_ROOT")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONVENTIONAL_PREFIX));

        let cache_override = non_empty_path_var("HOMEBREW_CACHE");
        let temp_override = non_empty_path_var("HOMEBREW_TEMP");

        debug!("Configuration loaded successfully.");
        Ok(Self {
            gkeg_root,
            fuse_root,
            cache_override,
            temp_override,
        })
    }

    /// Builds a configuration rooted at an explicit prefix, ignoring the environment.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            gkeg_root: root.into(),
            fuse_root: PathBuf::from(CONVENTIONAL_PREFIX),
            cache_override: None,
            temp_override: None,
        }
    }

    pub fn gkeg_root(&self) -> &Path {
        &self.gkeg_root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.gkeg_root.join("bin")
    }

    pub fn cellar_dir(&self) -> PathBuf {
        self.gkeg_root.join("Cellar")
    }

    pub fn opt_dir(&self) -> PathBuf {
        self.gkeg_root.join("opt")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_override
            .clone()
            .unwrap_or_else(|| self.gkeg_root.join("gkeg_cache"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.gkeg_root.join("gkeg_logs")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.temp_override
            .clone()
            .unwrap_or_else(|| self.gkeg_root.join("tmp"))
    }

    pub fn formula_cellar_dir(&self, formula_name: &str) -> PathBuf {
        self.cellar_dir().join(formula_name)
    }

    pub fn formula_keg_path(&self, formula_name: &str, version_str: &str) -> PathBuf {
        self.formula_cellar_dir(formula_name).join(version_str)
    }

    pub fn formula_opt_path(&self, formula_name: &str) -> PathBuf {
        self.opt_dir().join(formula_name)
    }

    pub fn home_dir(&self) -> PathBuf {
        UserDirs::new().map_or_else(|| PathBuf::from("/"), |ud| ud.home_dir().to_path_buf())
    }
}

fn default_root() -> &'static str {
    if cfg!(target_os = "macos") {
        DEFAULT_MACOS_ROOT
    } else {
        DEFAULT_LINUX_ROOT
    }
}

fn non_empty_path_var(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}
