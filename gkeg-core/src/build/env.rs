// gkeg-core/src/build/env.rs
//! The environment record every build command runs with.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use gkeg_common::config::Config;
use gkeg_common::dependency::{DependencyPlan, Provision};
use gkeg_common::error::{GkegError, Result};
use gkeg_common::model::Formula;
use tracing::{debug, trace};

use crate::requirement::EnvAddition;

// Passed through from the invoking environment; everything else is dropped.
const ENV_VARS_TO_KEEP: &[&str] = &[
    "USER", "LOGNAME", "HOME", "TMPDIR", "TERM", "SHELL", "LANG", "TZ",
];

const SYSTEM_PATH_DIRS: &[&str] = &["/usr/bin", "/bin", "/usr/sbin", "/sbin"];

/// An immutable, fully assembled set of variables for build commands.
///
/// Commands get exactly this map, never the invoking process's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    vars: BTreeMap<String, String>,
}

impl BuildEnvironment {
    /// Assembles the environment for building `formula` against `plan`.
    ///
    /// Sets the recipe's fixed exports, the `PKG_CONFIG_PATH` prepends in
    /// declaration order, `HAVE_<TOOL>_FALSE=#` for every disabled package
    /// tool, the requirement search paths and a `PATH` led by the `bin`
    /// directories of managed dependencies.
    pub fn assemble(
        formula: &Formula,
        plan: &DependencyPlan,
        config: &Config,
        additions: &[EnvAddition],
    ) -> Result<Self> {
        debug!("Assembling build environment for '{}'", formula.name);
        let mut vars = BTreeMap::new();

        for key in ENV_VARS_TO_KEEP {
            if let Ok(value) = env::var(key) {
                trace!("Keeping env var: {}", key);
                vars.insert((*key).to_string(), value);
            }
        }
        if !vars.contains_key("HOME") {
            vars.insert("HOME".to_string(), config.home_dir().display().to_string());
        }
        vars.insert(
            "HOMEBREW_PREFIX".to_string(),
            config.gkeg_root().display().to_string(),
        );

        for setting in &formula.recipe.env {
            debug!("Setting {}={}", setting.key, setting.value);
            vars.insert(setting.key.clone(), setting.value.clone());
        }

        // Each entry is prepended, so the last declared dependency ends up first.
        let mut pkg_config_dirs: Vec<PathBuf> = Vec::new();
        for dep in &formula.recipe.pkg_config_deps {
            pkg_config_dirs.insert(0, config.formula_opt_path(dep).join("lib").join("pkgconfig"));
        }
        set_path_list_var(&mut vars, "PKG_CONFIG_PATH", &pkg_config_dirs)?;

        for tool in &formula.recipe.disabled_package_tools {
            vars.insert(format!("HAVE_{}_FALSE", tool.to_uppercase()), "#".to_string());
        }

        for addition in additions {
            let joined = match vars.get(addition.key) {
                Some(existing) if !existing.is_empty() => {
                    join_paths(addition.key, &[PathBuf::from(existing), addition.path.clone()])?
                }
                _ => join_paths(addition.key, &[addition.path.clone()])?,
            };
            debug!("Setting {}={}", addition.key, joined);
            vars.insert(addition.key.to_string(), joined);
        }

        let path_dirs = build_path_dirs(plan, config);
        set_path_list_var(&mut vars, "PATH", &path_dirs)?;

        if vars.get("PATH").is_none_or(|p| p.is_empty()) {
            return Err(GkegError::BuildEnvError(
                "PATH is empty after environment assembly".to_string(),
            ));
        }
        debug!("Build environment has {} variables", vars.len());
        Ok(Self { vars })
    }

    #[cfg(test)]
    pub(crate) fn from_vars(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    pub fn path_string(&self) -> Option<&str> {
        self.get("PATH")
    }

    /// A copy of the variables with `overrides` layered on top.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut merged = self.vars.clone();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

fn build_path_dirs(plan: &DependencyPlan, config: &Config) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for dep in plan.build() {
        if dep.provision != Provision::Formula {
            continue;
        }
        let opt_bin = config.formula_opt_path(&dep.name).join("bin");
        if opt_bin.is_dir() && !dirs.contains(&opt_bin) {
            trace!("Adding dependency bin to PATH: {}", opt_bin.display());
            dirs.push(opt_bin);
        }
    }

    let prefix_bin = config.bin_dir();
    if prefix_bin.is_dir() && !dirs.contains(&prefix_bin) {
        dirs.push(prefix_bin);
    }

    let inherited = env::var_os("PATH")
        .map(|p| env::split_paths(&p).collect::<Vec<_>>())
        .unwrap_or_default();
    let system = SYSTEM_PATH_DIRS.iter().map(PathBuf::from);
    for dir in inherited.into_iter().chain(system) {
        if !dir.as_os_str().is_empty() && !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

fn set_path_list_var(
    vars: &mut BTreeMap<String, String>,
    name: &str,
    paths: &[PathBuf],
) -> Result<()> {
    if paths.is_empty() {
        debug!("No directories provided for {}, not setting variable.", name);
        return Ok(());
    }
    let joined = join_paths(name, paths)?;
    debug!("Setting {}={}", name, joined);
    vars.insert(name.to_string(), joined);
    Ok(())
}

fn join_paths(name: &str, paths: &[PathBuf]) -> Result<String> {
    env::join_paths(paths.iter().map(PathBuf::as_path))
        .map_err(|e| GkegError::BuildEnvError(format!("Failed to join paths for {name}: {e}")))?
        .into_string()
        .map_err(|os_str| {
            GkegError::BuildEnvError(format!("{name} contains non-UTF8 characters: {os_str:?}"))
        })
}

/// Resolves keg-relative runtime settings (such as `LIBGUESTFS_PATH`) against `keg`.
pub fn runtime_vars(formula: &Formula, keg: &Path) -> BTreeMap<String, String> {
    formula
        .recipe
        .runtime_env
        .iter()
        .map(|s| (s.key.clone(), keg.join(&s.value).display().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use gkeg_common::dependency::plan;
    use gkeg_common::formulary::libguestfs;
    use gkeg_common::platform::HostPlatform;

    use super::*;
    use crate::requirement::{RequirementCheck, INCLUDE_PATHS_VAR, LIBRARY_PATHS_VAR};

    fn assemble_for(platform: HostPlatform, config: &Config) -> BuildEnvironment {
        let formula = libguestfs(&config.fuse_root);
        let p = plan(&formula, platform);
        let additions: Vec<_> = p
            .requirements
            .iter()
            .flat_map(|r| r.env_additions(platform, config.gkeg_root()))
            .collect();
        BuildEnvironment::assemble(&formula, &p, config, &additions).unwrap()
    }

    #[test]
    fn pkg_config_path_puts_last_declared_first() {
        let config = Config::with_root("/opt/homebrew");
        let env = assemble_for(HostPlatform::Linux, &config);
        assert_eq!(
            env.get("PKG_CONFIG_PATH").unwrap(),
            "/opt/homebrew/opt/hivex/lib/pkgconfig:\
             /opt/homebrew/opt/jansson/lib/pkgconfig:\
             /opt/homebrew/opt/augeas/lib/pkgconfig:\
             /opt/homebrew/opt/ncurses/lib/pkgconfig"
        );
    }

    #[test]
    fn fixed_exports_and_disabled_tools() {
        let config = Config::with_root("/opt/homebrew");
        let env = assemble_for(HostPlatform::Linux, &config);
        assert_eq!(env.get("LC_ALL"), Some("C"));
        assert_eq!(env.get("FUSE_LIBS"), Some("-lfuse -pthread -liconv"));
        assert!(env
            .get("FUSE_CFLAGS")
            .unwrap()
            .ends_with("-I/usr/local/include/fuse"));
        for tool in ["RPM", "DPKG", "PACMAN"] {
            assert_eq!(env.get(&format!("HAVE_{tool}_FALSE")), Some("#"));
        }
        assert!(env.get(LIBRARY_PATHS_VAR).is_none());
    }

    #[test]
    fn macos_with_custom_prefix_gets_fuse_search_paths() {
        let config = Config::with_root("/opt/homebrew");
        let env = assemble_for(HostPlatform::MacOs, &config);
        assert_eq!(env.get(LIBRARY_PATHS_VAR), Some("/usr/local/lib"));
        assert_eq!(env.get(INCLUDE_PATHS_VAR), Some("/usr/local/include/fuse"));

        let conventional = Config::with_root("/usr/local");
        let env = assemble_for(HostPlatform::MacOs, &conventional);
        assert!(env.get(LIBRARY_PATHS_VAR).is_none());
        assert!(env.get(INCLUDE_PATHS_VAR).is_none());
    }

    #[test]
    fn dependency_bins_lead_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path());
        let autoconf_bin = config.formula_opt_path("autoconf").join("bin");
        let qemu_bin = config.formula_opt_path("qemu").join("bin");
        fs::create_dir_all(&autoconf_bin).unwrap();
        fs::create_dir_all(&qemu_bin).unwrap();

        let env = assemble_for(HostPlatform::Linux, &config);
        let path: Vec<PathBuf> = env::split_paths(env.path_string().unwrap()).collect();
        assert_eq!(path[0], autoconf_bin);
        assert_eq!(path[1], qemu_bin);
        assert!(path.contains(&PathBuf::from("/usr/bin")));
    }

    #[test]
    fn runtime_vars_resolve_against_keg() {
        let formula = libguestfs(Path::new("/usr/local"));
        let vars = runtime_vars(&formula, Path::new("/p/Cellar/libguestfs/1.49.5"));
        assert_eq!(
            vars.get("LIBGUESTFS_PATH").map(String::as_str),
            Some("/p/Cellar/libguestfs/1.49.5/var/libguestfs-appliance")
        );
    }
}
