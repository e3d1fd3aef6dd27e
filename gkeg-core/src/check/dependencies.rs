// gkeg-core/src/check/dependencies.rs
use gkeg_common::config::Config;
use gkeg_common::dependency::DependencyPlan;
use gkeg_common::error::{GkegError, Result};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PresenceReport {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl PresenceReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Looks for `<prefix>/opt/<name>` for every managed dependency of `plan`.
/// Host-provided and external entries are not the package manager's concern.
pub fn managed_presence(plan: &DependencyPlan, config: &Config) -> PresenceReport {
    let mut report = PresenceReport::default();
    for dep in plan.managed() {
        let opt = config.formula_opt_path(&dep.name);
        // The opt entry is normally a symlink into the Cellar; follow it.
        if opt.exists() {
            report.present.push(dep.name.clone());
        } else {
            debug!("Dependency '{}' not found at {}", dep.name, opt.display());
            report.missing.push(dep.name.clone());
        }
    }
    report
}

pub fn ensure_managed_present(plan: &DependencyPlan, config: &Config) -> Result<()> {
    let report = managed_presence(plan, config);
    if report.is_complete() {
        return Ok(());
    }
    Err(GkegError::DependencyError(format!(
        "Missing dependencies under {}: {}",
        config.opt_dir().display(),
        report.missing.join(", ")
    )))
}
