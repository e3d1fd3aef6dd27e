// gkeg-core/src/check/doctor.rs
use std::path::PathBuf;

use gkeg_common::config::Config;
use gkeg_common::dependency::DependencyPlan;
use serde::Serialize;
use tracing::debug;

use super::dependencies::{managed_presence, PresenceReport};
use crate::requirement::RequirementCheck;

/// Programs the pipeline and prepare phase invoke directly.
const REQUIRED_TOOLS: &[&str] = &["autoreconf", "make", "patch", "git"];

#[derive(Debug, Clone, Serialize)]
pub struct RequirementStatus {
    pub name: String,
    pub satisfied: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub requirements: Vec<RequirementStatus>,
    pub dependencies: PresenceReport,
    pub tools: Vec<ToolStatus>,
}

impl DoctorReport {
    pub fn is_healthy(&self) -> bool {
        self.requirements.iter().all(|r| r.satisfied)
            && self.dependencies.is_complete()
            && self.tools.iter().all(|t| t.path.is_some())
    }
}

pub fn diagnose(plan: &DependencyPlan, config: &Config) -> DoctorReport {
    let requirements = plan
        .requirements
        .iter()
        .map(|req| RequirementStatus {
            name: req.name.clone(),
            satisfied: req.satisfied(),
            message: req.message.clone(),
        })
        .collect();

    let tools = REQUIRED_TOOLS
        .iter()
        .map(|name| {
            let path = which::which(name).ok();
            debug!("Tool '{}' resolved to {:?}", name, path);
            ToolStatus {
                name: (*name).to_string(),
                path,
            }
        })
        .collect();

    DoctorReport {
        requirements,
        dependencies: managed_presence(plan, config),
        tools,
    }
}

#[cfg(test)]
mod tests {
    use gkeg_common::dependency::plan;
    use gkeg_common::formulary::libguestfs;
    use gkeg_common::platform::HostPlatform;

    use super::*;

    #[test]
    fn empty_prefix_is_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_root(dir.path().join("prefix"));
        config.fuse_root = dir.path().join("fuse");
        let formula = libguestfs(&config.fuse_root);
        let report = diagnose(&plan(&formula, HostPlatform::MacOs), &config);

        assert_eq!(report.requirements.len(), 1);
        assert!(!report.requirements[0].satisfied);
        assert!(!report.dependencies.missing.is_empty());
        assert_eq!(report.tools.len(), REQUIRED_TOOLS.len());
        assert!(!report.is_healthy());
    }
}
