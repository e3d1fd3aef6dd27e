// gkeg-common/src/dependency/planner.rs
//! Turns a formula's declarations into the dependency set for one platform.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::definition::DependencyTag;
use super::requirement::ExternalRequirement;
use crate::model::formula::Formula;
use crate::platform::HostPlatform;

/// How a planned dependency gets satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provision {
    /// Installed by the package manager under `<prefix>/opt/<name>`.
    Formula,
    /// Already provided by the host operating system; never fetched.
    Host,
    /// Installed out-of-band by the user and gated by a filesystem check.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDependency {
    pub name: String,
    pub tags: DependencyTag,
    pub provision: Provision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyPlan {
    pub platform: HostPlatform,
    pub entries: Vec<PlannedDependency>,
    pub requirements: Vec<ExternalRequirement>,
}

impl DependencyPlan {
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Entries that end up in the installed artifact's runtime requirements.
    pub fn runtime(&self) -> Vec<&PlannedDependency> {
        self.entries
            .iter()
            .filter(|e| e.tags.is_runtime())
            .collect()
    }

    /// Entries needed only while building.
    pub fn build_only(&self) -> Vec<&PlannedDependency> {
        self.entries
            .iter()
            .filter(|e| e.tags.is_build_only())
            .collect()
    }

    /// Entries required while building, runtime dependencies included.
    pub fn build(&self) -> Vec<&PlannedDependency> {
        self.entries
            .iter()
            .filter(|e| e.tags.intersects(DependencyTag::BUILD | DependencyTag::RUNTIME))
            .collect()
    }

    /// Entries the package manager is responsible for.
    pub fn managed(&self) -> Vec<&PlannedDependency> {
        self.by_provision(Provision::Formula)
    }

    pub fn host_provided(&self) -> Vec<&PlannedDependency> {
        self.by_provision(Provision::Host)
    }

    pub fn external(&self) -> Vec<&PlannedDependency> {
        self.by_provision(Provision::External)
    }

    fn by_provision(&self, provision: Provision) -> Vec<&PlannedDependency> {
        self.entries
            .iter()
            .filter(|e| e.provision == provision)
            .collect()
    }

    fn push(&mut self, index: &mut HashMap<String, usize>, entry: PlannedDependency) {
        match index.get(&entry.name) {
            Some(&pos) => {
                debug!(
                    "Merging duplicate dependency '{}' ({} | {})",
                    entry.name, self.entries[pos].tags, entry.tags
                );
                self.entries[pos].tags |= entry.tags;
            }
            None => {
                index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

/// Plans the dependencies of `formula` for `platform`.
///
/// Declarations keep their order. Duplicate names collapse into the first
/// occurrence with their tags merged. On macOS `uses_from_macos` entries are
/// host-provided; external requirements that apply to the platform are added
/// as build-only gates.
pub fn plan(formula: &Formula, platform: HostPlatform) -> DependencyPlan {
    let mut plan = DependencyPlan {
        platform,
        entries: Vec::with_capacity(formula.dependencies.len()),
        requirements: Vec::new(),
    };
    let mut index = HashMap::new();

    for dep in formula
        .dependencies
        .iter()
        .filter(|d| d.scope.applies_to(platform))
    {
        let provision = if dep.uses_from_macos && platform.is_macos() {
            Provision::Host
        } else {
            Provision::Formula
        };
        plan.push(
            &mut index,
            PlannedDependency {
                name: dep.name.clone(),
                tags: dep.tags,
                provision,
            },
        );
    }

    for req in formula
        .requirements
        .iter()
        .filter(|r| r.scope.applies_to(platform))
    {
        plan.push(
            &mut index,
            PlannedDependency {
                name: req.name.clone(),
                tags: DependencyTag::BUILD,
                provision: Provision::External,
            },
        );
        plan.requirements.push(req.clone());
    }

    debug!(
        "Planned {} dependencies for '{}' on {}: {:?}",
        plan.entries.len(),
        formula.name,
        platform,
        plan.names()
    );
    plan
}
