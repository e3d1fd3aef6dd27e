// gkeg-core/src/install/mod.rs
//! Prepare phase, build pipeline and post-install bookkeeping for one formula.

pub mod receipt;
pub mod source;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use gkeg_common::config::Config;
use gkeg_common::dependency::{plan, DependencyPlan};
use gkeg_common::error::{GkegError, Result};
use gkeg_common::model::{Formula, SourceOrigin};
use gkeg_common::platform::HostPlatform;
use serde::Serialize;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, warn};

use crate::build::env::runtime_vars;
use crate::build::patch::apply_patch;
use crate::build::{
    execute, plan_steps, BuildEnvironment, BuildStep, CommandRunner, ExecutionReport,
    StepContext,
};
use crate::check::ensure_managed_present;
use crate::requirement::{check_all, env_additions_for};

pub use receipt::{write_receipt, InstallReceipt, RECEIPT_FILE};
pub use source::obtain_source;

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub head: bool,
    /// Build from a copy of this tree instead of fetching; the tree itself is
    /// never patched or built in.
    pub source_dir: Option<PathBuf>,
    pub ignore_dependencies: bool,
    pub keep_tmp: bool,
    pub quickcheck: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub keg: PathBuf,
    pub origin: SourceOrigin,
    pub steps: Vec<BuildStep>,
    /// `None` for a dry run.
    pub report: Option<ExecutionReport>,
    pub quickcheck_ran: bool,
}

/// Renders the post-install guidance for a keg.
pub fn caveats(formula: &Formula, keg: &Path) -> Option<String> {
    formula.render_caveats(keg)
}

pub struct Installer {
    config: Config,
    formula: Formula,
    platform: HostPlatform,
}

impl Installer {
    pub fn new(config: Config, formula: Formula) -> Self {
        Self {
            config,
            formula,
            platform: HostPlatform::current(),
        }
    }

    pub fn with_platform(mut self, platform: HostPlatform) -> Self {
        self.platform = platform;
        self
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    pub fn dependency_plan(&self) -> DependencyPlan {
        plan(&self.formula, self.platform)
    }

    /// A given source directory wins over `--head`; its `.git` entry decides
    /// whether it counts as a head build.
    pub fn origin(&self, opts: &InstallOptions) -> Result<SourceOrigin> {
        if let Some(dir) = &opts.source_dir {
            let origin = SourceOrigin::local(dir);
            if opts.head && !origin.is_head() {
                warn!(
                    "{} is not a version-control checkout; building it as a release tree",
                    dir.display()
                );
            }
            return Ok(origin);
        }
        if opts.head {
            return self.formula.head_origin().ok_or_else(|| {
                GkegError::Generic(format!("'{}' has no head repository", self.formula.name))
            });
        }
        Ok(self.formula.stable_origin())
    }

    pub fn keg_path(&self, origin: &SourceOrigin) -> PathBuf {
        self.config
            .formula_keg_path(&self.formula.name, &self.formula.keg_version(origin))
    }

    pub fn build_dir(&self, origin: &SourceOrigin) -> PathBuf {
        self.config.tmp_dir().join(format!(
            "gkeg-{}-{}",
            self.formula.name,
            self.formula.keg_version(origin)
        ))
    }

    /// The steps an install with `opts` would run, without touching anything.
    pub fn preview_steps(&self, opts: &InstallOptions) -> Result<Vec<BuildStep>> {
        let origin = self.origin(opts)?;
        let build_dir = self.build_dir(&origin);
        let resources = self
            .formula
            .resources
            .iter()
            .map(|r| (r.name.clone(), gkeg_net::resource_cache_path(r, &self.config)))
            .collect();
        let source_dir = build_dir.join("src");
        plan_steps(&self.formula, &self.step_context(&origin, &build_dir, source_dir, resources))
    }

    fn step_context(
        &self,
        origin: &SourceOrigin,
        build_dir: &Path,
        source_dir: PathBuf,
        resources: HashMap<String, PathBuf>,
    ) -> StepContext {
        StepContext {
            source_dir,
            keg: self.keg_path(origin),
            staging_root: build_dir.join("stage"),
            head: origin.is_head(),
            resources,
        }
    }

    /// Runs the prepare phase and then the build pipeline.
    ///
    /// Nothing reaches the build steps unless every requirement holds, the
    /// managed dependencies are present, and every fetched artifact and patch
    /// has passed its checksum.
    pub async fn install<R: CommandRunner>(
        &self,
        opts: &InstallOptions,
        runner: &mut R,
    ) -> Result<InstallOutcome> {
        let formula = &self.formula;
        let dep_plan = self.dependency_plan();

        check_all(&dep_plan)?;
        if opts.ignore_dependencies {
            warn!("Skipping dependency presence check");
        } else {
            ensure_managed_present(&dep_plan, &self.config)?;
        }

        let origin = self.origin(opts)?;
        let keg = self.keg_path(&origin);
        if opts.dry_run {
            info!("Dry run: not fetching or building {}", formula.name);
            return Ok(InstallOutcome {
                keg,
                origin,
                steps: self.preview_steps(opts)?,
                report: None,
                quickcheck_ran: false,
            });
        }
        if keg.join(RECEIPT_FILE).is_file() {
            return Err(GkegError::InstallError(format!(
                "{} is already installed at {}",
                formula.name,
                keg.display()
            )));
        }
        if keg.exists() {
            warn!(
                "Removing incomplete keg {} left by an earlier failed install",
                keg.display()
            );
            fs::remove_dir_all(&keg)?;
        }

        let build_dir = BuildDir::create(self.build_dir(&origin), opts.keep_tmp)?;
        let source_dir =
            obtain_source(formula, &origin, &build_dir.path().join("src"), &self.config).await?;

        let mut resources = HashMap::new();
        for resource in &formula.resources {
            info!("==> Fetching resource {}", resource.name);
            let path = gkeg_net::fetch_resource(&formula.name, resource, &self.config).await?;
            resources.insert(resource.name.clone(), path);
        }

        let scratch = build_dir.path().join("patches");
        run_blocking(|| {
            formula
                .patches
                .iter()
                .try_for_each(|patch| apply_patch(patch, &source_dir, &scratch, &mut *runner))
        })?;

        let additions = env_additions_for(&dep_plan, self.config.gkeg_root());
        let env = BuildEnvironment::assemble(formula, &dep_plan, &self.config, &additions)?;
        let ctx = self.step_context(&origin, build_dir.path(), source_dir.clone(), resources);
        let steps = plan_steps(formula, &ctx)?;

        let report = run_blocking(|| execute(&steps, &env, &mut *runner)).inspect_err(|_| {
            if keg.exists() {
                warn!("Build failed; {} may be incomplete", keg.display());
            }
        })?;

        let version = formula.keg_version(&origin);
        write_receipt(formula, &version, &origin, self.platform, &keg)?;

        let quickcheck_ran = if opts.quickcheck {
            run_blocking(|| self.run_quickcheck(&source_dir, &keg, &env, steps.len(), runner))?
        } else {
            false
        };

        info!("==> {} {} installed to {}", formula.name, version, keg.display());
        Ok(InstallOutcome {
            keg,
            origin,
            steps,
            report: Some(report),
            quickcheck_ran,
        })
    }

    fn run_quickcheck<R: CommandRunner>(
        &self,
        source_dir: &Path,
        keg: &Path,
        env: &BuildEnvironment,
        index: usize,
        runner: &mut R,
    ) -> Result<bool> {
        let Some(target) = &self.formula.recipe.test_target else {
            debug!("{} has no test target", self.formula.name);
            return Ok(false);
        };
        info!("==> make -j1 {}", target);
        let vars = env.with_overrides(&runtime_vars(&self.formula, keg));
        let args = vec!["-j1".to_string(), target.clone()];
        let outcome = runner.run("make", &args, source_dir, Some(&vars))?;
        if !outcome.success {
            return Err(GkegError::BuildStepFailed {
                index,
                step: target.clone(),
                code: outcome.code,
                output: outcome.output,
            });
        }
        Ok(true)
    }
}

/// Runs blocking build work off the async worker when the runtime allows it.
/// A current-thread runtime has no other worker to hand tasks to, so the
/// closure runs inline there.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Scratch directory for one build; removed on drop unless kept.
struct BuildDir {
    path: PathBuf,
    keep: bool,
}

impl BuildDir {
    fn create(path: PathBuf, keep: bool) -> Result<Self> {
        if path.exists() {
            debug!("Removing stale build directory {}", path.display());
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path, keep })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildDir {
    fn drop(&mut self) {
        if self.keep {
            info!("Keeping build directory {}", self.path.display());
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(
                "Failed to remove build directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
