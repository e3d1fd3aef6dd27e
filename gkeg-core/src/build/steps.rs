// gkeg-core/src/build/steps.rs
//! The fixed step sequence of an autotools formula build.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use gkeg_common::error::{GkegError, Result};
use gkeg_common::model::{Formula, InstallLayout};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    PrepareEnv,
    SubmoduleInit,
    Bootstrap,
    Configure,
    Build,
    StageResource,
    Install,
    CopyOut,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrepareEnv => "prepare-env",
            Self::SubmoduleInit => "submodule-init",
            Self::Bootstrap => "bootstrap",
            Self::Configure => "configure",
            Self::Build => "build",
            Self::StageResource => "stage-resource",
            Self::Install => "install",
            Self::CopyOut => "copy-out",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    /// Validates the assembled environment record before anything runs with it.
    PrepareEnv,
    Command {
        program: String,
        args: Vec<String>,
        /// Layered over the build environment for this command only.
        env: BTreeMap<String, String>,
    },
    StageResource {
        resource: String,
        archive: PathBuf,
        destination: PathBuf,
    },
    CopyOut {
        layout: InstallLayout,
        staged_prefix: PathBuf,
        keg: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStep {
    pub kind: StepKind,
    pub action: StepAction,
    /// Working directory for commands; the source tree.
    pub cwd: PathBuf,
}

impl BuildStep {
    fn command(kind: StepKind, cwd: &Path, program: &str, args: Vec<String>) -> Self {
        Self {
            kind,
            action: StepAction::Command {
                program: program.to_string(),
                args,
                env: BTreeMap::new(),
            },
            cwd: cwd.to_path_buf(),
        }
    }

    fn with_env(mut self, key: &str, value: &str) -> Self {
        if let StepAction::Command { env, .. } = &mut self.action {
            env.insert(key.to_string(), value.to_string());
        }
        self
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            StepAction::PrepareEnv => write!(f, "{}: assemble build environment", self.kind),
            StepAction::Command { program, args, env } => {
                write!(f, "{}: ", self.kind)?;
                for (k, v) in env {
                    write!(f, "{k}={v} ")?;
                }
                write!(f, "{program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            StepAction::StageResource {
                resource,
                destination,
                ..
            } => write!(
                f,
                "{}: extract {} into {}",
                self.kind,
                resource,
                destination.display()
            ),
            StepAction::CopyOut {
                layout,
                staged_prefix,
                keg,
            } => {
                let classes: Vec<String> = layout.classes.iter().map(|c| c.to_string()).collect();
                write!(
                    f,
                    "{}: {} from {} into {}",
                    self.kind,
                    classes.join(", "),
                    staged_prefix.display(),
                    keg.display()
                )
            }
        }
    }
}

/// Paths the step planner needs from the prepare phase.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub source_dir: PathBuf,
    pub keg: PathBuf,
    /// `DESTDIR` for the staged install.
    pub staging_root: PathBuf,
    pub head: bool,
    /// Verified archives by resource name.
    pub resources: HashMap<String, PathBuf>,
}

/// `<staging_root>/<keg>`: where a `DESTDIR` install puts the keg's files.
pub fn staged_prefix(staging_root: &Path, keg: &Path) -> PathBuf {
    let relative: PathBuf = keg
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    staging_root.join(relative)
}

/// Plans the build steps of `formula`.
///
/// The sequence is fixed. Head builds get the submodule step right after the
/// environment step; nothing else depends on the source origin.
pub fn plan_steps(formula: &Formula, ctx: &StepContext) -> Result<Vec<BuildStep>> {
    let recipe = &formula.recipe;
    let cwd = ctx.source_dir.as_path();
    let mut steps = Vec::new();

    steps.push(BuildStep {
        kind: StepKind::PrepareEnv,
        action: StepAction::PrepareEnv,
        cwd: cwd.to_path_buf(),
    });

    if ctx.head {
        steps.push(BuildStep::command(
            StepKind::SubmoduleInit,
            cwd,
            "git",
            vec!["submodule".into(), "update".into(), "--init".into()],
        ));
    }

    if let Some((program, args)) = recipe.bootstrap.split_first() {
        steps.push(BuildStep::command(
            StepKind::Bootstrap,
            cwd,
            program,
            args.to_vec(),
        ));
    }

    warn_duplicate_args(&recipe.configure_args);
    let mut configure_args = recipe.configure_args.clone();
    let prefix_at = configure_args.len().min(2);
    configure_args.insert(prefix_at, format!("--prefix={}", ctx.keg.display()));
    steps.push(BuildStep::command(
        StepKind::Configure,
        cwd,
        "./configure",
        configure_args,
    ));

    let make = if recipe.deparallelize {
        BuildStep::command(StepKind::Build, cwd, "make", vec!["-j1".into()]).with_env("MAKEFLAGS", "-j1")
    } else {
        BuildStep::command(StepKind::Build, cwd, "make", Vec::new())
    };
    steps.push(make);

    for stage in &recipe.staged_resources {
        let archive = ctx.resources.get(&stage.resource).ok_or_else(|| {
            GkegError::NotFound(format!(
                "Resource '{}' has not been fetched for '{}'",
                stage.resource, formula.name
            ))
        })?;
        steps.push(BuildStep {
            kind: StepKind::StageResource,
            action: StepAction::StageResource {
                resource: stage.resource.clone(),
                archive: archive.clone(),
                destination: ctx.keg.join(&stage.keg_subdir),
            },
            cwd: cwd.to_path_buf(),
        });
    }

    let mut install_args = recipe.install_args.clone();
    install_args.push(format!("DESTDIR={}", ctx.staging_root.display()));
    install_args.push("install".into());
    steps.push(BuildStep::command(
        StepKind::Install,
        cwd,
        "make",
        install_args,
    ));

    steps.push(BuildStep {
        kind: StepKind::CopyOut,
        action: StepAction::CopyOut {
            layout: recipe.layout.clone(),
            staged_prefix: staged_prefix(&ctx.staging_root, &ctx.keg),
            keg: ctx.keg.clone(),
        },
        cwd: cwd.to_path_buf(),
    });

    Ok(steps)
}

fn warn_duplicate_args(args: &[String]) {
    let mut seen = HashSet::new();
    for arg in args {
        if !seen.insert(arg.as_str()) {
            warn!("configure argument '{}' is listed more than once", arg);
        }
    }
}

#[cfg(test)]
mod tests {
    use gkeg_common::formulary::{libguestfs, FIXED_APPLIANCE};

    use super::*;

    fn ctx(head: bool) -> StepContext {
        let mut resources = HashMap::new();
        resources.insert(
            FIXED_APPLIANCE.to_string(),
            PathBuf::from("/cache/resources/fixed_appliance-appliance-1.44.0.tar.xz"),
        );
        StepContext {
            source_dir: PathBuf::from("/tmp/build/src"),
            keg: PathBuf::from("/opt/homebrew/Cellar/libguestfs/1.49.5"),
            staging_root: PathBuf::from("/tmp/build/stage"),
            head,
            resources,
        }
    }

    fn kinds(steps: &[BuildStep]) -> Vec<StepKind> {
        steps.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn archive_build_sequence() {
        let formula = libguestfs(Path::new("/usr/local"));
        let steps = plan_steps(&formula, &ctx(false)).unwrap();
        assert_eq!(
            kinds(&steps),
            vec![
                StepKind::PrepareEnv,
                StepKind::Bootstrap,
                StepKind::Configure,
                StepKind::Build,
                StepKind::StageResource,
                StepKind::Install,
                StepKind::CopyOut,
            ]
        );
    }

    #[test]
    fn head_differs_only_by_submodule_step() {
        let formula = libguestfs(Path::new("/usr/local"));
        let archive = plan_steps(&formula, &ctx(false)).unwrap();
        let head = plan_steps(&formula, &ctx(true)).unwrap();
        assert_eq!(head.len(), archive.len() + 1);
        assert_eq!(head[1].kind, StepKind::SubmoduleInit);
        let without: Vec<_> = head
            .into_iter()
            .filter(|s| s.kind != StepKind::SubmoduleInit)
            .collect();
        assert_eq!(without, archive);
    }

    #[test]
    fn configure_gets_prefix_third_and_keeps_duplicate() {
        let formula = libguestfs(Path::new("/usr/local"));
        let steps = plan_steps(&formula, &ctx(false)).unwrap();
        let StepAction::Command { program, args, .. } = &steps[2].action else {
            panic!("configure is a command");
        };
        assert_eq!(program, "./configure");
        assert_eq!(args[2], "--prefix=/opt/homebrew/Cellar/libguestfs/1.49.5");
        assert_eq!(args.iter().filter(|a| *a == "--disable-golang").count(), 2);
    }

    #[test]
    fn make_is_deparallelized_and_install_is_staged() {
        let formula = libguestfs(Path::new("/usr/local"));
        let steps = plan_steps(&formula, &ctx(false)).unwrap();
        let StepAction::Command { args, env, .. } = &steps[3].action else {
            panic!("make is a command");
        };
        assert_eq!(args, &vec!["-j1".to_string()]);
        assert_eq!(env.get("MAKEFLAGS").map(String::as_str), Some("-j1"));

        let StepAction::Command { args, .. } = &steps[5].action else {
            panic!("install is a command");
        };
        assert_eq!(
            args,
            &vec![
                "INSTALLDIRS=vendor".to_string(),
                "DESTDIR=/tmp/build/stage".to_string(),
                "install".to_string(),
            ]
        );
    }

    #[test]
    fn appliance_is_staged_inside_the_keg() {
        let formula = libguestfs(Path::new("/usr/local"));
        let steps = plan_steps(&formula, &ctx(false)).unwrap();
        match &steps[4].action {
            StepAction::StageResource { destination, .. } => assert_eq!(
                destination,
                Path::new("/opt/homebrew/Cellar/libguestfs/1.49.5/var/libguestfs-appliance")
            ),
            other => panic!("unexpected action {other:?}"),
        }
        match &steps[6].action {
            StepAction::CopyOut { staged_prefix, .. } => assert_eq!(
                staged_prefix,
                Path::new("/tmp/build/stage/opt/homebrew/Cellar/libguestfs/1.49.5")
            ),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn missing_resource_is_reported() {
        let formula = libguestfs(Path::new("/usr/local"));
        let mut c = ctx(false);
        c.resources.clear();
        assert!(matches!(
            plan_steps(&formula, &c),
            Err(GkegError::NotFound(_))
        ));
    }
}
