// gkeg-common/src/formulary.rs
//! Built-in formula definitions.

use std::path::Path;

use tracing::debug;

use super::config::{Config, CONVENTIONAL_PREFIX};
use super::dependency::{Dependency, ExternalRequirement, PlatformScope};
use super::error::{GkegError, Result};
use super::model::{
    ArtifactClass, BuildRecipe, EnvSetting, Formula, InstallLayout, PatchSpec, ResourceSpec,
    ResourceStage,
};

pub const LIBGUESTFS: &str = "libguestfs";
pub const FIXED_APPLIANCE: &str = "fixed_appliance";

const LIBGUESTFS_MACOS_PATCH: &str = include_str!("../patches/libguestfs-macos.diff");
const LIBGUESTFS_MACOS_PATCH_SHA256: &str =
    "3186ce84f26d823665ea5f9408541e9752b578a0e4a3d32b954512280c7d588d";

const MACFUSE_MESSAGE: &str =
    "macFUSE is required to build libguestfs. Please run `brew install --cask macfuse` first.";

const LIBGUESTFS_CAVEATS: &str = "\
A fixed appliance is required for libguestfs to work on Mac OS X.
This formula downloads the appliance and places it in:
{prefix}/var/libguestfs-appliance

To use the appliance, add the following to your shell configuration:
export LIBGUESTFS_PATH={prefix}/var/libguestfs-appliance
and use libguestfs binaries in the normal way.

For compilers to find libguestfs you may need to set:
  export LDFLAGS=\"-L{prefix}/lib\"
  export CPPFLAGS=\"-I{prefix}/include\"

For pkg-config to find libguestfs you may need to set:
  export PKG_CONFIG_PATH=\"{prefix}/lib/pkgconfig\"
";

pub struct Formulary {
    config: Config,
}

impl Formulary {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn names(&self) -> &'static [&'static str] {
        &[LIBGUESTFS]
    }

    pub fn load_formula(&self, name: &str) -> Result<Formula> {
        match name {
            LIBGUESTFS => {
                debug!(
                    "Loaded built-in formula '{}' (fuse root {})",
                    name,
                    self.config.fuse_root.display()
                );
                Ok(libguestfs(&self.config.fuse_root))
            }
            _ => Err(GkegError::NotFound(format!(
                "Formula '{name}' is not known (available: {})",
                self.names().join(", ")
            ))),
        }
    }
}

/// The macFUSE kernel extension, installed by the user as a cask.
pub fn macfuse_requirement(fuse_root: &Path) -> ExternalRequirement {
    let include_dir = fuse_root.join("include").join("fuse");
    ExternalRequirement {
        name: "macfuse".to_string(),
        header: include_dir.join("fuse.h"),
        alias_guard: include_dir.clone(),
        library_dir: fuse_root.join("lib"),
        include_dir,
        conventional_prefix: CONVENTIONAL_PREFIX.into(),
        message: MACFUSE_MESSAGE.to_string(),
        scope: PlatformScope::MacOsOnly,
    }
}

/// libguestfs built against a prebuilt appliance, since the appliance cannot
/// be self-built off a supported Linux distribution.
pub fn libguestfs(fuse_root: &Path) -> Formula {
    let fuse_include = fuse_root.join("include").join("fuse");

    let mut dependencies: Vec<Dependency> = [
        "autoconf",
        "automake",
        "bison",
        "gnu-sed",
        "libtool",
        "ocaml",
        "ocaml-findlib",
        "pkg-config",
    ]
    .into_iter()
    .map(Dependency::new_build)
    .collect();

    dependencies.extend(
        [
            "augeas", "cdrtools", "coreutils", "cpio", "flex", "glib", "gperf", "hivex",
            "jansson", "libmagic", "libvirt", "pcre", "qemu", "readline", "xz",
        ]
        .into_iter()
        .map(Dependency::new_runtime),
    );
    dependencies.push(Dependency::uses_from_macos("libxml2"));
    dependencies.push(Dependency::uses_from_macos("ncurses"));
    dependencies.push(Dependency::new_runtime("libcap").on(PlatformScope::LinuxOnly));
    dependencies.push(Dependency::new_runtime("libfuse").on(PlatformScope::LinuxOnly));

    let configure_args = [
        "--disable-dependency-tracking",
        "--disable-silent-rules",
        "--with-distro=DARWIN",
        "--disable-probes",
        "--disable-appliance",
        "--disable-daemon",
        "--disable-ocaml",
        "--disable-lua",
        "--disable-haskell",
        "--disable-erlang",
        "--disable-gobject",
        "--disable-golang",
        "--disable-ruby",
        // Listed twice upstream; kept as a harmless duplicate.
        "--disable-golang",
        "--disable-php",
        "--disable-perl",
        "--disable-python",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let recipe = BuildRecipe {
        bootstrap: vec!["autoreconf".into(), "-i".into()],
        configure_args,
        deparallelize: true,
        install_args: vec!["INSTALLDIRS=vendor".into()],
        env: vec![
            EnvSetting::new(
                "FUSE_CFLAGS",
                format!(
                    "-D_FILE_OFFSET_BITS=64 -D_DARWIN_USE_64_BIT_INODE -I{}",
                    fuse_include.display()
                ),
            ),
            EnvSetting::new("FUSE_LIBS", "-lfuse -pthread -liconv"),
            EnvSetting::new("LC_ALL", "C"),
        ],
        pkg_config_deps: ["ncurses", "augeas", "jansson", "hivex"]
            .into_iter()
            .map(String::from)
            .collect(),
        disabled_package_tools: ["RPM", "DPKG", "PACMAN"]
            .into_iter()
            .map(String::from)
            .collect(),
        staged_resources: vec![ResourceStage {
            resource: FIXED_APPLIANCE.to_string(),
            keg_subdir: Path::new("var").join("libguestfs-appliance"),
        }],
        layout: InstallLayout::new(vec![
            ArtifactClass::Binaries,
            ArtifactClass::Header {
                name: "guestfs.h".into(),
            },
            ArtifactClass::Libraries,
            ArtifactClass::ManPages { section: 1 },
            ArtifactClass::ManPages { section: 3 },
            ArtifactClass::ManPages { section: 5 },
        ]),
        test_target: Some("quickcheck".into()),
        runtime_env: vec![EnvSetting::new(
            "LIBGUESTFS_PATH",
            "var/libguestfs-appliance",
        )],
    };

    Formula {
        name: LIBGUESTFS.to_string(),
        desc: "Tools for accessing and modifying virtual machine disk images".to_string(),
        homepage: "https://libguestfs.org/".to_string(),
        version: "1.49.5".to_string(),
        url: "https://libguestfs.org/download/1.49-development/libguestfs-1.49.5.tar.gz"
            .to_string(),
        sha256: "7923af8a5e2aa44268a5fed3cfb0634884e6562c88f46af65f066ce6a74547c4".to_string(),
        head: Some("https://github.com/libguestfs/libguestfs.git".to_string()),
        dependencies,
        requirements: vec![macfuse_requirement(fuse_root)],
        resources: vec![ResourceSpec {
            name: FIXED_APPLIANCE.to_string(),
            url: "file:///tmp/appliance-1.44.0.tar.xz".to_string(),
            sha256: "622b222c18882455e55745531b1d06e4663b25558e5f1123a375ab6da346042c"
                .to_string(),
        }],
        patches: vec![PatchSpec {
            name: "libguestfs-macos".to_string(),
            strip: 1,
            sha256: LIBGUESTFS_MACOS_PATCH_SHA256.to_string(),
            body: LIBGUESTFS_MACOS_PATCH.to_string(),
        }],
        recipe,
        caveats: Some(LIBGUESTFS_CAVEATS.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_args_keep_duplicate_golang_flag() {
        let formula = libguestfs(Path::new("/usr/local"));
        let count = formula
            .recipe
            .configure_args
            .iter()
            .filter(|a| *a == "--disable-golang")
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn macfuse_paths_follow_root() {
        let req = macfuse_requirement(Path::new("/tmp/fuse-root"));
        assert_eq!(
            req.header,
            Path::new("/tmp/fuse-root/include/fuse/fuse.h")
        );
        assert_eq!(req.alias_guard, Path::new("/tmp/fuse-root/include/fuse"));
        assert_eq!(req.library_dir, Path::new("/tmp/fuse-root/lib"));
    }

    #[test]
    fn patch_touches_the_two_upstream_files() {
        let formula = libguestfs(Path::new("/usr/local"));
        assert_eq!(
            formula.patches[0].touched_files(),
            vec!["lib/Makefile.am".to_string(), "lib/handle.c".to_string()]
        );
    }

    #[test]
    fn unknown_formula_is_not_found() {
        let formulary = Formulary::new(Config::with_root("/p"));
        assert!(formulary.load_formula(LIBGUESTFS).is_ok());
        assert!(matches!(
            formulary.load_formula("wget"),
            Err(GkegError::NotFound(_))
        ));
    }
}
