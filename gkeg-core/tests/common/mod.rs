#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use gkeg_common::error::Result;
use gkeg_common::formulary::libguestfs;
use gkeg_common::model::Formula;
use gkeg_common::Config;
use gkeg_core::build::{CommandOutcome, CommandRunner};

#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Option<BTreeMap<String, String>>,
}

impl Invocation {
    pub fn line(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
            .trim()
            .to_string()
    }
}

type Hook = Box<dyn FnMut(&Invocation) -> CommandOutcome>;

/// Records every command instead of running it.
pub struct RecordingRunner {
    pub calls: Vec<Invocation>,
    hook: Hook,
}

impl RecordingRunner {
    pub fn succeeding() -> Self {
        Self::with_hook(|_| CommandOutcome::ok())
    }

    pub fn with_hook(hook: impl FnMut(&Invocation) -> CommandOutcome + 'static) -> Self {
        Self {
            calls: Vec::new(),
            hook: Box::new(hook),
        }
    }

    pub fn programs(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.program.as_str()).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(
        &mut self,
        program: &str,
        args: &[String],
        cwd: &Path,
        env: Option<&BTreeMap<String, String>>,
    ) -> Result<CommandOutcome> {
        let invocation = Invocation {
            program: program.to_string(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
            env: env.cloned(),
        };
        let outcome = (self.hook)(&invocation);
        self.calls.push(invocation);
        Ok(outcome)
    }
}

/// A prefix, a macFUSE root with its header, a source tree and a pinned appliance.
pub struct Sandbox {
    pub dir: tempfile::TempDir,
    pub config: Config,
    pub formula: Formula,
    pub source: PathBuf,
    pub appliance: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_root(dir.path().join("prefix"));
        config.fuse_root = dir.path().join("fuse");
        let header_dir = config.fuse_root.join("include/fuse");
        fs::create_dir_all(&header_dir).unwrap();
        fs::write(header_dir.join("fuse.h"), "/* fuse */\n").unwrap();

        let source = dir.path().join("libguestfs-src");
        fs::create_dir_all(source.join("lib")).unwrap();
        fs::write(source.join("configure.ac"), "AC_INIT([libguestfs])\n").unwrap();

        let appliance = dir.path().join("appliance-1.44.0.tar.xz");
        write_appliance(&appliance);

        let mut formula = libguestfs(&config.fuse_root);
        formula.resources[0].url = format!("file://{}", appliance.display());
        formula.resources[0].sha256 = gkeg_aio::sha256_file(&appliance).unwrap();

        Self {
            dir,
            config,
            formula,
            source,
            appliance,
        }
    }

    pub fn keg(&self) -> PathBuf {
        self.config
            .formula_keg_path(&self.formula.name, &self.formula.version)
    }
}

fn write_appliance(path: &Path) {
    let file = fs::File::create(path).unwrap();
    let encoder = xz2::write::XzEncoder::new(file, 6);
    let mut builder = tar::Builder::new(encoder);
    let files: [(&str, &[u8]); 3] = [
        ("appliance/kernel", b"kernel"),
        ("appliance/initrd", b"initrd"),
        ("appliance/root", b"root"),
    ];
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Writes what `make DESTDIR=... install` of libguestfs would leave behind.
pub fn fake_staged_install(staged_prefix: &Path) {
    for rel in [
        "bin/guestfish",
        "bin/virt-copy-out",
        "include/guestfs.h",
        "include/guestfs-gobject.h",
        "lib/libguestfs.0.dylib",
        "lib/pkgconfig/libguestfs.pc",
        "share/man/man1/guestfish.1",
        "share/man/man3/guestfs.3",
        "share/man/man5/libguestfs-tools.conf.5",
        "share/doc/libguestfs/README",
        "share/locale/de/LC_MESSAGES/libguestfs.mo",
        "etc/libguestfs-tools.conf",
    ] {
        let path = staged_prefix.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel).unwrap();
    }
}
