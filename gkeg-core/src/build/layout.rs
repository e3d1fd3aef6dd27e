// gkeg-core/src/build/layout.rs
//! Resource staging and the selective copy-out from the staged install.

use std::path::Path;

use gkeg_aio::fs::{copy_entry_into, create_dir_all, list_directory_entries};
use gkeg_aio::{determine_archive_type, extract_archive, infer_archive_root_dir};
use gkeg_common::error::{GkegError, Result};
use gkeg_common::model::InstallLayout;
use tracing::{debug, info, warn};

/// Extracts a verified archive into `destination`, dropping a single wrapper directory.
pub fn stage_archive(archive: &Path, destination: &Path) -> Result<()> {
    create_dir_all(destination)?;
    let archive_type = determine_archive_type(archive)?;
    let strip = match infer_archive_root_dir(archive, archive_type)? {
        Some(root) => {
            debug!("Stripping archive root '{}'", root.display());
            1
        }
        None => 0,
    };
    extract_archive(archive, destination, strip, archive_type)
}

/// Copies the layout's classes from `staged_prefix` into `keg`.
///
/// Directory classes copy their entries; a missing directory contributes
/// nothing. A missing single-file class is an error. Not atomic: on failure
/// the files already copied stay and `PartialInstall` carries their count.
pub fn copy_out(layout: &InstallLayout, staged_prefix: &Path, keg: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in layout.entries(staged_prefix, keg) {
        let result = if entry.class.is_single_file() {
            copy_single(&entry.source, &entry.destination)
        } else {
            copy_contents(&entry.source, &entry.destination)
        };
        match result {
            Ok(n) => {
                debug!("Copied {} entries for {}", n, entry.class);
                copied += n;
            }
            Err(e) => {
                warn!(
                    "Copy-out stopped at {} after {} file(s); keg {} is incomplete",
                    entry.class,
                    copied,
                    keg.display()
                );
                return Err(GkegError::PartialInstall {
                    copied,
                    reason: e.to_string(),
                });
            }
        }
    }
    info!("Copied {} file(s) into {}", copied, keg.display());
    Ok(copied)
}

fn copy_single(source: &Path, destination: &Path) -> Result<usize> {
    if !source.exists() {
        return Err(GkegError::NotFound(format!(
            "{} was not installed",
            source.display()
        )));
    }
    let parent = destination.parent().ok_or_else(|| {
        GkegError::IoError(format!("{} has no parent", destination.display()))
    })?;
    copy_entry_into(source, parent)
}

fn copy_contents(source: &Path, destination: &Path) -> Result<usize> {
    let entries = list_directory_entries(source)?;
    if entries.is_empty() {
        debug!("Nothing to copy from {}", source.display());
        return Ok(0);
    }
    let mut copied = 0;
    for item in entries {
        copied += copy_entry_into(&item, destination)?;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use gkeg_common::formulary::libguestfs;
    use walkdir::WalkDir;

    use super::*;

    fn relative_files(root: &Path) -> Vec<std::path::PathBuf> {
        let mut files: Vec<_> = WalkDir::new(root)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| !e.file_type().is_dir())
            .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, path.display().to_string()).unwrap();
    }

    #[test]
    fn copies_exactly_the_layout_classes() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("stage/keg");
        for rel in [
            "bin/guestfish",
            "bin/virt-rescue",
            "include/guestfs.h",
            "include/guestfs-internal.h",
            "lib/libguestfs.0.dylib",
            "lib/pkgconfig/libguestfs.pc",
            "share/man/man1/guestfish.1",
            "share/man/man3/guestfs.3",
            "share/man/man5/libguestfs-tools.conf.5",
            "share/man/man7/guestfs-faq.7",
            "share/doc/libguestfs/README",
            "etc/libguestfs-tools.conf",
        ] {
            touch(&staged.join(rel));
        }

        let keg = dir.path().join("keg");
        let layout = libguestfs(Path::new("/usr/local")).recipe.layout;
        let copied = copy_out(&layout, &staged, &keg).unwrap();

        let expected: Vec<_> = [
            "bin/guestfish",
            "bin/virt-rescue",
            "include/guestfs.h",
            "lib/libguestfs.0.dylib",
            "lib/pkgconfig/libguestfs.pc",
            "share/man/man1/guestfish.1",
            "share/man/man3/guestfs.3",
            "share/man/man5/libguestfs-tools.conf.5",
        ]
        .iter()
        .map(std::path::PathBuf::from)
        .collect();
        assert_eq!(relative_files(&keg), expected);
        assert_eq!(copied, expected.len());
    }

    #[test]
    fn missing_header_is_a_partial_install() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("stage");
        touch(&staged.join("bin/guestfish"));
        let keg = dir.path().join("keg");
        let layout = libguestfs(Path::new("/usr/local")).recipe.layout;

        match copy_out(&layout, &staged, &keg).unwrap_err() {
            GkegError::PartialInstall { copied, .. } => assert_eq!(copied, 1),
            other => panic!("unexpected error: {other}"),
        }
        assert!(keg.join("bin/guestfish").is_file());
    }

    #[test]
    fn stage_archive_strips_wrapper_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("appliance-1.44.0.tar.xz");
        {
            let file = fs::File::create(&archive).unwrap();
            let encoder = xz2::write::XzEncoder::new(file, 6);
            let mut builder = tar::Builder::new(encoder);
            let files: [(&str, &[u8]); 2] =
                [("appliance/kernel", b"k"), ("appliance/README.fixed", b"r")];
            for (name, data) in files {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, name, data).unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap();
        }
        let dest = dir.path().join("keg/var/libguestfs-appliance");
        stage_archive(&archive, &dest).unwrap();
        assert_eq!(fs::read(dest.join("kernel")).unwrap(), b"k");
        assert!(dest.join("README.fixed").is_file());
    }
}
