/*
File: gkeg-aio/src/fs.rs
Purpose: Primitive synchronous filesystem operations.
*/
use std::fs;
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gkeg_common::error::{GkegError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, error};
use walkdir::WalkDir;

/// True if `path` itself is a symbolic link (the link is not followed).
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// True if `path` is a regular file reached without following a final symlink.
pub fn is_regular_file_no_follow(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_file())
        .unwrap_or(false)
}

/// Creates a directory and all its parent components if they are missing.
pub fn create_dir_all(path: &Path) -> Result<()> {
    debug!("Creating directory recursively: {}", path.display());
    fs::create_dir_all(path).map_err(|e| {
        error!("Failed create dir {}: {}", path.display(), e);
        GkegError::from(e)
    })
}

/// Atomically writes data to a file using a temporary file in the same directory.
pub fn atomic_write_file(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        GkegError::IoError(format!("Cannot get parent directory for {}", path.display()))
    })?;
    create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    debug!(
        "Atomically writing {} bytes to {} via temp file {}",
        content.len(),
        path.display(),
        temp_file.path().display()
    );
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| {
        error!("Failed to persist temporary file over {}: {}", path.display(), e.error);
        GkegError::Io(Arc::new(e.error))
    })?;
    Ok(())
}

/// Copies one entry (file, symlink or whole directory) into `dest_dir`,
/// keeping its file name. Symlinks are recreated, not followed.
///
/// Returns the number of non-directory entries written. Stops at the first
/// error; whatever was copied before it stays in place.
pub fn copy_entry_into(src: &Path, dest_dir: &Path) -> Result<usize> {
    let name = src.file_name().ok_or_else(|| {
        GkegError::IoError(format!("Cannot copy {}: no file name", src.display()))
    })?;
    create_dir_all(dest_dir)?;
    let dest_root = dest_dir.join(name);

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false).follow_root_links(false) {
        let entry = entry.map_err(|e| {
            GkegError::IoError(format!("Failed to walk {}: {}", src.display(), e))
        })?;
        let rel = entry.path().strip_prefix(src).map_err(|e| {
            GkegError::IoError(format!("Unexpected path {}: {}", entry.path().display(), e))
        })?;
        let target: PathBuf = if rel.as_os_str().is_empty() {
            dest_root.clone()
        } else {
            dest_root.join(rel)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            create_dir_all(parent)?;
        }
        if target.symlink_metadata().is_ok() {
            fs::remove_file(&target)?;
        }
        if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path())?;
            create_symlink(&link_target, &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| {
                GkegError::IoError(format!(
                    "Failed to copy {} to {}: {}",
                    entry.path().display(),
                    target.display(),
                    e
                ))
            })?;
        }
        copied += 1;
    }
    Ok(copied)
}

/// Creates a symbolic link. Unix only.
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    debug!("Creating symlink {} -> {}", link.display(), target.display());
    symlink(target, link).map_err(|e| {
        error!(
            "Failed create symlink {} -> {}: {}",
            link.display(),
            target.display(),
            e
        );
        GkegError::from(e)
    })
}

#[cfg(not(unix))]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    Err(GkegError::Generic(format!(
        "Symlinks not supported on this platform: {} -> {}",
        link.display(),
        target.display()
    )))
}

/// Sorted entries of a directory; an absent directory yields nothing.
pub fn list_directory_entries(dir_path: &Path) -> Result<Vec<PathBuf>> {
    if !dir_path.is_dir() {
        debug!("Directory {} does not exist", dir_path.display());
        return Ok(Vec::new());
    }
    let mut entries = fs::read_dir(dir_path)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn copies_directories_and_keeps_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("lib");
        fs::create_dir_all(src.join("pkgconfig")).unwrap();
        fs::write(src.join("libguestfs.0.dylib"), b"lib").unwrap();
        fs::write(src.join("pkgconfig/libguestfs.pc"), b"pc").unwrap();
        symlink("libguestfs.0.dylib", src.join("libguestfs.dylib")).unwrap();

        let dest = dir.path().join("keg");
        let mut copied = 0;
        for entry in list_directory_entries(&src).unwrap() {
            copied += copy_entry_into(&entry, &dest).unwrap();
        }
        assert_eq!(copied, 3);
        assert!(dest.join("pkgconfig/libguestfs.pc").is_file());
        assert!(is_symlink(&dest.join("libguestfs.dylib")));
        assert!(is_regular_file_no_follow(&dest.join("libguestfs.0.dylib")));
    }

    #[test]
    fn atomic_write_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/receipt.json");
        atomic_write_file(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }
}
