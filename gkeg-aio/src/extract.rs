// gkeg-aio/src/extract.rs
// Tarball extraction with leading-component stripping.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use gkeg_common::error::{GkegError, Result};
use tar::Archive;
use tracing::{debug, error, warn};
use xz2::read::XzDecoder;

const SUPPORTED_ARCHIVE_EXTENSIONS: [&str; 4] = ["gz", "bz2", "xz", "tar"];

/// Sniffs the archive type from content, falling back to the file extension.
pub fn determine_archive_type(archive_path: &Path) -> Result<&'static str> {
    let ext = match infer::get_from_path(archive_path)? {
        Some(kind) => kind.extension().to_string(),
        None => archive_path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase(),
    };
    let ext = match ext.as_str() {
        "tgz" => "gz",
        "tbz" | "tbz2" => "bz2",
        "txz" => "xz",
        other => other,
    };
    SUPPORTED_ARCHIVE_EXTENSIONS
        .iter()
        .find(|&&s| s == ext)
        .copied()
        .ok_or_else(|| {
            GkegError::Generic(format!(
                "Unsupported archive type '{}' for {}",
                ext,
                archive_path.display()
            ))
        })
}

fn open_decoded(archive_path: &Path, archive_type: &str) -> Result<Box<dyn Read>> {
    let file = File::open(archive_path).map_err(|e| {
        GkegError::IoError(format!(
            "Failed to open archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    let reader: Box<dyn Read> = match archive_type {
        "gz" => Box::new(GzDecoder::new(file)),
        "bz2" => Box::new(BzDecoder::new(file)),
        "xz" => Box::new(XzDecoder::new(file)),
        "tar" => Box::new(file),
        _ => {
            return Err(GkegError::Generic(format!(
                "Unsupported archive type '{}' for {}",
                archive_type,
                archive_path.display()
            )))
        }
    };
    Ok(reader)
}

/// Returns the single top-level directory every entry lives under, if there is one.
pub fn infer_archive_root_dir(archive_path: &Path, archive_type: &str) -> Result<Option<PathBuf>> {
    debug!(
        "Inferring root directory for archive: {}",
        archive_path.display()
    );
    let mut archive = Archive::new(open_decoded(archive_path, archive_type)?);
    let mut unique_roots = HashSet::new();
    let mut first_root: Option<PathBuf> = None;
    let mut saw_nested_entry = false;

    for entry_result in archive.entries()? {
        let entry = entry_result.map_err(|e| {
            GkegError::Generic(format!(
                "Error reading TAR entry from {}: {}",
                archive_path.display(),
                e
            ))
        })?;
        let path = entry.path()?.into_owned();
        let mut components = path.components().filter(|c| *c != Component::CurDir);
        match components.next() {
            Some(Component::Normal(name)) => {
                let root = PathBuf::from(name);
                if components.next().is_some() || entry.header().entry_type().is_dir() {
                    saw_nested_entry = true;
                } else {
                    // A plain file at the top level means there is no wrapper dir.
                    return Ok(None);
                }
                first_root.get_or_insert_with(|| root.clone());
                unique_roots.insert(root);
                if unique_roots.len() > 1 {
                    debug!(
                        "Multiple top-level items found in {}, cannot infer single root.",
                        archive_path.display()
                    );
                    return Ok(None);
                }
            }
            None => continue,
            Some(other) => {
                debug!(
                    "Non-standard top-level component ({:?}) in {}, cannot infer single root.",
                    other,
                    archive_path.display()
                );
                return Ok(None);
            }
        }
    }

    if !saw_nested_entry {
        warn!(
            "Archive {} appears to be empty or contain only metadata.",
            archive_path.display()
        );
        return Ok(None);
    }
    debug!(
        "Inferred single root directory in {}: {:?}",
        archive_path.display(),
        first_root
    );
    Ok(first_root)
}

pub fn extract_archive(
    archive_path: &Path,
    target_dir: &Path,
    strip_components: usize,
    archive_type: &str,
) -> Result<()> {
    debug!(
        "Extracting archive '{}' (type: {}) to '{}' (strip_components={})",
        archive_path.display(),
        archive_type,
        target_dir.display(),
        strip_components
    );
    fs::create_dir_all(target_dir).map_err(|e| {
        GkegError::IoError(format!(
            "Failed to create target directory {}: {}",
            target_dir.display(),
            e
        ))
    })?;

    let mut archive = Archive::new(open_decoded(archive_path, archive_type)?);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    for entry_result in archive.entries()? {
        let mut entry = entry_result.map_err(|e| {
            GkegError::Generic(format!(
                "Error reading TAR entry from {}: {}",
                archive_path.display(),
                e
            ))
        })?;
        let original_path = entry.path()?.into_owned();

        let stripped: Vec<Component<'_>> = original_path
            .components()
            .filter(|c| *c != Component::CurDir)
            .skip(strip_components)
            .collect();
        if stripped.is_empty() {
            continue;
        }

        let mut target_path = target_dir.to_path_buf();
        for comp in stripped {
            match comp {
                Component::Normal(p) => target_path.push(p),
                _ => {
                    error!(
                        "Disallowed component {:?} in TAR path {} within {}",
                        comp,
                        original_path.display(),
                        archive_path.display()
                    );
                    return Err(GkegError::Generic(format!(
                        "Unsafe path component in {}",
                        original_path.display()
                    )));
                }
            }
        }

        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target_path).map_err(|e| {
            GkegError::Generic(format!(
                "Failed to unpack {} from {}: {}",
                original_path.display(),
                archive_path.display(),
                e
            ))
        })?;
    }

    debug!("Finished extraction of {}", archive_path.display());
    Ok(())
}
