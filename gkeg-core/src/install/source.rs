// gkeg-core/src/install/source.rs
//! Obtaining the source tree for a build.

use std::path::{Path, PathBuf};

use gkeg_aio::fs::{copy_entry_into, create_dir_all, list_directory_entries};
use gkeg_aio::{clone_repo, determine_archive_type, extract_archive, infer_archive_root_dir};
use gkeg_common::config::Config;
use gkeg_common::error::{GkegError, Result};
use gkeg_common::model::{Formula, SourceOrigin};
use tracing::{debug, info};

/// Produces the source tree for `origin` and returns its path.
///
/// Archives are extracted into `dest` once verified. Head builds are cloned
/// into `dest`. Local trees are copied into `dest` so patching and building
/// never touch the original.
pub async fn obtain_source(
    formula: &Formula,
    origin: &SourceOrigin,
    dest: &Path,
    config: &Config,
) -> Result<PathBuf> {
    match origin {
        SourceOrigin::Archive { url, sha256 } => {
            info!("==> Fetching {}", url);
            let archive = gkeg_net::fetch_source(&formula.name, url, sha256, config).await?;
            let archive_type = determine_archive_type(&archive)?;
            let strip = usize::from(infer_archive_root_dir(&archive, archive_type)?.is_some());
            debug!(
                "Extracting {} into {} (strip {})",
                archive.display(),
                dest.display(),
                strip
            );
            extract_archive(&archive, dest, strip, archive_type)?;
            Ok(dest.to_path_buf())
        }
        SourceOrigin::Head { repository } => {
            info!("==> Cloning {}", repository);
            let url = repository.clone();
            let target = dest.to_path_buf();
            tokio::task::spawn_blocking(move || clone_repo(&url, &target))
                .await
                .map_err(|e| GkegError::Generic(format!("Clone task failed: {e}")))??;
            Ok(dest.to_path_buf())
        }
        SourceOrigin::Local { path, .. } => {
            if !path.is_dir() {
                return Err(GkegError::NotFound(format!(
                    "Source directory {} does not exist",
                    path.display()
                )));
            }
            info!("==> Copying source tree {}", path.display());
            let from = path.clone();
            let target = dest.to_path_buf();
            let copied = tokio::task::spawn_blocking(move || copy_tree(&from, &target))
                .await
                .map_err(|e| GkegError::Generic(format!("Copy task failed: {e}")))??;
            debug!("Copied {} entries into {}", copied, dest.display());
            Ok(dest.to_path_buf())
        }
    }
}

/// Copies the contents of `src` into `dest`, keeping symlinks as links.
fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    create_dir_all(dest)?;
    let mut copied = 0;
    for entry in list_directory_entries(src)? {
        copied += copy_entry_into(&entry, dest)?;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[tokio::test]
    async fn archive_source_is_extracted_without_its_root() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("libguestfs-1.49.5.tar");
        {
            let mut builder = tar::Builder::new(fs::File::create(&archive).unwrap());
            let script = b"#!/bin/sh\n".as_slice();
            let mut header = tar::Header::new_gnu();
            header.set_size(script.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, "libguestfs-1.49.5/configure", script)
                .unwrap();
            builder.finish().unwrap();
        }
        let sha = gkeg_aio::sha256_file(&archive).unwrap();
        let mut formula = gkeg_common::formulary::libguestfs(Path::new("/usr/local"));
        formula.url = url_for(&archive);
        formula.sha256 = sha;

        let config = Config::with_root(dir.path().join("prefix"));
        let dest = dir.path().join("build/src");
        let src = obtain_source(&formula, &formula.stable_origin(), &dest, &config)
            .await
            .unwrap();
        assert_eq!(src, dest);
        assert!(dest.join("configure").is_file());
    }

    #[tokio::test]
    async fn local_tree_is_copied_and_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("libguestfs");
        fs::create_dir_all(tree.join("lib")).unwrap();
        fs::create_dir_all(tree.join(".git")).unwrap();
        fs::write(tree.join("configure.ac"), "AC_INIT\n").unwrap();
        fs::write(tree.join("lib/handle.c"), "int x;\n").unwrap();

        let formula = gkeg_common::formulary::libguestfs(Path::new("/usr/local"));
        let origin = SourceOrigin::local(&tree);
        let dest = dir.path().join("build/src");
        let src = obtain_source(&formula, &origin, &dest, &Config::with_root(dir.path()))
            .await
            .unwrap();

        assert_eq!(src, dest);
        assert!(dest.join(".git").is_dir());
        fs::write(dest.join("lib/handle.c"), "#include <errno.h>\nint x;\n").unwrap();
        assert_eq!(fs::read_to_string(tree.join("lib/handle.c")).unwrap(), "int x;\n");
    }

    #[tokio::test]
    async fn missing_local_tree_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let formula = gkeg_common::formulary::libguestfs(Path::new("/usr/local"));
        let origin = SourceOrigin::local(dir.path().join("nope"));
        let err = obtain_source(&formula, &origin, dir.path(), &Config::with_root(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, GkegError::NotFound(_)));
    }

    fn url_for(path: &Path) -> String {
        format!("file://{}", path.display())
    }
}
