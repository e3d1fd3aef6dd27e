/*
File: gkeg-aio/src/git2.rs
Purpose: Synchronous Git operations using git2.
*/
use std::path::Path;

use git2::build::RepoBuilder;
use git2::FetchOptions;
use gkeg_common::error::{GkegError, Result};
use tracing::{debug, error};

/// Clones `url` into `dest` for a head build, shallow when the transport
/// allows it. Submodules are left alone; the build pipeline initializes them
/// as its own step.
/// Contains blocking network and filesystem I/O.
pub fn clone_repo(url: &str, dest: &Path) -> Result<()> {
    debug!("Cloning {} into {}", url, dest.display());

    let mut fetch_options = FetchOptions::new();
    // libgit2's local transport rejects shallow fetches.
    if is_remote_url(url) {
        fetch_options.depth(1);
    }

    RepoBuilder::new()
        .fetch_options(fetch_options)
        .clone(url, dest)
        .map_err(|e| {
            error!("Failed clone {} into {}: {}", url, dest.display(), e);
            GkegError::DownloadError(
                dest.file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default(),
                url.to_string(),
                format!("git clone failed: {e}"),
            )
        })?;

    debug!("Clone complete for {}", dest.display());
    Ok(())
}

/// True for URLs fetched over a network transport; `file://` and plain paths are local.
fn is_remote_url(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => !scheme.eq_ignore_ascii_case("file"),
        None => url.contains('@') && url.contains(':') && !url.starts_with('/'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_urls_get_a_shallow_clone() {
        assert!(is_remote_url("https://github.com/libguestfs/libguestfs.git"));
        assert!(is_remote_url("git@github.com:libguestfs/libguestfs.git"));
        assert!(!is_remote_url("file:///srv/git/libguestfs"));
        assert!(!is_remote_url("FILE:///srv/git/libguestfs"));
        assert!(!is_remote_url("/srv/git/libguestfs"));
        assert!(!is_remote_url("../libguestfs"));
    }

    #[test]
    fn clones_a_local_repository() {
        let dir = tempfile::tempdir().unwrap();
        let origin = dir.path().join("origin");
        let repo = git2::Repository::init(&origin).unwrap();
        std::fs::write(origin.join("configure.ac"), "AC_INIT\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("configure.ac")).unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("gkeg", "gkeg@example.invalid").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .unwrap();

        let dest = dir.path().join("checkout");
        let url = format!("file://{}", origin.display());
        clone_repo(&url, &dest).unwrap();
        assert!(dest.join(".git").exists());
        assert!(dest.join("configure.ac").is_file());

        let plain = dir.path().join("plain-checkout");
        clone_repo(origin.to_str().unwrap(), &plain).unwrap();
        assert!(plain.join("configure.ac").is_file());
    }
}
