// gkeg-core/src/build/patch.rs
use std::path::Path;

use gkeg_aio::checksum::sha256_bytes;
use gkeg_aio::fs::atomic_write_file;
use gkeg_common::error::{GkegError, Result};
use gkeg_common::model::PatchSpec;
use tracing::{debug, error, info};

use super::pipeline::CommandRunner;

/// Applies an embedded patch to `source_dir`.
///
/// The body must hash to the pinned checksum, and a dry run must succeed
/// before the tree is touched, so a patch either applies fully or not at all.
pub fn apply_patch<R: CommandRunner>(
    patch: &PatchSpec,
    source_dir: &Path,
    scratch_dir: &Path,
    runner: &mut R,
) -> Result<()> {
    let actual = sha256_bytes(patch.body.as_bytes());
    if !actual.eq_ignore_ascii_case(&patch.sha256) {
        error!("Patch '{}' does not match its pinned checksum", patch.name);
        return Err(GkegError::ChecksumMismatch(format!(
            "Checksum mismatch for patch '{}': expected {}, got {}",
            patch.name, patch.sha256, actual
        )));
    }

    let patch_file = scratch_dir.join(format!("{}.diff", patch.name));
    atomic_write_file(&patch_file, patch.body.as_bytes())?;
    debug!(
        "Patch '{}' touches {:?}",
        patch.name,
        patch.touched_files()
    );

    let strip = format!("-p{}", patch.strip);
    let file_arg = patch_file.display().to_string();
    let dry_run = vec![
        strip.clone(),
        "--dry-run".to_string(),
        "-i".to_string(),
        file_arg.clone(),
    ];
    let outcome = runner.run("patch", &dry_run, source_dir, None)?;
    if !outcome.success {
        error!("Dry run of patch '{}' failed", patch.name);
        return Err(GkegError::PatchFailed(patch.name.clone(), outcome.output));
    }

    info!("==> Applying patch {}", patch.name);
    let outcome = runner.run("patch", &[strip, "-i".to_string(), file_arg], source_dir, None)?;
    if !outcome.success {
        return Err(GkegError::PatchFailed(patch.name.clone(), outcome.output));
    }
    Ok(())
}
