//! IO operations for gkeg (filesystem, checksums, processes, archives, git)

pub mod checksum;
pub mod extract;
pub mod fs;
pub mod git2;
pub mod process;

pub use checksum::{sha256_bytes, sha256_file, verify_checksum};
pub use extract::{determine_archive_type, extract_archive, infer_archive_root_dir};
pub use git2::clone_repo;
pub use process::run_command;
