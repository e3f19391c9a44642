//! The `hash` action: attach content digests to tracked files.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use filewarden_core::{Database, WardenConfig, WardenError};
use filewarden_scan::{ContentHasher, Inventory};

/// Result of a successful `hash`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HashSummary {
    /// Digests computed and stored.
    pub hashed: u64,
    /// How many of those replaced an earlier digest.
    pub rehashed: u64,
    /// Candidate files whose entry is recorded as a directory.
    pub skipped: u64,
}

/// Compute and store a digest for every candidate file.
///
/// Every candidate file must already be tracked; the first untracked one
/// fails the batch with [`WardenError::UntrackedPath`] before any file is
/// read. Existing digests are overwritten. Directory candidates are ignored,
/// and a candidate file still recorded as a directory is left for `verify`
/// to report. Hashing runs in parallel; results are written back serially
/// only once every file hashed successfully.
pub fn hash(
    db: &mut Database,
    inventory: &Inventory,
    config: &WardenConfig,
) -> Result<HashSummary, WardenError> {
    let mut summary = HashSummary::default();
    let mut targets: Vec<PathBuf> = Vec::new();

    for path in inventory.files() {
        match db.get(path) {
            None => {
                return Err(WardenError::UntrackedPath {
                    path: path.to_path_buf(),
                });
            }
            Some(entry) if entry.is_file() => targets.push(path.to_path_buf()),
            Some(_) => {
                debug!(path = %path.display(), "recorded as a directory, not hashing");
                summary.skipped += 1;
            }
        }
    }

    let hasher = ContentHasher::from_config(config);
    let digests = hasher.hash_files(&targets)?;

    for (path, digest) in targets.iter().zip(digests) {
        if let Some(entry) = db.get_mut(path) {
            if entry.hash().is_some() {
                summary.rehashed += 1;
            }
            entry.set_hash(digest);
            summary.hashed += 1;
        }
    }

    info!(
        hashed = summary.hashed,
        rehashed = summary.rehashed,
        algorithm = %hasher.algorithm(),
        "hash complete"
    );
    Ok(summary)
}
