//! The `update` action: bring tracked entries in line with the filesystem.

use serde::Serialize;
use tracing::{debug, info};

use filewarden_core::{Database, WardenConfig, WardenError};
use filewarden_scan::Inventory;

use crate::reconcile::{DriftKind, DriftReport, reconcile};

/// Result of an `update`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSummary {
    /// Entries replaced with their current state.
    pub replaced: u64,
    /// Of those, entries whose digest was recomputed.
    pub rehashed: u64,
    /// Entries dropped because the path vanished or can no longer be tracked.
    pub removed: u64,
    /// Entries that already matched.
    pub unchanged: u64,
    /// Untracked paths left out of the database.
    pub untracked_ignored: u64,
    /// Classification the changes were derived from.
    pub report: DriftReport,
}

/// Reconcile, then rewrite every drifted tracked entry.
///
/// Changed entries are replaced by a fresh snapshot; entries that carried a
/// digest get the freshly computed one. Missing paths and paths that turned
/// into symlinks or special files are removed. Untracked paths are never
/// added. The database is only touched once reconciliation has finished.
pub fn update(
    db: &mut Database,
    inventory: &Inventory,
    config: &WardenConfig,
) -> Result<UpdateSummary, WardenError> {
    let report = reconcile(db, inventory, config)?;
    let mut summary = UpdateSummary::default();

    for finding in &report.findings {
        match finding.kind() {
            DriftKind::Unchanged => summary.unchanged += 1,
            DriftKind::Untracked => summary.untracked_ignored += 1,
            DriftKind::Missing => {
                debug!(path = %finding.path.display(), "removing missing entry");
                db.delete(&finding.path);
                summary.removed += 1;
            }
            DriftKind::MetadataChanged | DriftKind::ContentChanged | DriftKind::KindChanged => {
                match finding.refreshed() {
                    Some(entry) => {
                        debug!(
                            path = %finding.path.display(),
                            kind = %finding.kind(),
                            "replacing entry"
                        );
                        if entry.hash().is_some() {
                            summary.rehashed += 1;
                        }
                        db.put(&finding.path, entry.clone());
                        summary.replaced += 1;
                    }
                    None => {
                        debug!(path = %finding.path.display(), "no longer trackable, removing");
                        db.delete(&finding.path);
                        summary.removed += 1;
                    }
                }
            }
        }
    }

    info!(
        replaced = summary.replaced,
        removed = summary.removed,
        unchanged = summary.unchanged,
        "update complete"
    );
    summary.report = report;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filewarden_core::{Attributes, ContentHash, Entry};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_update_removes_missing_and_keeps_untracked_out() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::write(root.join("new"), "x").unwrap();

        let gone = root.join("gone");
        let mut db = Database::new();
        db.put(&gone, Entry::file(Attributes::new(0, 0, 0o644), 1));

        let inventory = Inventory::from_lists(&root, vec![root.join("new")], Vec::new());
        let summary = update(&mut db, &inventory, &WardenConfig::new(&root)).unwrap();

        assert_eq!(summary.removed, 1);
        assert_eq!(summary.untracked_ignored, 1);
        assert!(db.is_empty());
    }

    #[test]
    fn test_update_rehashes_hashed_entries() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let file = root.join("a");
        fs::write(&file, "hello").unwrap();

        let mut db = Database::new();
        let stale = filewarden_scan::snapshot_entry(&file)
            .unwrap()
            .with_hash(ContentHash::new([7; 32]));
        db.put(&file, stale);

        let inventory = Inventory::from_lists(&root, vec![file.clone()], Vec::new());
        let summary = update(&mut db, &inventory, &WardenConfig::new(&root)).unwrap();

        assert_eq!(summary.replaced, 1);
        assert_eq!(summary.rehashed, 1);
        assert_eq!(
            db.get(&file).unwrap().hash().unwrap().to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
