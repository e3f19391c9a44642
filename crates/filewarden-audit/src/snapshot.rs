//! The `add` action: record new files and directories.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use filewarden_core::{Database, DatabaseCounts, Entry, WardenError};
use filewarden_scan::{Inventory, snapshot_entry};

/// Result of a successful `add`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddSummary {
    /// File entries inserted.
    pub files_added: u64,
    /// Directory entries inserted.
    pub directories_added: u64,
    /// Database totals after insertion.
    pub totals: DatabaseCounts,
}

/// Insert one unhashed entry per candidate.
///
/// All-or-nothing: every candidate is checked against the database and every
/// entry is built before the first insert, so a conflict or an unreadable
/// path leaves the database untouched. The first conflicting path is named
/// in [`WardenError::AlreadyTracked`]; all conflicts are logged. Paths that
/// are not valid UTF-8 cannot be stored and fail with
/// [`WardenError::NonUtf8Path`].
pub fn add(db: &mut Database, inventory: &Inventory) -> Result<AddSummary, WardenError> {
    let mut seen: HashSet<&Path> = HashSet::with_capacity(inventory.len());
    let conflicts: Vec<&Path> = inventory
        .items()
        .iter()
        .map(|item| item.path.as_path())
        .filter(|path| db.contains(path) || !seen.insert(*path))
        .collect();

    if let Some(first) = conflicts.first() {
        for path in &conflicts {
            warn!(path = %path.display(), "already in database");
        }
        return Err(WardenError::AlreadyTracked {
            path: first.to_path_buf(),
        });
    }

    for item in inventory.items() {
        WardenError::require_utf8(&item.path)?;
    }

    let entries = inventory
        .items()
        .iter()
        .map(|item| snapshot_entry(&item.path).map(|entry| (item.path.as_path(), entry)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut summary = AddSummary::default();
    for (path, entry) in entries {
        debug!(path = %path.display(), kind = %entry.kind(), "adding");
        match entry {
            Entry::File { .. } => summary.files_added += 1,
            Entry::Directory { .. } => summary.directories_added += 1,
        }
        db.put(path, entry);
    }
    summary.totals = db.counts();

    info!(
        files = summary.files_added,
        directories = summary.directories_added,
        "add complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filewarden_core::Attributes;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_add_leaves_hash_absent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::write(root.join("a"), "abc").unwrap();

        let inventory = Inventory::from_lists(&root, vec![root.join("a")], vec![root.clone()]);
        let mut db = Database::new();
        let summary = add(&mut db, &inventory).unwrap();

        assert_eq!(summary.files_added, 1);
        assert_eq!(summary.directories_added, 1);
        let entry = db.get(&root.join("a")).unwrap();
        assert_eq!(entry.size(), Some(3));
        assert!(entry.hash().is_none());
    }

    #[test]
    fn test_conflict_leaves_database_untouched() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::write(root.join("a"), "abc").unwrap();
        fs::write(root.join("b"), "def").unwrap();

        let mut db = Database::new();
        db.put(root.join("b"), Entry::file(Attributes::new(0, 0, 0o644), 99));
        let before = db.clone();

        let inventory = Inventory::from_lists(
            &root,
            vec![root.join("a"), root.join("b")],
            vec![root.clone()],
        );
        let err = add(&mut db, &inventory).unwrap_err();

        match err {
            WardenError::AlreadyTracked { path } => assert_eq!(path, root.join("b")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(db, before);
    }

    #[test]
    fn test_unreadable_candidate_leaves_database_untouched() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::write(root.join("a"), "abc").unwrap();

        let inventory = Inventory::from_lists(
            &root,
            vec![root.join("a"), root.join("vanished")],
            Vec::<PathBuf>::new(),
        );
        let mut db = Database::new();
        assert!(add(&mut db, &inventory).is_err());
        assert!(db.is_empty());
    }

    #[test]
    fn test_duplicate_candidates_conflict() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::write(root.join("a"), "abc").unwrap();

        let inventory =
            Inventory::from_lists(&root, vec![root.join("a"), root.join("a")], Vec::new());
        let mut db = Database::new();
        assert!(matches!(
            add(&mut db, &inventory),
            Err(WardenError::AlreadyTracked { .. })
        ));
        assert!(db.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_candidate_leaves_database_untouched() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let bad = root.join(OsStr::from_bytes(b"bad\xff.txt"));
        fs::write(root.join("a"), "abc").unwrap();

        let inventory = Inventory::from_lists(&root, vec![root.join("a"), bad], Vec::new());
        let mut db = Database::new();
        assert!(matches!(
            add(&mut db, &inventory),
            Err(WardenError::NonUtf8Path { .. })
        ));
        assert!(db.is_empty());
    }
}
