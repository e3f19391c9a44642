//! The `count` action.

use std::fmt;

use serde::Serialize;

use filewarden_core::{Database, DatabaseCounts};
use filewarden_scan::Inventory;

/// Files and directories found under a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathCounts {
    /// Number of regular files.
    pub files: u64,
    /// Number of directories, the root included.
    pub directories: u64,
}

/// Counts for the database and/or the scanned path, whichever were given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountReport {
    /// Counts of the tracked entries.
    pub database: Option<DatabaseCounts>,
    /// Counts of the candidate set.
    pub path: Option<PathCounts>,
}

/// Count tracked entries and/or walked objects. Never fails.
pub fn count(database: Option<&Database>, inventory: Option<&Inventory>) -> CountReport {
    CountReport {
        database: database.map(Database::counts),
        path: inventory.map(|inv| PathCounts {
            files: inv.file_count(),
            directories: inv.dir_count(),
        }),
    }
}

impl fmt::Display for CountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(db) = &self.database {
            writeln!(
                f,
                "database contains {} files and {} directories",
                db.files, db.directories
            )?;
        }
        if let Some(path) = &self.path {
            writeln!(
                f,
                "path contains {} files and {} directories",
                path.files, path.directories
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filewarden_core::{Attributes, Entry};
    use std::path::PathBuf;

    #[test]
    fn test_count_both() {
        let mut db = Database::new();
        db.put("/a", Entry::directory(Attributes::new(0, 0, 0o755)));
        db.put("/a/b", Entry::file(Attributes::new(0, 0, 0o644), 3));

        let inventory = Inventory::from_lists(
            "/a",
            vec![PathBuf::from("/a/b"), PathBuf::from("/a/c")],
            vec![PathBuf::from("/a")],
        );

        let report = count(Some(&db), Some(&inventory));
        assert_eq!(report.database.unwrap().files, 1);
        assert_eq!(report.database.unwrap().bytes, 3);
        assert_eq!(
            report.path,
            Some(PathCounts {
                files: 2,
                directories: 1
            })
        );

        let text = report.to_string();
        assert!(text.contains("database contains 1 files and 1 directories"));
        assert!(text.contains("path contains 2 files and 1 directories"));
    }

    #[test]
    fn test_count_nothing() {
        let report = count(None, None);
        assert_eq!(report, CountReport::default());
        assert!(report.to_string().is_empty());
    }
}
