//! JWalk-based directory enumeration.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jwalk::{Parallelism, WalkDir};
use tracing::{debug, trace};

use filewarden_core::{EntryKind, WardenConfig, WardenError};

/// One trackable object found by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    /// Absolute path.
    pub path: PathBuf,
    /// File or directory.
    pub kind: EntryKind,
}

/// Candidate set for a batch operation: every regular file and directory
/// at or below a root, in walk order.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    root: PathBuf,
    items: Vec<InventoryItem>,
    skipped: u64,
}

impl Inventory {
    /// Build an inventory from explicit file and directory lists.
    ///
    /// Files come first, then directories. `root` bounds the reconciliation
    /// scope.
    pub fn from_lists(
        root: impl Into<PathBuf>,
        files: impl IntoIterator<Item = PathBuf>,
        directories: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        let files = files.into_iter().map(|path| InventoryItem {
            path,
            kind: EntryKind::File,
        });
        let directories = directories.into_iter().map(|path| InventoryItem {
            path,
            kind: EntryKind::Directory,
        });
        Self {
            root: root.into(),
            items: files.chain(directories).collect(),
            skipped: 0,
        }
    }

    /// Root of the scanned scope.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All items in walk order.
    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    /// Regular files in walk order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.paths_of(EntryKind::File)
    }

    /// Directories in walk order.
    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.paths_of(EntryKind::Directory)
    }

    fn paths_of(&self, kind: EntryKind) -> impl Iterator<Item = &Path> {
        self.items
            .iter()
            .filter(move |item| item.kind == kind)
            .map(|item| item.path.as_path())
    }

    /// Number of regular files.
    pub fn file_count(&self) -> u64 {
        self.files().count() as u64
    }

    /// Number of directories.
    pub fn dir_count(&self) -> u64 {
        self.directories().count() as u64
    }

    /// Number of symlinks and special files that were left out.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing was found.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Enumerates trackable objects under a root using jwalk.
///
/// Symlinks are never followed and, like special files, never reported.
#[derive(Debug, Default)]
pub struct TreeWalker;

impl TreeWalker {
    /// Create a new walker.
    pub fn new() -> Self {
        Self
    }

    /// Enumerate `config.root`.
    ///
    /// The root is normalized to an absolute path. A file root yields a
    /// single-file inventory; a directory root yields itself followed by
    /// everything below it, sorted by name at each level.
    pub fn walk(&self, config: &WardenConfig) -> Result<Inventory, WardenError> {
        let start = Instant::now();
        let root = config
            .root
            .canonicalize()
            .map_err(|e| WardenError::io(&config.root, e))?;
        let metadata = std::fs::metadata(&root).map_err(|e| WardenError::io(&root, e))?;

        if metadata.is_file() {
            debug!(root = %root.display(), "single file inventory");
            return Ok(Inventory {
                items: vec![InventoryItem {
                    path: root.clone(),
                    kind: EntryKind::File,
                }],
                root,
                skipped: 0,
            });
        }
        if !metadata.is_dir() {
            return Err(WardenError::InvalidConfig {
                message: format!("{} is not a valid file or directory", root.display()),
            });
        }

        let parallelism = match config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(&root)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(0);

        let mut items = Vec::new();
        let mut skipped = 0;

        for entry_result in walker {
            let entry = entry_result.map_err(|err| WardenError::Walk {
                path: err
                    .path()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| root.clone()),
                message: err.to_string(),
            })?;

            let file_type = entry.file_type();
            let path = entry.path();

            if file_type.is_dir() || file_type.is_file() {
                WardenError::require_utf8(&path)?;
            }

            if file_type.is_dir() {
                items.push(InventoryItem {
                    path,
                    kind: EntryKind::Directory,
                });
            } else if file_type.is_file() {
                items.push(InventoryItem {
                    path,
                    kind: EntryKind::File,
                });
            } else {
                trace!(path = %path.display(), "skipping symlink or special file");
                skipped += 1;
            }
        }

        let inventory = Inventory {
            root,
            items,
            skipped,
        };
        debug!(
            root = %inventory.root.display(),
            files = inventory.file_count(),
            directories = inventory.dir_count(),
            skipped,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "walk complete"
        );
        Ok(inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/.hidden"), "still tracked").unwrap();

        temp
    }

    #[test]
    fn test_walk_counts() {
        let temp = create_test_tree();
        let inventory = TreeWalker::new()
            .walk(&WardenConfig::new(temp.path()))
            .unwrap();

        assert_eq!(inventory.file_count(), 4);
        // root + dir1 + dir2 + subdir
        assert_eq!(inventory.dir_count(), 4);
        assert!(inventory.items().iter().all(|i| i.path.is_absolute()));
    }

    #[test]
    fn test_root_comes_first() {
        let temp = create_test_tree();
        let inventory = TreeWalker::new()
            .walk(&WardenConfig::new(temp.path()))
            .unwrap();

        let first = &inventory.items()[0];
        assert_eq!(first.path, temp.path().canonicalize().unwrap());
        assert_eq!(first.kind, EntryKind::Directory);
        assert_eq!(inventory.root(), first.path.as_path());
    }

    #[test]
    fn test_walk_is_deterministic() {
        let temp = create_test_tree();
        let serial = WardenConfig::builder()
            .root(temp.path())
            .threads(1usize)
            .build()
            .unwrap();
        let a = TreeWalker::new().walk(&serial).unwrap();
        let b = TreeWalker::new()
            .walk(&WardenConfig::new(temp.path()))
            .unwrap();
        assert_eq!(a.items(), b.items());
    }

    #[test]
    fn test_single_file_root() {
        let temp = create_test_tree();
        let inventory = TreeWalker::new()
            .walk(&WardenConfig::new(temp.path().join("file1.txt")))
            .unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.file_count(), 1);
        assert_eq!(inventory.dir_count(), 0);
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let err = TreeWalker::new()
            .walk(&WardenConfig::new(temp.path().join("nope")))
            .unwrap_err();
        assert!(matches!(err, WardenError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(
            temp.path().join("file1.txt"),
            temp.path().join("link.txt"),
        )
        .unwrap();
        std::os::unix::fs::symlink(temp.path().join("dir1"), temp.path().join("link_dir"))
            .unwrap();

        let inventory = TreeWalker::new()
            .walk(&WardenConfig::new(temp.path()))
            .unwrap();
        assert_eq!(inventory.file_count(), 4);
        assert_eq!(inventory.dir_count(), 4);
        assert_eq!(inventory.skipped(), 2);
    }

    #[test]
    fn test_from_lists_order() {
        let inventory = Inventory::from_lists(
            "/r",
            vec![PathBuf::from("/r/a")],
            vec![PathBuf::from("/r")],
        );
        assert_eq!(inventory.items()[0].kind, EntryKind::File);
        assert_eq!(inventory.directories().collect::<Vec<_>>(), vec![Path::new("/r")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_fails_walk() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"bad\xff.txt");
        // some filesystems refuse such names outright
        if fs::write(temp.path().join(name), "x").is_err() {
            return;
        }

        let err = TreeWalker::new()
            .walk(&WardenConfig::new(temp.path()))
            .unwrap_err();
        match err {
            WardenError::NonUtf8Path { path } => assert_eq!(path.file_name(), Some(name)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
