//! The snapshot database: an ordered, path-keyed map of entries.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::Entry;
use crate::error::WardenError;

/// Number of tracked files, directories and bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCounts {
    /// Number of file entries.
    pub files: u64,
    /// Number of directory entries.
    pub directories: u64,
    /// Sum of recorded file sizes.
    pub bytes: u64,
}

/// Flat mapping from absolute path to recorded [`Entry`].
///
/// Hierarchy is implicit in the keys; subtree queries use component-wise
/// prefix matching. Insertion order is kept so a loaded database is written
/// back in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    entries: IndexMap<PathBuf, Entry>,
}

impl Database {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a database from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WardenError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| WardenError::io(path, e))?;
        let db = Self::from_json(&text, path)?;
        debug!(path = %path.display(), entries = db.len(), "loaded database");
        Ok(db)
    }

    /// Load a database, or start an empty one if the file does not exist yet.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, WardenError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "database file absent, starting empty");
            Ok(Self::new())
        }
    }

    /// Parse a database from JSON text. `origin` is only used for error context.
    pub fn from_json(text: &str, origin: impl Into<PathBuf>) -> Result<Self, WardenError> {
        let origin = origin.into();
        let db: Self = serde_json::from_str(text).map_err(|source| WardenError::Database {
            path: origin.clone(),
            source,
        })?;

        if let Some(relative) = db.entries.keys().find(|p| !p.is_absolute()) {
            return Err(WardenError::invalid_entry(format!(
                "{}: key is not an absolute path: {}",
                origin.display(),
                relative.display()
            )));
        }
        Ok(db)
    }

    /// Serialize to JSON with 4-space indentation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only ever emits valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the database to `path`.
    ///
    /// Writes to a sibling temp file first and renames it over the target,
    /// so an interrupted save never leaves a truncated database. An existing
    /// target keeps its permissions; the temp file is removed if any step
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WardenError> {
        let path = path.as_ref();
        let json = self.to_json().map_err(|source| WardenError::Database {
            path: path.to_path_buf(),
            source,
        })?;

        let temp_name = format!(
            ".{}.{}.tmp",
            path.file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default(),
            std::process::id()
        );
        let temp_path = path.with_file_name(temp_name);

        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| WardenError::io(&temp_path, e))?;
        let written = temp_file
            .write_all(json.as_bytes())
            .and_then(|_| temp_file.sync_all())
            .and_then(|_| keep_permissions(path, &temp_path));
        drop(temp_file);

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(WardenError::io(&temp_path, e));
        }
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(WardenError::io(path, e));
        }
        debug!(path = %path.display(), entries = self.len(), "saved database");
        Ok(())
    }

    /// Get the entry recorded for `path`.
    pub fn get(&self, path: &Path) -> Option<&Entry> {
        self.entries.get(path)
    }

    /// Get a mutable reference to the entry recorded for `path`.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Entry> {
        self.entries.get_mut(path)
    }

    /// Insert or replace an entry. A replaced entry keeps its position.
    pub fn put(&mut self, path: impl Into<PathBuf>, entry: Entry) -> Option<Entry> {
        let path = path.into();
        debug_assert!(path.is_absolute(), "database keys must be absolute");
        self.entries.insert(path, entry)
    }

    /// Remove an entry, preserving the order of the remaining ones.
    pub fn delete(&mut self, path: &Path) -> Option<Entry> {
        self.entries.shift_remove(path)
    }

    /// Check if `path` is tracked.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Entry)> {
        self.entries.iter().map(|(p, e)| (p.as_path(), e))
    }

    /// Iterate over entries at or below `root`.
    pub fn in_scope<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = (&'a Path, &'a Entry)> {
        self.iter().filter(move |(path, _)| path.starts_with(root))
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count files, directories and recorded bytes.
    pub fn counts(&self) -> DatabaseCounts {
        self.entries
            .values()
            .fold(DatabaseCounts::default(), |mut counts, entry| {
                match entry {
                    Entry::File { size, .. } => {
                        counts.files += 1;
                        counts.bytes += size;
                    }
                    Entry::Directory { .. } => counts.directories += 1,
                }
                counts
            })
    }

    /// Reorder entries by path. Used to get a canonical order for comparisons.
    pub fn sort_by_path(&mut self) {
        self.entries.sort_keys();
    }
}

/// Give `temp` the permissions of an existing `target`.
fn keep_permissions(target: &Path, temp: &Path) -> std::io::Result<()> {
    match fs::metadata(target) {
        Ok(metadata) => fs::set_permissions(temp, metadata.permissions()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

impl<'a> IntoIterator for &'a Database {
    type Item = (&'a Path, &'a Entry);
    type IntoIter = Box<dyn Iterator<Item = (&'a Path, &'a Entry)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
