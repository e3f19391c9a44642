//! Path classification and metadata access.

use std::fs::Metadata;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use filewarden_core::{Attributes, Entry, EntryKind, WardenError};

/// What a path currently is on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservedKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symlink, socket, device or fifo. Never tracked.
    Other,
}

impl ObservedKind {
    /// The trackable kind, if any.
    pub fn entry_kind(&self) -> Option<EntryKind> {
        match self {
            ObservedKind::File => Some(EntryKind::File),
            ObservedKind::Directory => Some(EntryKind::Directory),
            ObservedKind::Other => None,
        }
    }
}

impl std::fmt::Display for ObservedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
            Self::Other => write!(f, "special file"),
        }
    }
}

/// Current on-disk state of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed {
    /// What the path is.
    pub kind: ObservedKind,
    /// Ownership and permission bits.
    pub attributes: Attributes,
    /// Byte length (meaningful for files).
    pub size: u64,
}

impl Observed {
    /// Build an unhashed entry from this observation.
    ///
    /// Returns `None` for paths that cannot be tracked.
    pub fn to_entry(&self) -> Option<Entry> {
        match self.kind {
            ObservedKind::File => Some(Entry::file(self.attributes, self.size)),
            ObservedKind::Directory => Some(Entry::directory(self.attributes)),
            ObservedKind::Other => None,
        }
    }

    fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        let kind = if file_type.is_file() {
            ObservedKind::File
        } else if file_type.is_dir() {
            ObservedKind::Directory
        } else {
            ObservedKind::Other
        };

        Self {
            kind,
            attributes: Attributes::new(get_uid(metadata), get_gid(metadata), get_mode(metadata)),
            size: if kind == ObservedKind::File {
                metadata.len()
            } else {
                0
            },
        }
    }
}

/// Read the current state of `path` without following symlinks.
///
/// Returns `Ok(None)` when nothing exists at the path.
pub fn probe(path: &Path) -> Result<Option<Observed>, WardenError> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) => Ok(Some(Observed::from_metadata(&metadata))),
        // A parent that turned into a file also means nothing is here
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
        {
            Ok(None)
        }
        Err(err) => Err(WardenError::io(path, err)),
    }
}

/// Read the current state of a path that is expected to exist and be trackable.
pub fn snapshot_entry(path: &Path) -> Result<Entry, WardenError> {
    let observed = probe(path)?.ok_or_else(|| WardenError::NotFound {
        path: path.to_path_buf(),
    })?;
    observed.to_entry().ok_or_else(|| {
        WardenError::invalid_entry(format!(
            "{} is a {}, only files and directories can be tracked",
            path.display(),
            observed.kind
        ))
    })
}

// Cross-platform metadata helpers

#[cfg(unix)]
fn get_uid(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.uid()
}

#[cfg(not(unix))]
fn get_uid(_metadata: &Metadata) -> u32 {
    0
}

#[cfg(unix)]
fn get_gid(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.gid()
}

#[cfg(not(unix))]
fn get_gid(_metadata: &Metadata) -> u32 {
    0
}

/// Permission bits with the file type stripped (`S_IMODE`).
#[cfg(unix)]
fn get_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn get_mode(metadata: &Metadata) -> u32 {
    // Approximate POSIX bits from the read-only flag
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_probe_file_and_dir() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "hello").unwrap();

        let observed = probe(&file).unwrap().unwrap();
        assert_eq!(observed.kind, ObservedKind::File);
        assert_eq!(observed.size, 5);
        assert!(observed.to_entry().unwrap().is_file());

        let observed = probe(temp.path()).unwrap().unwrap();
        assert_eq!(observed.kind, ObservedKind::Directory);
        assert_eq!(observed.size, 0);
        assert!(observed.to_entry().unwrap().is_dir());
    }

    #[test]
    fn test_probe_missing() {
        let temp = TempDir::new().unwrap();
        assert!(probe(&temp.path().join("nope")).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_reads_mode_bits() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("script.sh");
        fs::write(&file, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o750)).unwrap();

        let observed = probe(&file).unwrap().unwrap();
        assert_eq!(observed.attributes.mode, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_other() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        let link = temp.path().join("link");
        fs::write(&target, "x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let observed = probe(&link).unwrap().unwrap();
        assert_eq!(observed.kind, ObservedKind::Other);
        assert!(observed.to_entry().is_none());
        assert!(snapshot_entry(&link).is_err());
    }
}
