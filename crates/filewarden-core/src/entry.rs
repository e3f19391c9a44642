//! Tracked entry types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use crate::error::WardenError;

/// 256-bit content digest (SHA-256 or BLAKE3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex string (either case).
    pub fn from_hex(hex: &str) -> Result<Self, WardenError> {
        let hex = hex.trim();
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(WardenError::invalid_entry(format!(
                "hash must be 64 hex digits, got {hex:?}"
            )));
        }

        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| {
                WardenError::invalid_entry(format!("hash contains non-hex digits: {hex:?}"))
            })?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex.parse().map_err(serde::de::Error::custom)
    }
}

/// Type of a tracked filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum EntryKind {
    /// Regular file.
    #[serde(rename = "f")]
    #[strum(to_string = "file", serialize = "f")]
    File,
    /// Directory.
    #[serde(rename = "d")]
    #[strum(to_string = "directory", serialize = "d")]
    Directory,
}

impl EntryKind {
    /// Single-letter tag used in the persisted database.
    pub fn tag(&self) -> &'static str {
        match self {
            EntryKind::File => "f",
            EntryKind::Directory => "d",
        }
    }
}

/// Ownership and permission bits shared by every entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attributes {
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// Permission bits, including setuid/setgid/sticky (`S_IMODE`).
    pub mode: u32,
}

impl Attributes {
    /// Create new attributes.
    pub fn new(uid: u32, gid: u32, mode: u32) -> Self {
        Self { uid, gid, mode }
    }
}

/// Recorded metadata snapshot of one tracked object.
///
/// The variant decides which fields exist: directories never carry a size
/// or a content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub enum Entry {
    /// Regular file.
    File {
        attributes: Attributes,
        /// Length in bytes.
        size: u64,
        /// Content digest, absent until hashed.
        hash: Option<ContentHash>,
    },
    /// Directory.
    Directory { attributes: Attributes },
}

impl Entry {
    /// Create an unhashed file entry.
    pub fn file(attributes: Attributes, size: u64) -> Self {
        Self::File {
            attributes,
            size,
            hash: None,
        }
    }

    /// Create a directory entry.
    pub fn directory(attributes: Attributes) -> Self {
        Self::Directory { attributes }
    }

    /// Get the kind of this entry.
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::File { .. } => EntryKind::File,
            Entry::Directory { .. } => EntryKind::Directory,
        }
    }

    /// Check if this is a file entry.
    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File { .. })
    }

    /// Check if this is a directory entry.
    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory { .. })
    }

    /// Ownership and permission bits.
    pub fn attributes(&self) -> &Attributes {
        match self {
            Entry::File { attributes, .. } | Entry::Directory { attributes } => attributes,
        }
    }

    /// Recorded size (files only).
    pub fn size(&self) -> Option<u64> {
        match self {
            Entry::File { size, .. } => Some(*size),
            Entry::Directory { .. } => None,
        }
    }

    /// Recorded content hash (hashed files only).
    pub fn hash(&self) -> Option<&ContentHash> {
        match self {
            Entry::File { hash, .. } => hash.as_ref(),
            Entry::Directory { .. } => None,
        }
    }

    /// Attach a content hash. Returns `false` (and does nothing) for directories.
    pub fn set_hash(&mut self, digest: ContentHash) -> bool {
        match self {
            Entry::File { hash, .. } => {
                *hash = Some(digest);
                true
            }
            Entry::Directory { .. } => false,
        }
    }

    /// Builder-style variant of [`Entry::set_hash`].
    pub fn with_hash(mut self, digest: ContentHash) -> Self {
        self.set_hash(digest);
        self
    }
}

/// Persisted shape of an entry: `{"type": "f", "uid": .., "gid": .., "mode": .., "size": .., "hash": ..}`.
#[derive(Serialize, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: EntryKind,
    uid: u32,
    gid: u32,
    #[serde(deserialize_with = "deserialize_mode")]
    mode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash: Option<ContentHash>,
}

impl TryFrom<RawEntry> for Entry {
    type Error = WardenError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let attributes = Attributes::new(raw.uid, raw.gid, raw.mode);
        match raw.kind {
            EntryKind::File => {
                let size = raw
                    .size
                    .ok_or_else(|| WardenError::invalid_entry("file entry without size"))?;
                Ok(Entry::File {
                    attributes,
                    size,
                    hash: raw.hash,
                })
            }
            EntryKind::Directory => {
                if raw.size.is_some() || raw.hash.is_some() {
                    return Err(WardenError::invalid_entry(
                        "directory entry carries size or hash",
                    ));
                }
                Ok(Entry::Directory { attributes })
            }
        }
    }
}

impl From<Entry> for RawEntry {
    fn from(entry: Entry) -> Self {
        let kind = entry.kind();
        match entry {
            Entry::File {
                attributes,
                size,
                hash,
            } => RawEntry {
                kind,
                uid: attributes.uid,
                gid: attributes.gid,
                mode: attributes.mode,
                size: Some(size),
                hash,
            },
            Entry::Directory { attributes } => RawEntry {
                kind,
                uid: attributes.uid,
                gid: attributes.gid,
                mode: attributes.mode,
                size: None,
                hash: None,
            },
        }
    }
}

/// Accept `mode` as a number (`420`) or an octal string (`"0o644"`, `"0644"`).
fn deserialize_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ModeRepr {
        Number(u32),
        Text(String),
    }

    match ModeRepr::deserialize(deserializer)? {
        ModeRepr::Number(mode) => Ok(mode),
        ModeRepr::Text(text) => parse_octal_mode(&text).map_err(serde::de::Error::custom),
    }
}

/// Parse an octal permission string.
pub fn parse_octal_mode(text: &str) -> Result<u32, WardenError> {
    let digits = text.trim();
    let digits = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
        .unwrap_or(digits);
    u32::from_str_radix(digits, 8)
        .map_err(|_| WardenError::invalid_entry(format!("invalid octal mode {text:?}")))
}
