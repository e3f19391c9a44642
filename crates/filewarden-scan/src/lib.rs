//! Filesystem access for filewarden.
//!
//! This crate is the boundary between the snapshot engine and the host
//! filesystem:
//!
//! - **Enumeration** via jwalk ([`TreeWalker`] producing an [`Inventory`])
//! - **Classification and metadata** via [`probe`] (never follows symlinks)
//! - **Content hashing** via [`ContentHasher`] (streaming SHA-256 or BLAKE3)
//!
//! # Example
//!
//! ```rust,no_run
//! use filewarden_scan::{ContentHasher, TreeWalker, WardenConfig};
//!
//! let config = WardenConfig::new("/etc");
//! let inventory = TreeWalker::new().walk(&config).unwrap();
//! println!("{} files, {} directories", inventory.file_count(), inventory.dir_count());
//!
//! let hasher = ContentHasher::from_config(&config);
//! for path in inventory.files().take(3) {
//!     println!("{} {}", hasher.hash_file(path).unwrap(), path.display());
//! }
//! ```

mod hasher;
mod pool;
mod probe;
mod walker;

pub use hasher::ContentHasher;
pub use pool::run_in_pool;
pub use probe::{Observed, ObservedKind, probe, snapshot_entry};
pub use walker::{Inventory, InventoryItem, TreeWalker};

/// Read buffer size used for hashing unless configured otherwise.
pub const BUFFER_SIZE: usize = filewarden_core::DEFAULT_BUFFER_SIZE;

// Re-export core types for convenience
pub use filewarden_core::{
    Attributes, ContentHash, Database, Entry, EntryKind, HashAlgorithm, WardenConfig, WardenError,
};
