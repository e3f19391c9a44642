//! Snapshot and drift actions for filewarden.
//!
//! Each action takes a [`Database`] and an [`Inventory`] produced by the
//! walker:
//!
//! - **count** - Tally tracked entries and walked objects
//! - **add** - Record unhashed entries for new paths (all-or-nothing)
//! - **hash** - Attach content digests to tracked files
//! - **verify** - Classify drift without touching the database
//! - **update** - Rewrite drifted entries and drop missing ones
//!
//! # Drift
//!
//! Every tracked path inside the scope is classified into exactly one
//! [`DriftKind`]. Content is only re-read for entries that already carry a
//! digest, so a database built by `add` alone detects size changes but
//! never reports `content_changed`.
//!
//! ```rust,no_run
//! use filewarden_audit::{verify, Database, TreeWalker, WardenConfig};
//!
//! let config = WardenConfig::new("/etc");
//! let db = Database::load("/var/lib/filewarden/etc.json").unwrap();
//! let inventory = TreeWalker::new().walk(&config).unwrap();
//!
//! let verdict = verify(&db, &inventory, &config).unwrap();
//! for finding in verdict.report.drifted() {
//!     println!("{finding}");
//! }
//! ```

mod count;
mod populate;
pub mod reconcile;
mod snapshot;
mod update;
mod verify;

pub use count::{CountReport, PathCounts, count};
pub use populate::{HashSummary, hash};
pub use reconcile::{Attribute, AttributeChange, Drift, DriftKind, DriftReport, Finding, reconcile};
pub use snapshot::{AddSummary, add};
pub use update::{UpdateSummary, update};
pub use verify::{Verdict, verify};

// Re-export the types every caller needs
pub use filewarden_core::{Database, DatabaseCounts, WardenConfig, WardenError};
pub use filewarden_scan::{Inventory, TreeWalker};
