//! Drift detection between the database and the filesystem.
//!
//! Every tracked path inside the scanned scope is probed directly, so a
//! tracked path that became a symlink shows up as a kind change rather than
//! disappearing. Paths the walker found that have no entry are reported as
//! untracked. Classification is read-only; `verify` and `update` decide what
//! to do with the result.

use std::fmt;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::{debug, trace};

use filewarden_core::{ContentHash, Database, Entry, EntryKind, WardenConfig, WardenError};
use filewarden_scan::{ContentHasher, Inventory, Observed, ObservedKind, probe, run_in_pool};

/// A metadata field compared during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Attribute {
    Uid,
    Gid,
    Mode,
    Size,
}

/// One differing metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeChange {
    pub attribute: Attribute,
    pub previous: u64,
    pub current: u64,
}

impl AttributeChange {
    fn new(attribute: Attribute, previous: impl Into<u64>, current: impl Into<u64>) -> Self {
        Self {
            attribute,
            previous: previous.into(),
            current: current.into(),
        }
    }
}

impl fmt::Display for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attribute {
            Attribute::Mode => write!(
                f,
                "mode changed from {:#o} to {:#o}",
                self.previous, self.current
            ),
            attribute => write!(
                f,
                "{attribute} changed from {} to {}",
                self.previous, self.current
            ),
        }
    }
}

/// Drift category of one path, with its details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Drift {
    /// Metadata and, if recorded, content match.
    Unchanged,
    /// Same kind, but uid/gid/mode/size differ.
    MetadataChanged { changes: Vec<AttributeChange> },
    /// The recorded digest no longer matches. Metadata changes found at the
    /// same time are listed too.
    ContentChanged {
        previous: ContentHash,
        current: ContentHash,
        changes: Vec<AttributeChange>,
    },
    /// The path is now a different kind of object.
    KindChanged {
        recorded: EntryKind,
        current: ObservedKind,
    },
    /// Tracked, but nothing exists at the path anymore.
    Missing,
    /// Found by the walker, but not tracked.
    Untracked { kind: EntryKind },
}

impl Drift {
    /// Category without details.
    pub fn kind(&self) -> DriftKind {
        match self {
            Drift::Unchanged => DriftKind::Unchanged,
            Drift::MetadataChanged { .. } => DriftKind::MetadataChanged,
            Drift::ContentChanged { .. } => DriftKind::ContentChanged,
            Drift::KindChanged { .. } => DriftKind::KindChanged,
            Drift::Missing => DriftKind::Missing,
            Drift::Untracked { .. } => DriftKind::Untracked,
        }
    }
}

/// Drift categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DriftKind {
    Unchanged,
    MetadataChanged,
    ContentChanged,
    KindChanged,
    Missing,
    Untracked,
}

/// Classification of one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Absolute path.
    pub path: PathBuf,
    /// What changed.
    #[serde(flatten)]
    pub drift: Drift,
    /// Entry rebuilt from current state, for paths that drifted but still exist.
    #[serde(skip)]
    pub(crate) refreshed: Option<Entry>,
}

impl Finding {
    fn new(path: &Path, drift: Drift, refreshed: Option<Entry>) -> Self {
        Self {
            path: path.to_path_buf(),
            drift,
            refreshed,
        }
    }

    /// Category of this finding.
    pub fn kind(&self) -> DriftKind {
        self.drift.kind()
    }

    /// Entry reflecting the current on-disk state, when it differs from the
    /// recorded one and can be tracked.
    pub fn refreshed(&self) -> Option<&Entry> {
        self.refreshed.as_ref()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match &self.drift {
            Drift::Unchanged => write!(f, "unchanged {path}"),
            Drift::MetadataChanged { changes } => {
                write!(f, "mismatch {path}")?;
                for change in changes {
                    write!(f, "\n  {change}")?;
                }
                Ok(())
            }
            Drift::ContentChanged {
                previous,
                current,
                changes,
            } => {
                write!(f, "hash changed {path}")?;
                for change in changes {
                    write!(f, "\n  {change}")?;
                }
                write!(f, "\n  hash changed from {previous} to {current}")
            }
            Drift::KindChanged { recorded, current } => {
                write!(f, "mismatch {path}\n  type changed from {recorded} to {current}")
            }
            Drift::Missing => write!(f, "missing {path}"),
            Drift::Untracked { kind } => write!(f, "new {kind} {path}"),
        }
    }
}

/// Classification of every path in a scope.
///
/// Tracked paths come first in database order, then untracked paths in walk
/// order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DriftReport {
    /// Root of the reconciled scope.
    pub root: PathBuf,
    /// One finding per path.
    pub findings: Vec<Finding>,
}

impl DriftReport {
    /// Number of findings in a category.
    pub fn count(&self, kind: DriftKind) -> usize {
        self.findings.iter().filter(|f| f.kind() == kind).count()
    }

    /// Per-category totals, in category order, including empty categories.
    pub fn tally(&self) -> Vec<(DriftKind, usize)> {
        let counts = self.findings.iter().map(Finding::kind).counts();
        DriftKind::iter()
            .map(|kind| (kind, counts.get(&kind).copied().unwrap_or(0)))
            .collect()
    }

    /// Findings other than [`DriftKind::Unchanged`].
    pub fn drifted(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.kind() != DriftKind::Unchanged)
    }

    /// Look up the finding for a path.
    pub fn get(&self, path: &Path) -> Option<&Finding> {
        self.findings.iter().find(|f| f.path == path)
    }
}

/// Classify every tracked path under `inventory.root()` and every walked
/// path that is not tracked.
///
/// Tracked paths are examined in parallel; the database is only read.
/// Digests are recomputed only for entries that already carry one.
pub fn reconcile(
    db: &Database,
    inventory: &Inventory,
    config: &WardenConfig,
) -> Result<DriftReport, WardenError> {
    let hasher = ContentHasher::from_config(config);
    let tracked: Vec<(&Path, &Entry)> = db.in_scope(inventory.root()).collect();
    debug!(
        root = %inventory.root().display(),
        tracked = tracked.len(),
        walked = inventory.len(),
        "reconciling"
    );

    let mut findings = run_in_pool(config.threads, || {
        tracked
            .par_iter()
            .map(|(path, entry)| examine(path, entry, &hasher))
            .collect::<Result<Vec<_>, _>>()
    })??;

    findings.extend(
        inventory
            .items()
            .iter()
            .filter(|item| !db.contains(&item.path))
            .map(|item| Finding::new(&item.path, Drift::Untracked { kind: item.kind }, None)),
    );

    Ok(DriftReport {
        root: inventory.root().to_path_buf(),
        findings,
    })
}

/// Classify a single tracked path.
fn examine(path: &Path, recorded: &Entry, hasher: &ContentHasher) -> Result<Finding, WardenError> {
    let Some(observed) = probe(path)? else {
        trace!(path = %path.display(), "missing");
        return Ok(Finding::new(path, Drift::Missing, None));
    };

    if observed.kind.entry_kind() != Some(recorded.kind()) {
        let drift = Drift::KindChanged {
            recorded: recorded.kind(),
            current: observed.kind,
        };
        return Ok(Finding::new(path, drift, observed.to_entry()));
    }

    let changes = compare_attributes(recorded, &observed);
    let Some(mut fresh) = observed.to_entry() else {
        // kinds matched above, so the observation is trackable
        return Err(WardenError::invalid_entry(format!(
            "{} cannot be tracked",
            path.display()
        )));
    };

    if let Some(previous) = recorded.hash() {
        let current = hasher.hash_file(path)?;
        fresh.set_hash(current);
        if current != *previous {
            let drift = Drift::ContentChanged {
                previous: *previous,
                current,
                changes,
            };
            return Ok(Finding::new(path, drift, Some(fresh)));
        }
    }

    if changes.is_empty() {
        Ok(Finding::new(path, Drift::Unchanged, None))
    } else {
        Ok(Finding::new(path, Drift::MetadataChanged { changes }, Some(fresh)))
    }
}

/// Compare uid, gid, mode and (for files) size.
fn compare_attributes(recorded: &Entry, observed: &Observed) -> Vec<AttributeChange> {
    let before = recorded.attributes();
    let after = &observed.attributes;
    let mut changes = Vec::new();

    if before.uid != after.uid {
        changes.push(AttributeChange::new(Attribute::Uid, before.uid, after.uid));
    }
    if before.gid != after.gid {
        changes.push(AttributeChange::new(Attribute::Gid, before.gid, after.gid));
    }
    if before.mode != after.mode {
        changes.push(AttributeChange::new(Attribute::Mode, before.mode, after.mode));
    }
    if let Some(size) = recorded.size()
        && size != observed.size
    {
        changes.push(AttributeChange::new(Attribute::Size, size, observed.size));
    }

    changes
}
