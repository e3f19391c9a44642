//! The `verify` (alias `check`) action.

use serde::Serialize;
use tracing::{info, warn};

use filewarden_core::{Database, WardenConfig, WardenError};
use filewarden_scan::Inventory;

use crate::reconcile::{DriftKind, DriftReport, reconcile};

/// Outcome of a verification run.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// Whether the scope matched the database.
    pub passed: bool,
    /// Findings that caused the verdict to fail.
    pub failures: usize,
    /// Full classification.
    pub report: DriftReport,
}

/// Reconcile without modifying the database.
///
/// Any finding other than `unchanged` fails the verdict, except `untracked`
/// when `config.untracked_is_drift` is off. An error is returned only when
/// reconciliation itself could not finish.
pub fn verify(
    db: &Database,
    inventory: &Inventory,
    config: &WardenConfig,
) -> Result<Verdict, WardenError> {
    let report = reconcile(db, inventory, config)?;

    let mut failures = 0usize;
    for finding in report.drifted() {
        let kind = finding.kind();
        if kind == DriftKind::Untracked && !config.untracked_is_drift {
            info!(path = %finding.path.display(), "untracked, ignored");
            continue;
        }
        warn!(path = %finding.path.display(), category = %kind, "drift");
        failures += 1;
    }

    let passed = failures == 0;
    info!(
        checked = report.findings.len(),
        failures, passed, "verify complete"
    );
    Ok(Verdict {
        passed,
        failures,
        report,
    })
}
