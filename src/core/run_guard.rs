//! Resources owned by one run, released on every exit path.
//!
//! [`RunGuard`] holds the ledger and the scratch space for the duration of
//! the run loop. [`RunGuard::cleanup`] reconciles the ledger and prunes
//! empty scratch directories; it runs at most once, and `Drop` calls it if
//! the run unwound before reaching it.

use std::path::PathBuf;

use crate::core::ledger::{Ledger, LedgerStore, Reconciliation};
use crate::core::scratch::ScratchSpace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Ledger reconciliation result, or the error message if it failed
    pub ledger: std::result::Result<Reconciliation, String>,
    /// Scratch directories that were empty and got removed
    pub pruned: Vec<PathBuf>,
}

pub struct RunGuard<S: LedgerStore> {
    ledger: Ledger<S>,
    scratch: ScratchSpace,
    known: Vec<String>,
    report: Option<CleanupReport>,
}

impl<S: LedgerStore> RunGuard<S> {
    /// `known` is the full list of ledger keys enumerated for this run
    pub fn acquire(ledger: Ledger<S>, scratch: ScratchSpace, known: Vec<String>) -> Self {
        Self {
            ledger,
            scratch,
            known,
            report: None,
        }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger<S> {
        &mut self.ledger
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    /// Reconcile the ledger, then prune empty scratch directories.
    /// Later calls return the first report without touching the disk.
    pub fn cleanup(&mut self) -> CleanupReport {
        if let Some(report) = &self.report {
            return report.clone();
        }

        let ledger = self.ledger.reconcile(&self.known).map_err(|e| {
            log::warn!("Ledger reconciliation failed: {}", e);
            e.to_string()
        });
        let pruned = self.scratch.prune_empty();

        let report = CleanupReport { ledger, pruned };
        self.report = Some(report.clone());
        report
    }
}

impl<S: LedgerStore> Drop for RunGuard<S> {
    fn drop(&mut self) {
        if self.report.is_none() {
            log::debug!("Run ended early, cleaning up");
            self.cleanup();
        }
    }
}
