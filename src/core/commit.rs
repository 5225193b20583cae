//! Rename protocol that swaps a fresh output in for its source.
//!
//! Order is fixed: (a) move the original into `dry/`, (b) move the output
//! from `out/` to its final location. Before (a) a marker file
//! `processed.pending` records every path involved; it is removed once the
//! ledger has the entry. A marker found at startup means a previous run
//! stopped somewhere inside that window, and [`recover`] puts the
//! directory back into a consistent state.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::core::file_scanner::SourceFile;
use crate::core::ledger::{Ledger, LedgerStore};
use crate::error::{BatchError, Result};

pub const MARKER_FILE_NAME: &str = "processed.pending";

/// Every path involved in committing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPlan {
    /// Ledger key of the source
    pub key: String,
    pub source: PathBuf,
    pub archived: PathBuf,
    pub output: PathBuf,
    pub destination: PathBuf,
}

impl CommitPlan {
    /// Plan for `source`, whose encoded form sits at `output` and will end
    /// up next to the source with extension `output_ext`.
    /// A source already carrying `output_ext` in any letter case is replaced
    /// in place.
    pub fn new(source: &SourceFile, output: PathBuf, dry_dir: &Path, output_ext: &str) -> Self {
        let same_ext = source
            .path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(output_ext));
        let destination = if same_ext {
            source.path.clone()
        } else {
            source.path.with_extension(output_ext)
        };

        Self {
            key: source.key(),
            source: source.path.clone(),
            archived: unique_path(&dry_dir.join(&source.name)),
            output,
            destination,
        }
    }

    /// The output replaces the source under the same name
    pub fn is_in_place(&self) -> bool {
        self.destination == self.source
    }

    /// A sibling destination must not clobber an unrelated file
    pub fn check_destination(&self) -> Result<()> {
        if !self.is_in_place() && self.destination.exists() {
            return Err(BatchError::DestinationExists(self.destination.clone()));
        }
        Ok(())
    }
}

/// `path`, or `stem (n).ext` for the first n that does not exist yet
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| path.with_file_name(format!("{} ({}){}", stem, n, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// The on-disk commit marker
#[derive(Debug, Clone)]
pub struct CommitJournal {
    path: PathBuf,
}

impl CommitJournal {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(MARKER_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, plan: &CommitPlan) -> Result<()> {
        let mut file = File::create(&self.path)?;
        file.write_all(serde_json::to_string_pretty(plan)?.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    pub fn read(&self) -> Result<Option<CommitPlan>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Perform steps (a) and (b) of the commit.
///
/// On a failed (b) the original is moved back. The marker is left in place
/// only if that restore also fails, so the next run can finish the job.
pub fn commit(plan: &CommitPlan, journal: &CommitJournal) -> Result<()> {
    plan.check_destination()?;
    journal.write(plan)?;

    if let Err(e) = fs::rename(&plan.source, &plan.archived) {
        journal.clear()?;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&plan.output, &plan.destination) {
        log::warn!(
            "Moving {:?} to {:?} failed: {}; restoring original",
            plan.output,
            plan.destination,
            e
        );

        return Err(match fs::rename(&plan.archived, &plan.source) {
            Ok(()) => {
                journal.clear()?;
                BatchError::PartialCommit {
                    source_file: plan.source.clone(),
                    archived: plan.archived.clone(),
                    rolled_back: true,
                    detail: e.to_string(),
                }
            }
            Err(restore_err) => BatchError::PartialCommit {
                source_file: plan.source.clone(),
                archived: plan.archived.clone(),
                rolled_back: false,
                detail: format!("{}; restore failed: {}", e, restore_err),
            },
        });
    }

    Ok(())
}

/// What startup recovery did with a leftover marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// No marker found
    Clean,
    /// Both moves had happened; the ledger entry was written now
    Recorded(PathBuf),
    /// Only the archive move had happened; the original was put back
    Restored(PathBuf),
    /// Neither move had happened
    Untouched(PathBuf),
}

/// Reconcile a marker left by an interrupted commit
pub fn recover<S: LedgerStore>(
    journal: &CommitJournal,
    ledger: &mut Ledger<S>,
) -> Result<RecoveryAction> {
    let Some(plan) = journal.read()? else {
        return Ok(RecoveryAction::Clean);
    };

    log::info!("Found interrupted commit for {:?}", plan.source);

    let action = if !plan.archived.exists() {
        if !plan.source.exists() {
            return Err(BatchError::recovery(format!(
                "{} is missing and no archived copy exists at {}",
                plan.source.display(),
                plan.archived.display()
            )));
        }
        RecoveryAction::Untouched(plan.source.clone())
    } else if plan.destination.exists() {
        if !ledger.is_processed(&plan.key) {
            ledger.append(&plan.key)?;
        }
        RecoveryAction::Recorded(plan.source.clone())
    } else {
        if plan.source.exists() {
            return Err(BatchError::recovery(format!(
                "both {} and its archive {} exist; resolve manually",
                plan.source.display(),
                plan.archived.display()
            )));
        }
        fs::rename(&plan.archived, &plan.source)?;
        RecoveryAction::Restored(plan.source.clone())
    };

    journal.clear()?;
    Ok(action)
}
