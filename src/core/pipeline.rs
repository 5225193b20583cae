//! Resumable batch transcode run.
//!
//! Per file: `Pending → Probing → Encoding → Commit → Validating →
//! Committed`. Any tool failure stops the whole run (later files are not
//! attempted) and the failing file is never written to the ledger, so the
//! next invocation resumes exactly there. Duration drift after encoding is
//! only a warning.
//!
//! # Examples
//!
//! ```no_run
//! use mbatch::core::encoder::{AudioOptions, AudioProfile};
//! use mbatch::core::pacing::CountdownPacer;
//! use mbatch::core::pipeline::Pipeline;
//! use mbatch::core::probe::FfprobeProber;
//! use std::path::Path;
//!
//! let prober = FfprobeProber::new("ffprobe".into());
//! let encoder = AudioProfile::new("qaac64".into(), "ffmpeg".into(), AudioOptions::default());
//! let mut pacer = CountdownPacer::new(10);
//!
//! let summary = Pipeline::new(Path::new("/music/book"), &prober, &encoder, &mut pacer).run()?;
//! println!("{} file(s) committed", summary.committed());
//! # Ok::<(), mbatch::BatchError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::commit::{self, CommitJournal, CommitPlan, RecoveryAction};
use crate::core::config::DEFAULT_DURATION_TOLERANCE;
use crate::core::encoder::{EncodeJob, Encoder};
use crate::core::file_scanner::{total_size, FileScanner, ScanOrder, SourceFile};
use crate::core::ledger::{FileLedgerStore, Ledger, LedgerStore, MatchPolicy};
use crate::core::pacing::{PaceDecision, Pacer};
use crate::core::probe::Prober;
use crate::core::run_guard::{CleanupReport, RunGuard};
use crate::core::run_log::RunLog;
use crate::core::scratch::{ScratchDir, ScratchSpace};
use crate::error::{BatchError, Result};

/// Scratch directories every run needs regardless of the encoder
const BASE_SCRATCH: &[ScratchDir] = &[ScratchDir::Out, ScratchDir::Dry, ScratchDir::Logs];

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub match_policy: MatchPolicy,
    pub order: ScanOrder,
    /// Seconds of |source - output| duration difference tolerated silently
    pub duration_tolerance: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            order: ScanOrder::default(),
            duration_tolerance: DEFAULT_DURATION_TOLERANCE,
        }
    }
}

/// Outcome of comparing source and output durations
#[derive(Debug, Clone, PartialEq)]
pub enum DurationCheck {
    WithinTolerance,
    Drift { source: f64, output: f64 },
    /// One of the probes reported no duration
    Unknown,
}

pub fn check_duration(source: Option<f64>, output: Option<f64>, tolerance: f64) -> DurationCheck {
    match (source, output) {
        (Some(source), Some(output)) if (source - output).abs() > tolerance => {
            DurationCheck::Drift { source, output }
        }
        (Some(_), Some(_)) => DurationCheck::WithinTolerance,
        _ => DurationCheck::Unknown,
    }
}

/// What happened to one enumerated file
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeOutcome {
    Success,
    /// Committed, but the duration check raised a warning
    ValidationWarning(DurationCheck),
    /// Run-terminating failure on this file
    ToolFailure(String),
    /// Not attempted because the run stopped earlier
    Aborted,
}

impl TranscodeOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            TranscodeOutcome::Success | TranscodeOutcome::ValidationWarning(_)
        )
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub directory: PathBuf,
    /// Files matching the encoder's extensions
    pub total: usize,
    /// Files already recorded in the ledger
    pub skipped: Vec<PathBuf>,
    pub outcomes: Vec<(PathBuf, TranscodeOutcome)>,
    pub recovery: Option<RecoveryAction>,
    pub stopped_by_operator: bool,
    /// The error that stopped the run, if any
    pub error: Option<BatchError>,
    pub cleanup: Option<CleanupReport>,
    pub size_before: u64,
    pub size_after: u64,
    pub log_file: Option<PathBuf>,
}

impl RunSummary {
    pub fn is_nothing_to_do(&self) -> bool {
        self.total == 0
    }

    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_committed()).count()
    }

    pub fn warnings(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TranscodeOutcome::ValidationWarning(_)))
            .count()
    }

    pub fn outcome(&self, path: &Path) -> Option<&TranscodeOutcome> {
        self.outcomes
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, o)| o)
    }

    pub fn take_error(&mut self) -> Option<BatchError> {
        self.error.take()
    }
}

pub struct Pipeline<'a> {
    directory: PathBuf,
    prober: &'a dyn Prober,
    encoder: &'a dyn Encoder,
    pacer: &'a mut dyn Pacer,
    options: PipelineOptions,
    quiet: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        directory: &Path,
        prober: &'a dyn Prober,
        encoder: &'a dyn Encoder,
        pacer: &'a mut dyn Pacer,
    ) -> Self {
        Self {
            directory: directory.to_path_buf(),
            prober,
            encoder,
            pacer,
            options: PipelineOptions::default(),
            quiet: false,
        }
    }

    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Do not echo the run log to stdout
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run against the `processed` ledger file in the target directory
    pub fn run(&mut self) -> Result<RunSummary> {
        let root = self.directory.canonicalize().map_err(|e| {
            BatchError::config(format!("Invalid directory '{}': {}", self.directory.display(), e))
        })?;
        self.run_with_store(FileLedgerStore::in_dir(&root))
    }

    /// Run with an explicit ledger store.
    ///
    /// Errors returned here happened before any file was touched (bad
    /// directory, unreadable ledger, unrecoverable commit marker). Failures
    /// while processing files are reported in [`RunSummary::error`] after
    /// cleanup has run.
    pub fn run_with_store<S: LedgerStore>(&mut self, store: S) -> Result<RunSummary> {
        let extensions = self.encoder.extensions();
        let scanner = FileScanner::new(&self.directory)?
            .extensions(extensions.as_slice())
            .order(self.options.order);
        let root = scanner.path().to_path_buf();

        let mut ledger = Ledger::load(store, self.options.match_policy)?;
        let journal = CommitJournal::in_dir(&root);
        let recovery = commit::recover(&journal, &mut ledger)?;
        if recovery != RecoveryAction::Clean {
            log::info!("Recovered interrupted commit: {:?}", recovery);
        }

        let files = scanner.scan()?;
        let mut summary = RunSummary {
            directory: root.clone(),
            total: files.len(),
            recovery: Some(recovery),
            size_before: total_size(&files),
            ..Default::default()
        };

        if files.is_empty() {
            log::info!("Nothing to do in {:?}", root);
            return Ok(summary);
        }

        log::info!(
            "Encoding up to {} files in {:?} with {}",
            files.len(),
            root,
            self.encoder.name()
        );

        let mut scratch_dirs = BASE_SCRATCH.to_vec();
        scratch_dirs.extend(self.encoder.scratch_dirs());
        let scratch = ScratchSpace::ensure(&root, &scratch_dirs)?;

        let run_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "run".to_string());
        let mut run_log = RunLog::new(&scratch.path(ScratchDir::Logs), &run_name);
        if self.quiet {
            run_log = run_log.quiet();
        }

        let known = files.iter().map(SourceFile::key).collect();
        let mut guard = RunGuard::acquire(ledger, scratch, known);

        self.process_all(&files, &mut guard, &journal, &mut run_log, &mut summary);

        summary.size_after = self.output_size(&root);
        run_log.info(&format!(
            "\nOld size: {} MB\nNew size: {} MB",
            bytes_to_mb(summary.size_before),
            bytes_to_mb(summary.size_after)
        ));
        if run_log.path().exists() {
            summary.log_file = Some(run_log.path().to_path_buf());
        }

        summary.cleanup = Some(guard.cleanup());
        Ok(summary)
    }

    fn process_all<S: LedgerStore>(
        &mut self,
        files: &[SourceFile],
        guard: &mut RunGuard<S>,
        journal: &CommitJournal,
        run_log: &mut RunLog,
        summary: &mut RunSummary,
    ) {
        let mut stopped = false;

        for (index, file) in files.iter().enumerate() {
            if guard.ledger().is_processed(&file.key()) {
                run_log.info(&format!("Skipping already processed file: {}", file.name));
                summary.skipped.push(file.path.clone());
                continue;
            }

            if stopped {
                summary
                    .outcomes
                    .push((file.path.clone(), TranscodeOutcome::Aborted));
                continue;
            }

            match self.process_file(file, guard, journal, run_log) {
                Ok(outcome) => summary.outcomes.push((file.path.clone(), outcome)),
                Err(e) => {
                    run_log.error(&format!(
                        "Something went wrong while processing {}\n{}",
                        file.name, e
                    ));
                    summary
                        .outcomes
                        .push((file.path.clone(), TranscodeOutcome::ToolFailure(e.to_string())));
                    summary.error = Some(e);
                    stopped = true;
                    continue;
                }
            }

            let has_more = files[index + 1..]
                .iter()
                .any(|f| !guard.ledger().is_processed(&f.key()));
            if !has_more {
                continue;
            }

            match self.pacer.pause() {
                Ok(PaceDecision::Continue) => {}
                Ok(PaceDecision::Stop) => {
                    run_log.info("Stopped by operator.");
                    summary.stopped_by_operator = true;
                    stopped = true;
                }
                Err(e) => {
                    summary.error = Some(e);
                    stopped = true;
                }
            }
        }
    }

    fn process_file<S: LedgerStore>(
        &self,
        file: &SourceFile,
        guard: &mut RunGuard<S>,
        journal: &CommitJournal,
        run_log: &mut RunLog,
    ) -> Result<TranscodeOutcome> {
        run_log.status("Processing", &file.path);

        let source_meta = self.prober.probe(&file.path)?;

        let output_ext = self.encoder.output_extension();
        let output = guard
            .scratch()
            .path(ScratchDir::Out)
            .join(format!("{}.{}", file.stem(), output_ext));
        if output.exists() {
            run_log.warn(&format!(
                "Removing stale output from an interrupted run: {}",
                output.display()
            ));
            fs::remove_file(&output)?;
        }

        let plan = CommitPlan::new(
            file,
            output.clone(),
            &guard.scratch().path(ScratchDir::Dry),
            output_ext,
        );
        plan.check_destination()?;

        self.encoder.encode(&EncodeJob {
            source: file,
            metadata: &source_meta,
            output: &output,
            scratch: guard.scratch(),
        })?;

        commit::commit(&plan, journal)?;
        run_log.status("Processed", &file.path);

        let output_meta = self.prober.probe(&plan.destination)?;
        let check = check_duration(
            source_meta.duration(),
            output_meta.duration(),
            self.options.duration_tolerance,
        );

        guard.ledger_mut().append(&plan.key)?;
        if let Err(e) = journal.clear() {
            // recorded in the ledger; the next run drops the stale marker
            run_log.warn(&format!(
                "Could not remove {}: {}",
                journal.path().display(),
                e
            ));
        }

        Ok(match check {
            DurationCheck::WithinTolerance => TranscodeOutcome::Success,
            DurationCheck::Drift { source, output } => {
                run_log.warn(&format!(
                    "{}: mismatched source and output duration.\nSource duration: {:.3}s\nOutput duration: {:.3}s",
                    file.name, source, output
                ));
                TranscodeOutcome::ValidationWarning(check)
            }
            DurationCheck::Unknown => {
                run_log.warn(&format!(
                    "{}: duration unavailable, output not validated",
                    file.name
                ));
                TranscodeOutcome::ValidationWarning(check)
            }
        })
    }

    /// Size of everything in the directory now carrying the output extension
    fn output_size(&self, root: &Path) -> u64 {
        FileScanner::new(root)
            .map(|s| s.extensions(&[self.encoder.output_extension()]))
            .and_then(|s| s.scan())
            .map(|files| total_size(&files))
            .unwrap_or(0)
    }
}

/// Whole megabytes, rounded up
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes.div_ceil(1 << 20)
}
