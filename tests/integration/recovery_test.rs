use super::support::{key, ledger_lines, media_dir, run, FakeEncoder, FakeProber, ScriptedPacer};
use mbatch::core::commit::{CommitJournal, CommitPlan, RecoveryAction};
use mbatch::core::file_scanner::SourceFile;
use mbatch::core::pipeline::TranscodeOutcome;
use mbatch::BatchError;
use std::fs;
use std::path::Path;

fn plan_for(root: &Path, name: &str) -> CommitPlan {
    let source = SourceFile {
        path: root.join(name),
        name: name.to_string(),
        size: 0,
    };
    let output = root.join("out").join(format!("{}.m4a", source.stem()));
    CommitPlan::new(&source, output, &root.join("dry"), "m4a")
}

#[test]
fn test_validation_failure_is_recorded_on_next_run() {
    let (_temp, root) = media_dir(&[("a.m4a", "8")]);

    // second probe (post-commit validation) fails
    let mut summary = run(
        &root,
        &FakeProber::failing_on_call(2),
        &FakeEncoder::default(),
        &mut ScriptedPacer::default(),
    )
    .unwrap();
    assert!(matches!(summary.take_error(), Some(BatchError::Probe { .. })));
    assert!(root.join("processed.pending").exists());
    assert!(root.join("dry/a.m4a").exists());
    assert!(ledger_lines(&root).is_none());

    // next run finishes the bookkeeping instead of re-encoding
    let encoder = FakeEncoder::default();
    let summary = run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap();

    assert_eq!(summary.recovery, Some(RecoveryAction::Recorded(root.join("a.m4a"))));
    assert!(encoder.encoded().is_empty());
    assert_eq!(summary.skipped, vec![root.join("a.m4a")]);
    assert!(!root.join("processed.pending").exists());
    assert!(!root.join("processed").exists());
}

#[test]
fn test_failed_output_move_restores_original() {
    let (_temp, root) = media_dir(&[("a.m4a", "8"), ("b.m4a", "8")]);
    let encoder = FakeEncoder {
        skip_write: vec!["a.m4a".to_string()],
        ..Default::default()
    };

    let mut summary = run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap();

    let error = summary.take_error().unwrap();
    assert!(matches!(
        error,
        BatchError::PartialCommit {
            rolled_back: true,
            ..
        }
    ));
    assert_eq!(error.exit_code(), 6);
    assert_eq!(fs::read_to_string(root.join("a.m4a")).unwrap(), "8");
    assert!(!root.join("processed.pending").exists());
    assert_eq!(
        summary.outcome(&root.join("b.m4a")),
        Some(&TranscodeOutcome::Aborted)
    );
}

#[test]
fn test_interrupted_archive_move_is_undone() {
    // killed between moving the source to dry and moving the output in
    let (_temp, root) = media_dir(&[("a.m4b", "8")]);
    fs::create_dir(root.join("dry")).unwrap();
    let plan = plan_for(&root, "a.m4b");
    CommitJournal::in_dir(&root).write(&plan).unwrap();
    fs::rename(&plan.source, &plan.archived).unwrap();

    let encoder = FakeEncoder::default();
    let summary = run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap();

    assert_eq!(summary.recovery, Some(RecoveryAction::Restored(root.join("a.m4b"))));
    assert_eq!(encoder.encoded(), vec!["a.m4b"]);
    assert!(root.join("a.m4a").exists());
    assert_eq!(fs::read_to_string(root.join("dry/a.m4b")).unwrap(), "8");
}

#[test]
fn test_marker_before_any_move_is_dropped() {
    let (_temp, root) = media_dir(&[("a.m4a", "8")]);
    let plan = plan_for(&root, "a.m4a");
    CommitJournal::in_dir(&root).write(&plan).unwrap();

    let summary = run(
        &root,
        &FakeProber::default(),
        &FakeEncoder::default(),
        &mut ScriptedPacer::default(),
    )
    .unwrap();

    assert_eq!(summary.recovery, Some(RecoveryAction::Untouched(root.join("a.m4a"))));
    assert_eq!(summary.committed(), 1);
    assert!(ledger_lines(&root).is_none());
}

#[test]
fn test_unrecoverable_marker_aborts_startup() {
    let (_temp, root) = media_dir(&[("b.m4a", "8")]);
    let plan = plan_for(&root, "gone.m4a");
    CommitJournal::in_dir(&root).write(&plan).unwrap();

    let encoder = FakeEncoder::default();
    let error = run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap_err();

    assert!(matches!(error, BatchError::Recovery(_)));
    assert_eq!(error.exit_code(), 6);
    assert!(encoder.encoded().is_empty());
    assert!(root.join("processed.pending").exists());
}

#[test]
fn test_recorded_key_survives_in_ledger() {
    // commit finished but the run died before the ledger append
    let (_temp, root) = media_dir(&[("a.m4b", "8"), ("c.m4a", "8")]);
    fs::create_dir(root.join("dry")).unwrap();
    let plan = plan_for(&root, "a.m4b");
    CommitJournal::in_dir(&root).write(&plan).unwrap();
    fs::rename(&plan.source, &plan.archived).unwrap();
    fs::write(&plan.destination, "8").unwrap();

    let encoder = FakeEncoder::default();
    let mut pacer = ScriptedPacer::stopping_after(0);
    let summary = run(&root, &FakeProber::default(), &encoder, &mut pacer).unwrap();

    assert_eq!(summary.recovery, Some(RecoveryAction::Recorded(root.join("a.m4b"))));
    let lines = ledger_lines(&root).unwrap();
    assert_eq!(lines[0], key(&root, "a.m4b"));
}
