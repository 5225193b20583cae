use super::support::{key, ledger_lines, media_dir, run, run_with, FakeEncoder, FakeProber, ScriptedPacer};
use mbatch::core::commit::MARKER_FILE_NAME;
use mbatch::core::ledger::{MatchPolicy, Reconciliation};
use mbatch::core::pacing::PromptPacer;
use mbatch::core::pipeline::{DurationCheck, PipelineOptions, TranscodeOutcome};
use mbatch::BatchError;
use std::fs;
use std::io::Cursor;
use std::path::Path;

#[test]
fn test_full_run_commits_every_file() {
    let (_temp, root) = media_dir(&[("a.m4a", "60.0"), ("b.m4b", "30.0"), ("notes.txt", "x")]);
    let (prober, encoder) = (FakeProber::default(), FakeEncoder::default());
    let mut pacer = ScriptedPacer::default();

    let summary = run(&root, &prober, &encoder, &mut pacer).unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.committed(), 2);
    assert!(summary.error.is_none());

    // originals archived, outputs in place or next to the source
    assert_eq!(fs::read_to_string(root.join("dry/a.m4a")).unwrap(), "60.0");
    assert_eq!(fs::read_to_string(root.join("dry/b.m4b")).unwrap(), "30.0");
    assert_eq!(fs::read_to_string(root.join("a.m4a")).unwrap(), "60");
    assert!(root.join("b.m4a").exists());
    assert!(!root.join("b.m4b").exists());
    assert!(root.join("notes.txt").exists());

    // every enumerated file recorded: ledger disposed, empty scratch pruned
    let cleanup = summary.cleanup.unwrap();
    assert_eq!(cleanup.ledger, Ok(Reconciliation::Deleted));
    assert!(!root.join("processed").exists());
    assert!(!root.join("out").exists());
    assert!(!root.join("tmp").exists());
    assert!(root.join("logs").exists());
    assert!(!root.join("processed.pending").exists());
}

#[test]
fn test_resume_skips_committed_files() {
    let (_temp, root) = media_dir(&[("1.m4a", "10"), ("2.m4a", "10"), ("3.m4a", "10")]);
    let prober = FakeProber::default();

    // first run: operator exits after the first file
    let first = FakeEncoder::default();
    let mut pacer = ScriptedPacer::stopping_after(0);
    let summary = run(&root, &prober, &first, &mut pacer).unwrap();

    assert!(summary.stopped_by_operator);
    assert_eq!(first.encoded(), vec!["1.m4a"]);
    assert_eq!(summary.outcome(&root.join("2.m4a")), Some(&TranscodeOutcome::Aborted));
    assert_eq!(
        summary.cleanup.unwrap().ledger,
        Ok(Reconciliation::Kept { remaining: 2 })
    );
    assert_eq!(ledger_lines(&root), Some(vec![key(&root, "1.m4a")]));

    // second run picks up where the first stopped
    let second = FakeEncoder::default();
    let summary = run(&root, &prober, &second, &mut ScriptedPacer::default()).unwrap();

    assert_eq!(second.encoded(), vec!["2.m4a", "3.m4a"]);
    assert_eq!(summary.skipped, vec![root.join("1.m4a")]);
    assert_eq!(summary.committed(), 2);
    assert!(ledger_lines(&root).is_none());
}

#[test]
fn test_tool_failure_stops_the_run() {
    let files: Vec<(String, &str)> = (1..=5).map(|i| (format!("track{}.m4a", i), "20")).collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(n, d)| (n.as_str(), *d)).collect();
    let (_temp, root) = media_dir(&refs);
    let encoder = FakeEncoder::failing_on("track3.m4a");
    let mut pacer = ScriptedPacer::default();

    let mut summary = run(&root, &FakeProber::default(), &encoder, &mut pacer).unwrap();

    assert_eq!(encoder.encoded(), vec!["track1.m4a", "track2.m4a", "track3.m4a"]);
    assert_eq!(summary.committed(), 2);
    assert!(matches!(
        summary.outcome(&root.join("track3.m4a")),
        Some(TranscodeOutcome::ToolFailure(_))
    ));
    for name in ["track4.m4a", "track5.m4a"] {
        assert_eq!(summary.outcome(&root.join(name)), Some(&TranscodeOutcome::Aborted));
    }

    // the failed file is untouched and not recorded
    assert_eq!(fs::read_to_string(root.join("track3.m4a")).unwrap(), "20");
    assert!(!root.join("dry/track3.m4a").exists());
    assert_eq!(
        ledger_lines(&root),
        Some(vec![key(&root, "track1.m4a"), key(&root, "track2.m4a")])
    );

    let error = summary.take_error().unwrap();
    assert!(matches!(error, BatchError::Encode { code: Some(1), .. }));
    assert_eq!(error.exit_code(), 5);
    // no pause after the failure
    assert_eq!(pacer.pauses, 2);
}

#[test]
fn test_duration_within_tolerance_is_success() {
    let (_temp, root) = media_dir(&[("a.m4a", "60.0")]);
    let encoder = FakeEncoder::with_drift("a.m4a", 0.4);

    let summary = run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap();

    assert_eq!(summary.outcome(&root.join("a.m4a")), Some(&TranscodeOutcome::Success));
}

#[test]
fn test_duration_drift_warns_but_commits() {
    let (_temp, root) = media_dir(&[("a.m4a", "60.0"), ("b.m4a", "60.0")]);
    let encoder = FakeEncoder::with_drift("a.m4a", 2.0);

    let summary = run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap();

    assert_eq!(
        summary.outcome(&root.join("a.m4a")),
        Some(&TranscodeOutcome::ValidationWarning(DurationCheck::Drift {
            source: 60.0,
            output: 62.0
        }))
    );
    assert_eq!(summary.committed(), 2);
    assert_eq!(summary.warnings(), 1);
    assert!(summary.error.is_none());

    let log = fs::read_to_string(summary.log_file.unwrap()).unwrap();
    assert!(log.contains("WARNING: a.m4a: mismatched source and output duration"));
}

#[test]
fn test_unknown_duration_is_a_warning() {
    let (_temp, root) = media_dir(&[("a.m4a", "n/a")]);
    let encoder = FakeEncoder::default();

    let summary = run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap();

    assert_eq!(
        summary.outcome(&root.join("a.m4a")),
        Some(&TranscodeOutcome::ValidationWarning(DurationCheck::Unknown))
    );
}

#[test]
fn test_natural_processing_order() {
    let (_temp, root) = media_dir(&[
        ("track10.m4a", "1"),
        ("track2.m4a", "1"),
        ("Track1.m4a", "1"),
    ]);
    let encoder = FakeEncoder::default();

    run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap();

    assert_eq!(encoder.encoded(), vec!["Track1.m4a", "track2.m4a", "track10.m4a"]);
}

#[test]
fn test_no_pause_after_last_file() {
    let (_temp, root) = media_dir(&[("a.m4a", "1"), ("b.m4a", "1"), ("c.m4a", "1")]);
    let mut pacer = ScriptedPacer::default();

    run(&root, &FakeProber::default(), &FakeEncoder::default(), &mut pacer).unwrap();

    assert_eq!(pacer.pauses, 2);
}

#[test]
fn test_empty_directory_is_nothing_to_do() {
    let (_temp, root) = media_dir(&[("cover.jpg", "x")]);
    let encoder = FakeEncoder::default();

    let summary = run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap();

    assert!(summary.is_nothing_to_do());
    assert!(encoder.encoded().is_empty());
    for dir in ["out", "dry", "logs", "tmp"] {
        assert!(!root.join(dir).exists(), "{} should not be created", dir);
    }
    assert!(!root.join("processed").exists());
}

#[test]
fn test_operator_exit_from_prompt() {
    let (_temp, root) = media_dir(&[("a.m4a", "1"), ("b.m4a", "1")]);
    let encoder = FakeEncoder::default();
    let mut pacer = PromptPacer::new(Cursor::new(b"maybe\ne\n".to_vec()), Vec::new());

    let summary = run(&root, &FakeProber::default(), &encoder, &mut pacer).unwrap();

    assert!(summary.stopped_by_operator);
    assert!(summary.error.is_none());
    assert_eq!(encoder.encoded(), vec!["a.m4a"]);
    assert_eq!(ledger_lines(&root), Some(vec![key(&root, "a.m4a")]));

    let shown = String::from_utf8(pacer.into_output()).unwrap();
    assert!(shown.contains("Invalid input."));
}

#[test]
fn test_sibling_destination_clash() {
    // a.m4a is converted in place first, then a.m4b would overwrite it
    let (_temp, root) = media_dir(&[("a.m4a", "5"), ("a.m4b", "7")]);
    let encoder = FakeEncoder::default();

    let mut summary = run(&root, &FakeProber::default(), &encoder, &mut ScriptedPacer::default()).unwrap();

    let error = summary.take_error().unwrap();
    assert!(matches!(error, BatchError::DestinationExists(_)));
    assert_eq!(error.exit_code(), 7);
    assert_eq!(encoder.encoded(), vec!["a.m4a"]);
    assert_eq!(fs::read_to_string(root.join("a.m4b")).unwrap(), "7");
}

#[test]
fn test_stale_output_is_replaced() {
    let (_temp, root) = media_dir(&[("a.m4a", "3")]);
    fs::create_dir(root.join("out")).unwrap();
    fs::write(root.join("out/a.m4a"), "half written").unwrap();

    let summary = run(
        &root,
        &FakeProber::default(),
        &FakeEncoder::default(),
        &mut ScriptedPacer::default(),
    )
    .unwrap();

    assert_eq!(summary.outcome(&root.join("a.m4a")), Some(&TranscodeOutcome::Success));
    assert!(!root.join("out").exists());
}

#[test]
fn test_scratch_with_user_files_is_kept() {
    let (_temp, root) = media_dir(&[("a.m4a", "3")]);
    fs::create_dir(root.join("tmp")).unwrap();
    fs::write(root.join("tmp/keep.me"), "user data").unwrap();

    run(
        &root,
        &FakeProber::default(),
        &FakeEncoder::default(),
        &mut ScriptedPacer::default(),
    )
    .unwrap();

    assert!(root.join("tmp/keep.me").exists());
    assert!(!root.join("out").exists());
}

#[test]
fn test_probe_failure_stops_before_encoding() {
    let (_temp, root) = media_dir(&[("a.m4a", "3"), ("b.m4a", "3")]);
    let encoder = FakeEncoder::default();

    let mut summary = run(
        &root,
        &FakeProber::failing_on_call(1),
        &encoder,
        &mut ScriptedPacer::default(),
    )
    .unwrap();

    assert!(matches!(summary.take_error(), Some(BatchError::Probe { .. })));
    assert!(encoder.encoded().is_empty());
    assert!(ledger_lines(&root).is_none());
}

#[test]
fn test_exact_and_substring_matching() {
    let setup = || {
        let (temp, root) = media_dir(&[("track1.m4a", "1"), ("track10.m4a", "1")]);
        fs::write(
            root.join("processed"),
            format!(
                "\n{}\n{}.bak",
                key(&root, "track10.m4a"),
                key(&root, "track1.m4a")
            ),
        )
        .unwrap();
        (temp, root)
    };

    let (_temp, root) = setup();
    let exact = FakeEncoder::default();
    run(&root, &FakeProber::default(), &exact, &mut ScriptedPacer::default()).unwrap();
    assert_eq!(exact.encoded(), vec!["track1.m4a"]);

    // legacy containment: track1.m4a's path is contained in the track1.m4a.bak line
    let (_temp, root) = setup();
    let substring = FakeEncoder::default();
    let options = PipelineOptions {
        match_policy: MatchPolicy::Substring,
        ..Default::default()
    };
    let summary = run_with(
        &root,
        &FakeProber::default(),
        &substring,
        &mut ScriptedPacer::default(),
        options,
    )
    .unwrap();
    assert!(substring.encoded().is_empty());
    assert_eq!(summary.skipped.len(), 2);
}

#[test]
fn test_upper_case_extension_is_replaced_in_place() {
    let (_temp, root) = media_dir(&[("A.M4A", "30"), ("b.m4a", "30")]);
    let prober = FakeProber::default();

    let first = FakeEncoder::default();
    let summary = run(&root, &prober, &first, &mut ScriptedPacer::stopping_after(0)).unwrap();
    assert_eq!(first.encoded(), vec!["A.M4A"]);
    assert_eq!(summary.outcome(&root.join("A.M4A")), Some(&TranscodeOutcome::Success));
    assert!(root.join("A.M4A").exists());
    assert!(!root.join("A.m4a").exists());

    // the committed file is never encoded again
    let second = FakeEncoder::default();
    let summary = run(&root, &FakeProber::default(), &second, &mut ScriptedPacer::default()).unwrap();
    assert_eq!(second.encoded(), vec!["b.m4a"]);
    assert_eq!(summary.skipped, vec![root.join("A.M4A")]);
}

#[test]
fn test_stuck_marker_does_not_fail_a_recorded_file() {
    fn block_marker(file: &Path) {
        let marker = file.parent().unwrap().join(MARKER_FILE_NAME);
        fs::remove_file(&marker).unwrap();
        fs::create_dir(&marker).unwrap();
    }

    let (_temp, root) = media_dir(&[("a.m4a", "12")]);
    // call 2 probes the committed output, after the marker was written
    let prober = FakeProber {
        before_call: Some((2, block_marker as fn(&Path))),
        ..Default::default()
    };

    let mut summary = run(&root, &prober, &FakeEncoder::default(), &mut ScriptedPacer::default()).unwrap();

    assert!(summary.take_error().is_none());
    assert_eq!(summary.outcome(&root.join("a.m4a")), Some(&TranscodeOutcome::Success));
    assert_eq!(summary.committed(), 1);
    assert!(root.join(MARKER_FILE_NAME).is_dir());
}
