use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::core::commit::RecoveryAction;
use crate::core::file_scanner::ScanOrder;
use crate::core::ledger::{MatchPolicy, Reconciliation};
use crate::core::pacing::{CountdownPacer, Pacer, PromptPacer};
use crate::core::pipeline::{
    bytes_to_mb, DurationCheck, Pipeline, PipelineOptions, RunSummary, TranscodeOutcome,
};
use crate::core::probe::FfprobeProber;
use crate::core::tool_resolver::{self, ResolvedTool, ToolSource, FFMPEG, FFPROBE, QAAC};
use crate::core::{AudioOptions, AudioProfile, Config, Encoder, VideoOptions, VideoProfile};
use crate::ui;

/// Value of `--wait` given without a number
pub const WAIT_DEFAULT: &str = "default";

/// How to pause between files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitArg {
    /// `--wait` alone: the configured default
    Default,
    Seconds(u64),
}

/// clap value parser for `--wait`
pub fn parse_wait(value: &str) -> std::result::Result<WaitArg, String> {
    if value == WAIT_DEFAULT {
        return Ok(WaitArg::Default);
    }
    value
        .parse::<u64>()
        .map(WaitArg::Seconds)
        .map_err(|_| format!("'{}' is not a number of seconds", value))
}

/// clap value parser for `--dir`: must be an existing directory
pub fn parse_dir(value: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if !path.exists() {
        return Err(format!("directory '{}' does not exist", value));
    }
    if !path.is_dir() {
        return Err(format!("'{}' is not a directory", value));
    }
    Ok(path)
}

/// `mbatch audio`
pub fn execute_audio(matches: &clap::ArgMatches) -> Result<()> {
    let config = Config::load()?;
    let options = AudioOptions {
        mp3: matches.get_flag("mp3"),
        stereo: matches.get_flag("stereo"),
        hq: matches.get_flag("hq"),
    };

    let mut tools = vec![FFPROBE, QAAC];
    if options.mp3 {
        tools.push(FFMPEG);
    }
    let resolved = resolve_tools(&tools, &config);
    let encoder = AudioProfile::new(
        tool_path(&resolved, QAAC),
        tool_path(&resolved, FFMPEG),
        options,
    );

    run(matches, &config, &encoder, tool_path(&resolved, FFPROBE))
}

/// `mbatch video`
pub fn execute_video(matches: &clap::ArgMatches) -> Result<()> {
    let config = Config::load()?;
    let options = VideoOptions {
        resolution: *matches
            .get_one::<u32>("resolution")
            .context("Resolution argument is required")?,
        speed: matches
            .get_one::<String>("speed")
            .context("Speed argument is required")?
            .clone(),
        aac: matches.get_flag("aac"),
    };

    let resolved = resolve_tools(&[FFPROBE, FFMPEG], &config);
    let encoder = VideoProfile::new(tool_path(&resolved, FFMPEG), options);

    run(matches, &config, &encoder, tool_path(&resolved, FFPROBE))
}

fn resolve_tools(tools: &[&str], config: &Config) -> Vec<ResolvedTool> {
    tools
        .iter()
        .map(|tool| {
            let resolved = tool_resolver::resolve_with_config(tool, config);
            if resolved.source == ToolSource::Unresolved {
                ui::warn(&format!(
                    "{} not found on PATH and no fallback configured (mbatch set tool {} <path>)",
                    tool, tool
                ));
            }
            resolved
        })
        .collect()
}

fn tool_path(resolved: &[ResolvedTool], tool: &str) -> PathBuf {
    resolved
        .iter()
        .find(|r| r.name == tool)
        .map(|r| r.path.clone())
        .unwrap_or_else(|| PathBuf::from(tool))
}

fn run(
    matches: &clap::ArgMatches,
    config: &Config,
    encoder: &dyn Encoder,
    ffprobe: PathBuf,
) -> Result<()> {
    let directory = matches
        .get_one::<PathBuf>("dir")
        .context("Directory argument is required")?;

    let match_policy = if matches.get_flag("legacy-match") {
        MatchPolicy::Substring
    } else {
        config.match_policy
    };
    let options = PipelineOptions {
        match_policy,
        order: matches
            .get_one::<ScanOrder>("sort")
            .copied()
            .unwrap_or_default(),
        duration_tolerance: config.duration_tolerance_secs,
    };

    let mut pacer: Box<dyn Pacer> = match matches.get_one::<WaitArg>("wait") {
        Some(WaitArg::Default) => Box::new(CountdownPacer::new(config.default_wait_secs)),
        Some(WaitArg::Seconds(secs)) => Box::new(CountdownPacer::new(*secs)),
        None => Box::new(PromptPacer::stdin()),
    };

    let prober = FfprobeProber::new(ffprobe);
    let mut summary = Pipeline::new(directory, &prober, encoder, pacer.as_mut())
        .options(options)
        .run()
        .with_context(|| format!("Cannot start run in {}", directory.display()))?;

    print_summary(&summary);

    match summary.take_error() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn print_summary(summary: &RunSummary) {
    match &summary.recovery {
        Some(RecoveryAction::Recorded(path)) => ui::dimmed(&format!(
            "Recovered: {} was committed by an interrupted run",
            display_name(path)
        )),
        Some(RecoveryAction::Restored(path)) => ui::warn(&format!(
            "Recovered: {} restored from dry after an interrupted commit",
            display_name(path)
        )),
        _ => {}
    }

    if summary.is_nothing_to_do() {
        ui::info(&format!("Nothing to do in {}", summary.directory.display()));
        return;
    }

    println!();
    ui::bold("Summary");

    let aborted = summary
        .outcomes
        .iter()
        .filter(|(_, o)| matches!(o, TranscodeOutcome::Aborted))
        .count();

    ui::field("Files", &summary.total.to_string());
    ui::field("Committed", &summary.committed().to_string());
    ui::field("Already done", &summary.skipped.len().to_string());
    if aborted > 0 {
        ui::field("Not attempted", &aborted.to_string());
    }

    for (path, outcome) in &summary.outcomes {
        if let TranscodeOutcome::ValidationWarning(check) = outcome {
            let detail = match check {
                DurationCheck::Drift { source, output } => format!(
                    "duration {} -> {}",
                    ui::format_duration(*source),
                    ui::format_duration(*output)
                ),
                _ => "duration unavailable".to_string(),
            };
            println!("  {} {} ({})", "⚠".yellow(), display_name(path), detail);
        }
    }

    ui::field(
        "Size",
        &format!(
            "{} MB -> {} MB ({} saved)",
            bytes_to_mb(summary.size_before),
            bytes_to_mb(summary.size_after),
            ui::format_savings(summary.size_before, summary.size_after)
        ),
    );
    if let Some(log_file) = &summary.log_file {
        ui::field("Log", &log_file.display().to_string());
    }

    if let Some(cleanup) = &summary.cleanup {
        if cleanup.ledger == Ok(Reconciliation::Deleted) {
            ui::success("All files processed.");
        }
        if let Err(e) = &cleanup.ledger {
            ui::warn(&format!("Could not reconcile ledger: {}", e));
        }
    }

    if summary.stopped_by_operator {
        ui::dimmed("Stopped by operator; run again to continue.");
    } else if summary.error.is_some() {
        ui::dimmed("Run stopped; fix the problem and run again to resume.");
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
