// Core business logic module

pub mod commit;
pub mod config;
pub mod encoder;
pub mod file_scanner;
pub mod ledger;
pub mod pacing;
pub mod pipeline;
pub mod probe;
pub mod run_guard;
pub mod run_log;
pub mod scratch;
pub mod tool_command;
pub mod tool_resolver;

// Re-export commonly used items
pub use config::Config;
pub use encoder::{AudioOptions, AudioProfile, Encoder, VideoOptions, VideoProfile};
pub use file_scanner::{FileScanner, ScanOrder, SourceFile};
pub use ledger::{FileLedgerStore, Ledger, LedgerStore, MatchPolicy};
pub use pacing::{CountdownPacer, PaceDecision, Pacer, PromptPacer};
pub use pipeline::{Pipeline, PipelineOptions, RunSummary, TranscodeOutcome};
pub use probe::{FfprobeProber, MediaMetadata, Prober};
