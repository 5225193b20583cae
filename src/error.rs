use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for the batch pipeline
///
/// Every variant except `Io`/`Json` maps onto one failure kind of a run and
/// carries its own process exit code (see [`BatchError::exit_code`]).
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to launch {tool}: {source}")]
    ProcessLaunch {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("Probe failed for {}: {detail}", .file.display())]
    Probe { file: PathBuf, detail: String },

    #[error("{tool} failed on {} (exit code {}): {stderr}", .file.display(), code_label(.code))]
    Encode {
        tool: String,
        file: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error(
        "Commit of {} interrupted after archiving the original to {}: {detail}{}",
        .source_file.display(),
        .archived.display(),
        rollback_label(.rolled_back)
    )]
    PartialCommit {
        source_file: PathBuf,
        archived: PathBuf,
        rolled_back: bool,
        detail: String,
    },

    #[error("Recovery error: {0}")]
    Recovery(String),

    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn code_label(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "terminated by signal".to_string())
}

fn rollback_label(rolled_back: &bool) -> &'static str {
    if *rolled_back {
        " (original restored)"
    } else {
        " (marker left for recovery)"
    }
}

/// Result type alias for the batch pipeline
pub type Result<T> = std::result::Result<T, BatchError>;

impl BatchError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        BatchError::Config(msg.into())
    }

    /// Create a probe error for `file`
    pub fn probe<P: Into<PathBuf>, S: Into<String>>(file: P, detail: S) -> Self {
        BatchError::Probe {
            file: file.into(),
            detail: detail.into(),
        }
    }

    pub fn recovery<S: Into<String>>(msg: S) -> Self {
        BatchError::Recovery(msg.into())
    }

    /// Process exit code for this failure kind
    pub fn exit_code(&self) -> i32 {
        match self {
            BatchError::Config(_) => 2,
            BatchError::ProcessLaunch { .. } => 3,
            BatchError::Probe { .. } => 4,
            BatchError::Encode { .. } => 5,
            BatchError::PartialCommit { .. } | BatchError::Recovery(_) => 6,
            BatchError::DestinationExists(_) => 7,
            BatchError::Io(_) | BatchError::Json(_) => 1,
        }
    }
}
