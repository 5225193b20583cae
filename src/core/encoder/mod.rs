//! Encoder profiles.
//!
//! An [`Encoder`] turns one source file into one output file inside the
//! `out` scratch directory. Probing, committing, validation and the ledger
//! are the pipeline's job, so a profile only knows how to build and run
//! its tool invocations.

mod audio;
mod video;

pub use audio::{AudioOptions, AudioProfile};
pub use video::{VideoOptions, VideoProfile, DEFAULT_RESOLUTION, DEFAULT_SPEED};

use std::path::Path;

use crate::core::file_scanner::SourceFile;
use crate::core::probe::MediaMetadata;
use crate::core::scratch::{ScratchDir, ScratchSpace};
use crate::core::tool_command::{ToolCommand, ToolOutput};
use crate::error::{BatchError, Result};

/// Everything an encoder gets to see for one file
#[derive(Debug)]
pub struct EncodeJob<'a> {
    pub source: &'a SourceFile,
    /// Probe result taken just before encoding
    pub metadata: &'a MediaMetadata,
    /// Where the encoded file must be written
    pub output: &'a Path,
    pub scratch: &'a ScratchSpace,
}

pub trait Encoder {
    fn name(&self) -> &str;

    /// Source extensions this profile consumes, without the dot
    fn extensions(&self) -> Vec<String>;

    /// Extension of the produced file, without the dot
    fn output_extension(&self) -> &str;

    /// Scratch directories needed beyond `out`, `dry` and `logs`
    fn scratch_dirs(&self) -> Vec<ScratchDir> {
        Vec::new()
    }

    /// Blocking encode of `job.source` into `job.output`
    fn encode(&self, job: &EncodeJob<'_>) -> Result<()>;
}

/// Run `cmd` and turn a non-zero exit into an [`BatchError::Encode`]
pub(crate) fn run_checked(cmd: &ToolCommand, file: &Path) -> Result<ToolOutput> {
    let output = cmd.run()?;

    if !output.success() {
        return Err(BatchError::Encode {
            tool: cmd.tool().to_string(),
            file: file.to_path_buf(),
            code: output.code(),
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(output)
}
