// VideoProfile - shrinks videos to h264 with a mono low-rate audio track
use std::path::{Path, PathBuf};

use super::{run_checked, EncodeJob, Encoder};
use crate::core::tool_command::ToolCommand;
use crate::error::Result;

pub const DEFAULT_RESOLUTION: u32 = 540;
pub const DEFAULT_SPEED: &str = "slow";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOptions {
    /// Output height in pixels; width follows the aspect ratio
    pub resolution: u32,
    /// x264 preset (ultrafast … veryslow)
    pub speed: String,
    /// fdk-aac instead of LAME mp3 for the audio track
    pub aac: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            speed: DEFAULT_SPEED.to_string(),
            aac: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoProfile {
    ffmpeg: PathBuf,
    options: VideoOptions,
}

impl VideoProfile {
    pub fn new(ffmpeg: PathBuf, options: VideoOptions) -> Self {
        Self { ffmpeg, options }
    }

    pub fn command(&self, source: &Path, output: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new("ffmpeg", &self.ffmpeg);
        cmd.opt("-i", source)
            .opt("-c:v", "libx264")
            .opt("-preset:v", self.options.speed.as_str())
            .opt("-crf", "28")
            .opt("-vf", format!("scale=-1:{}", self.options.resolution));

        if self.options.aac {
            cmd.opt("-c:a", "libfdk_aac")
                .opt("-b:a", "72k")
                .opt("-afterburner", "1");
        } else {
            cmd.opt("-c:a", "libmp3lame").opt("-q:a", "7");
        }

        cmd.opt("-cutoff", "15500")
            .opt("-ar", "32000")
            .opt("-ac", "1")
            .opt("-loglevel", "warning")
            .flag("-y")
            .positional(output);
        cmd
    }
}

impl Encoder for VideoProfile {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["mp4".to_string(), "avi".to_string()]
    }

    fn output_extension(&self) -> &str {
        "mp4"
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<()> {
        let cmd = self.command(&job.source.path, job.output);
        let output = run_checked(&cmd, &job.source.path)?;

        if !output.stderr.trim().is_empty() {
            log::warn!("ffmpeg warnings for {:?}: {}", job.source.path, output.stderr.trim());
        }
        Ok(())
    }
}
