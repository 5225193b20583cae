// AudioProfile - re-encodes audiobooks/music to low-bitrate AAC with qaac
use std::fs;
use std::path::{Path, PathBuf};

use super::{run_checked, EncodeJob, Encoder};
use crate::core::probe::MediaMetadata;
use crate::core::scratch::ScratchDir;
use crate::core::tool_command::ToolCommand;
use crate::error::Result;

/// Source tags forwarded to qaac when the input is a decoded wav,
/// as (ffprobe key, qaac option)
const FORWARDED_TAGS: &[(&str, &str)] = &[
    ("title", "--title"),
    ("artist", "--artist"),
    ("album", "--album"),
    ("album_artist", "--band"),
    ("track", "--track"),
    ("disc", "--disk"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioOptions {
    /// Consume mp3 sources (decoded to wav first) instead of m4a/m4b
    pub mp3: bool,
    /// Keep all channels instead of down-mixing to mono
    pub stereo: bool,
    /// 32 kHz output instead of 22.05 kHz
    pub hq: bool,
}

#[derive(Debug, Clone)]
pub struct AudioProfile {
    qaac: PathBuf,
    ffmpeg: PathBuf,
    options: AudioOptions,
}

impl AudioProfile {
    pub fn new(qaac: PathBuf, ffmpeg: PathBuf, options: AudioOptions) -> Self {
        Self {
            qaac,
            ffmpeg,
            options,
        }
    }

    pub fn options(&self) -> AudioOptions {
        self.options
    }

    /// ffmpeg invocation decoding an mp3 to wav
    pub fn decode_command(&self, source: &Path, wav: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new("ffmpeg", &self.ffmpeg);
        cmd.opt("-i", source)
            .opt("-ac", "1")
            .opt("-f", "wav")
            .opt("-loglevel", "warning")
            .flag("-y")
            .positional(wav);

        if self.options.stereo {
            cmd.remove("-ac");
        }
        cmd
    }

    /// qaac invocation encoding `input` to `output`
    pub fn encode_command(
        &self,
        input: &Path,
        output: &Path,
        metadata: &MediaMetadata,
        tmp_dir: &Path,
        log_file: &Path,
    ) -> ToolCommand {
        let mut cmd = ToolCommand::new("qaac64", &self.qaac);
        cmd.positional(input)
            .opt("-V", "64")
            // 22050 / 32000 → roughly 11 / 16 kHz cutoff
            .opt("--rate", "22050")
            .flag("--limiter")
            .flag("--threading");

        if self.options.hq {
            cmd.set("--rate", "32000");
        }

        if self.options.mp3 {
            // The wav has no tags, so carry them over from the mp3
            for (key, option) in FORWARDED_TAGS {
                if let Some(value) = metadata.tag(key).filter(|v| !v.is_empty()) {
                    cmd.opt_eq(option, value);
                }
            }
        } else if !self.options.stereo && metadata.channels().unwrap_or(1) > 1 {
            cmd.opt("--matrix-preset", "mono");
        }

        cmd.opt("--tmpdir", tmp_dir)
            .flag("--verbose")
            .opt("--log", log_file)
            .opt("-o", output);
        cmd
    }
}

impl Encoder for AudioProfile {
    fn name(&self) -> &str {
        "qaac64"
    }

    fn extensions(&self) -> Vec<String> {
        if self.options.mp3 {
            vec!["mp3".to_string()]
        } else {
            vec!["m4a".to_string(), "m4b".to_string()]
        }
    }

    fn output_extension(&self) -> &str {
        "m4a"
    }

    fn scratch_dirs(&self) -> Vec<ScratchDir> {
        if self.options.mp3 {
            vec![ScratchDir::Tmp, ScratchDir::Wav]
        } else {
            vec![ScratchDir::Tmp]
        }
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<()> {
        let stem = job.source.stem();
        let log_file = job
            .scratch
            .path(ScratchDir::Logs)
            .join(format!("{}.log", stem));
        let tmp_dir = job.scratch.path(ScratchDir::Tmp);

        if !self.options.mp3 {
            let cmd =
                self.encode_command(&job.source.path, job.output, job.metadata, &tmp_dir, &log_file);
            run_checked(&cmd, &job.source.path)?;
            return Ok(());
        }

        let wav = job.scratch.path(ScratchDir::Wav).join(format!("{}.wav", stem));
        run_checked(&self.decode_command(&job.source.path, &wav), &job.source.path)?;

        let cmd = self.encode_command(&wav, job.output, job.metadata, &tmp_dir, &log_file);
        run_checked(&cmd, &job.source.path)?;

        if let Err(e) = fs::remove_file(&wav) {
            log::warn!("Could not remove intermediate {:?}: {}", wav, e);
        }
        Ok(())
    }
}
