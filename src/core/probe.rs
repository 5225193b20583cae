//! Metadata probe adapter.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format
//! -show_streams` and decodes the JSON into [`MediaMetadata`]. No retries:
//! any failure is returned to the orchestrator, which stops the run.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::tool_command::ToolCommand;
use crate::error::{BatchError, Result};

/// Anything that can describe a media file
pub trait Prober {
    fn probe(&self, file: &Path) -> Result<MediaMetadata>;
}

/// Probe result for one file. Fetched fresh before and after each encode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaMetadata {
    #[serde(default)]
    pub format: FormatInfo,
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormatInfo {
    pub format_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bit_rate: Option<u64>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub index: u32,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bit_rate: Option<u64>,
    pub channels: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub sample_rate: Option<u64>,
    pub height: Option<u32>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// ffprobe prints most numbers as JSON strings ("60.023000"), but not all
/// builds agree, so accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.filter(|n| *n >= 0.0).map(|n| n as u64))
}

impl MediaMetadata {
    /// Parse ffprobe JSON output
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Container duration, else the first stream that reports one
    pub fn duration(&self) -> Option<f64> {
        self.format
            .duration
            .or_else(|| self.streams.iter().find_map(|s| s.duration))
    }

    pub fn stream(&self, index: u32) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.index == index)
    }

    pub fn first_audio(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"))
    }

    pub fn first_video(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
    }

    /// Channel count of the first audio stream
    pub fn channels(&self) -> Option<u32> {
        self.first_audio().and_then(|s| s.channels)
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn codec_names(&self) -> Vec<&str> {
        self.streams
            .iter()
            .filter_map(|s| s.codec_name.as_deref())
            .collect()
    }

    /// Tag lookup: container tags first, then the first audio stream's.
    /// Keys are matched case-insensitively since muxers disagree
    /// (`title` vs `TITLE`).
    pub fn tag(&self, key: &str) -> Option<&str> {
        find_tag(&self.format.tags, key)
            .or_else(|| self.first_audio().and_then(|s| find_tag(&s.tags, key)))
    }

    /// Tag value or empty string
    pub fn tag_or_empty(&self, key: &str) -> &str {
        self.tag(key).unwrap_or("")
    }
}

fn find_tag<'a>(tags: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// [`Prober`] backed by the `ffprobe` CLI
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    fn command(&self, file: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new("ffprobe", &self.ffprobe_path);
        cmd.opt("-v", "quiet")
            .opt("-print_format", "json")
            .flag("-show_format")
            .flag("-show_streams")
            .positional(file);
        cmd
    }
}

impl Prober for FfprobeProber {
    fn probe(&self, file: &Path) -> Result<MediaMetadata> {
        let output = self.command(file).run()?;

        if !output.success() {
            let code = output
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(BatchError::probe(
                file,
                format!("ffprobe exited with {}: {}", code, output.stderr.trim()),
            ));
        }

        MediaMetadata::from_json(&output.stdout)
            .map_err(|e| BatchError::probe(file, format!("unparseable ffprobe output: {}", e)))
    }
}
