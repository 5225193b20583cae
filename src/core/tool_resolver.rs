// ToolResolver - locates the external executables the pipeline drives
use std::path::{Path, PathBuf};

use crate::core::Config;

pub const FFPROBE: &str = "ffprobe";
pub const FFMPEG: &str = "ffmpeg";
pub const QAAC: &str = "qaac64";

/// Tools the resolver reports on in `mbatch get tools`
pub const KNOWN_TOOLS: &[&str] = &[FFPROBE, FFMPEG, QAAC];

/// Where a resolved executable came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    SystemPath,
    Configured,
    /// Not found anywhere; the bare name is returned and launching will fail
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub name: String,
    pub path: PathBuf,
    pub source: ToolSource,
}

/// Resolve `tool` on PATH, else use `fallback`, else return the bare name.
///
/// The fallback is not checked for existence; a bad path surfaces as a
/// launch error on first use.
pub fn resolve(tool: &str, fallback: Option<&Path>) -> ResolvedTool {
    if let Ok(system_path) = which::which(tool) {
        log::debug!("Resolved {} on PATH: {:?}", tool, system_path);
        return ResolvedTool {
            name: tool.to_string(),
            path: system_path,
            source: ToolSource::SystemPath,
        };
    }

    match fallback {
        Some(path) => {
            log::debug!("{} not on PATH, using configured {:?}", tool, path);
            ResolvedTool {
                name: tool.to_string(),
                path: path.to_path_buf(),
                source: ToolSource::Configured,
            }
        }
        None => {
            log::debug!("{} not found, leaving unresolved", tool);
            ResolvedTool {
                name: tool.to_string(),
                path: PathBuf::from(tool),
                source: ToolSource::Unresolved,
            }
        }
    }
}

/// Resolve `tool` using the fallback path stored in `config`
pub fn resolve_with_config(tool: &str, config: &Config) -> ResolvedTool {
    resolve(tool, config.get_tool_path(tool))
}
