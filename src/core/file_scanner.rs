//! Source file enumeration
//!
//! Lists the direct children of a target directory that are regular files
//! with one of the requested extensions, in a deterministic order. The
//! result is computed once per run; the pipeline never re-lists.
//!
//! # Examples
//!
//! ```no_run
//! use mbatch::core::file_scanner::{FileScanner, ScanOrder};
//! use std::path::Path;
//!
//! let files = FileScanner::new(Path::new("/music/book"))?
//!     .extensions(&["m4a", "m4b"])
//!     .order(ScanOrder::Natural)
//!     .scan()?;
//!
//! for file in files {
//!     println!("{}: {} bytes", file.key(), file.size);
//! }
//! # Ok::<(), mbatch::BatchError>(())
//! ```

use crate::error::{BatchError, Result};
use crate::platform::is_hidden;
use crate::utils::natural_sort::natural_cmp;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Order in which enumerated files are returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOrder {
    /// Digit runs compared numerically (`track2` before `track10`)
    #[default]
    Natural,
    /// Plain byte-wise file name order
    Name,
    /// Whatever order the OS returns entries in
    Directory,
}

impl FromStr for ScanOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "natural" => Ok(ScanOrder::Natural),
            "name" => Ok(ScanOrder::Name),
            "none" | "directory" => Ok(ScanOrder::Directory),
            other => Err(format!(
                "Unknown sort order '{}'. Use: natural, name or none",
                other
            )),
        }
    }
}

/// A source file picked up for processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path under the canonicalized target directory
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl SourceFile {
    /// Identity string recorded in the ledger
    pub fn key(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Scanner for the direct children of one directory
pub struct FileScanner {
    path: PathBuf,
    extensions: Vec<String>,
    case_sensitive: bool,
    order: ScanOrder,
}

impl FileScanner {
    /// Create a scanner for `path`, which is canonicalized so that every
    /// returned `SourceFile` has a stable absolute identity.
    pub fn new(path: &Path) -> Result<Self> {
        log::debug!("Creating FileScanner for path: {:?}", path);

        if !path.is_dir() {
            return Err(BatchError::config(format!(
                "'{}' is not a directory",
                path.display()
            )));
        }

        Ok(Self {
            path: path.canonicalize()?,
            extensions: Vec::new(),
            case_sensitive: false,
            order: ScanOrder::default(),
        })
    }

    /// Extensions to accept, with or without the leading dot
    pub fn extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_string())
            .collect();
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn order(mut self, order: ScanOrder) -> Self {
        self.order = order;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };

        self.extensions.iter().any(|wanted| {
            if self.case_sensitive {
                wanted == ext
            } else {
                wanted.eq_ignore_ascii_case(ext)
            }
        })
    }

    /// List matching regular files. An empty result is not an error.
    pub fn scan(&self) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.path)?.flatten() {
            if is_hidden(&entry) {
                continue;
            }

            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            let path = entry.path();
            if !self.matches_extension(&path) {
                continue;
            }

            files.push(SourceFile {
                name: entry.file_name().to_string_lossy().to_string(),
                path,
                size: metadata.len(),
            });
        }

        match self.order {
            ScanOrder::Natural => files.sort_by(|a, b| natural_cmp(&a.name, &b.name)),
            ScanOrder::Name => files.sort_by(|a, b| a.name.cmp(&b.name)),
            ScanOrder::Directory => {}
        }

        log::debug!("Found {} source file(s) in {:?}", files.len(), self.path);
        Ok(files)
    }
}

/// Total size in bytes of `files`
pub fn total_size(files: &[SourceFile]) -> u64 {
    files.iter().map(|f| f.size).sum()
}
