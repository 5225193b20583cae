//! Scratch space under the target directory.
//!
//! A run stages files through a fixed set of subdirectories (`tmp`, `out`,
//! `logs`, `dry`, `wav`). They are created at start if missing and removed
//! at the end only if they are empty. A directory that still holds any
//! entry is never removed: it may contain a partially written output or an
//! archived original.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScratchDir {
    /// Encoder working files
    Tmp,
    /// Freshly encoded outputs before commit
    Out,
    /// Run and per-file logs
    Logs,
    /// Archive of replaced originals
    Dry,
    /// Decoded intermediates
    Wav,
}

impl ScratchDir {
    pub fn name(self) -> &'static str {
        match self {
            ScratchDir::Tmp => "tmp",
            ScratchDir::Out => "out",
            ScratchDir::Logs => "logs",
            ScratchDir::Dry => "dry",
            ScratchDir::Wav => "wav",
        }
    }
}

impl fmt::Display for ScratchDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The scratch directories owned by one run
#[derive(Debug)]
pub struct ScratchSpace {
    root: PathBuf,
    dirs: BTreeMap<ScratchDir, PathBuf>,
}

impl ScratchSpace {
    /// Create each named subdirectory of `root` if absent. Idempotent.
    pub fn ensure(root: &Path, names: &[ScratchDir]) -> Result<Self> {
        let mut dirs = BTreeMap::new();

        for &name in names {
            let path = root.join(name.name());
            if !path.is_dir() {
                log::debug!("Creating scratch directory {:?}", path);
                fs::create_dir_all(&path)?;
            }
            dirs.insert(name, path);
        }

        Ok(Self {
            root: root.to_path_buf(),
            dirs,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, name: ScratchDir) -> Option<&Path> {
        self.dirs.get(&name).map(PathBuf::as_path)
    }

    /// Path of `name`, whether or not it was requested at `ensure` time
    pub fn path(&self, name: ScratchDir) -> PathBuf {
        self.dirs
            .get(&name)
            .cloned()
            .unwrap_or_else(|| self.root.join(name.name()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.dirs.values().map(PathBuf::as_path)
    }

    /// Remove every owned directory that is currently empty
    pub fn prune_empty(&self) -> Vec<PathBuf> {
        prune_empty(self.paths())
    }
}

/// Remove each directory that has zero entries; return the removed ones.
///
/// Non-empty or missing directories are left untouched, and errors are
/// logged rather than returned since this runs on every exit path.
pub fn prune_empty<'a, I>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut removed = Vec::new();

    for path in paths {
        match is_empty_dir(path) {
            Ok(true) => match fs::remove_dir(path) {
                Ok(()) => {
                    log::debug!("Removed empty scratch directory {:?}", path);
                    removed.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Could not remove {:?}: {}", path, e),
            },
            Ok(false) => log::debug!("Keeping non-empty scratch directory {:?}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not inspect {:?}: {}", path, e),
        }
    }

    removed
}

fn is_empty_dir(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}
