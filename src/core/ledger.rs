//! Progress ledger.
//!
//! A plain-text file named `processed` in the target directory, one
//! canonical source path per line. A path is appended only after its file
//! was fully committed, and each append is flushed to disk before the next
//! file starts. The ledger is read once at startup to compute the resume
//! set, and deleted at the end of a run when it is empty or covers every
//! enumerated file.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const LEDGER_FILE_NAME: &str = "processed";

/// How a source path is looked up in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// The path equals one ledger line
    #[default]
    Exact,
    /// The path occurs anywhere in the raw ledger text. Compatible with
    /// ledgers written by older tooling, but `/a/b.mp3` also matches a
    /// ledger holding `/a/b.mp3.bak`.
    Substring,
}

/// Backing storage for the ledger
pub trait LedgerStore {
    /// Full contents, or an empty string if nothing is stored
    fn read_all(&self) -> io::Result<String>;
    /// Append `text` and make it durable before returning
    fn append(&mut self, text: &str) -> io::Result<()>;
    fn remove(&mut self) -> io::Result<()>;
    fn exists(&self) -> bool;
}

/// Ledger stored in a file on disk
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/processed`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(LEDGER_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for FileLedgerStore {
    fn read_all(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    fn append(&mut self, text: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        file.sync_data()
    }

    fn remove(&mut self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// In-memory stand-in for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    contents: Option<String>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(text: &str) -> Self {
        Self {
            contents: Some(text.to_string()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn read_all(&self) -> io::Result<String> {
        Ok(self.contents.clone().unwrap_or_default())
    }

    fn append(&mut self, text: &str) -> io::Result<()> {
        self.contents.get_or_insert_with(String::new).push_str(text);
        Ok(())
    }

    fn remove(&mut self) -> io::Result<()> {
        self.contents = None;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.contents.is_some()
    }
}

/// Result of the end-of-run reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Ledger was empty or complete and has been deleted
    Deleted,
    /// Ledger kept because some known files are still unprocessed
    Kept { remaining: usize },
    /// Nothing on disk to reconcile
    Absent,
}

#[derive(Debug)]
pub struct Ledger<S: LedgerStore> {
    store: S,
    policy: MatchPolicy,
    raw: String,
    entries: HashSet<String>,
}

fn parse_entries(raw: &str) -> HashSet<String> {
    raw.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

impl<S: LedgerStore> Ledger<S> {
    /// Read the store once to build the resume set
    pub fn load(store: S, policy: MatchPolicy) -> Result<Self> {
        let raw = store.read_all()?;
        let entries = parse_entries(&raw);
        log::debug!("Ledger loaded with {} entries", entries.len());

        Ok(Self {
            store,
            policy,
            raw,
            entries,
        })
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_processed(&self, key: &str) -> bool {
        Self::matches(self.policy, &self.raw, &self.entries, key)
    }

    fn matches(policy: MatchPolicy, raw: &str, entries: &HashSet<String>, key: &str) -> bool {
        match policy {
            MatchPolicy::Exact => entries.contains(key),
            MatchPolicy::Substring => raw.contains(key),
        }
    }

    /// Append `key` and flush it before returning
    pub fn append(&mut self, key: &str) -> Result<()> {
        let mut line = String::new();
        if !self.raw.is_empty() && !self.raw.ends_with('\n') {
            line.push('\n');
        }
        line.push_str(key);
        line.push('\n');

        self.store.append(&line)?;
        self.raw.push_str(&line);
        self.entries.insert(key.to_string());
        Ok(())
    }

    /// Re-read the store and delete it if it is empty or if every key in
    /// `known` is recorded. Safe to call more than once.
    pub fn reconcile<K: AsRef<str>>(&mut self, known: &[K]) -> Result<Reconciliation> {
        if !self.store.exists() {
            return Ok(Reconciliation::Absent);
        }

        let raw = self.store.read_all()?;
        let entries = parse_entries(&raw);
        let policy = self.policy;
        let remaining = known
            .iter()
            .map(|k| k.as_ref())
            .filter(|k| !Self::matches(policy, &raw, &entries, k))
            .count();

        if entries.is_empty() || remaining == 0 {
            self.store.remove()?;
            self.raw.clear();
            self.entries.clear();
            log::debug!("Ledger removed");
            return Ok(Reconciliation::Deleted);
        }

        self.raw = raw;
        self.entries = entries;
        Ok(Reconciliation::Kept { remaining })
    }
}
