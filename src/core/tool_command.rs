//! Builder for external tool invocations.
//!
//! Arguments are kept as an ordered list of named entries instead of a flat
//! argv, so profiles can add, replace or drop an option by name without
//! caring where it sits in the command line.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::error::{BatchError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    /// `--limiter`
    Flag(String),
    /// `-V 64`
    Opt(String, OsString),
    /// `--artist=Name`
    OptEq(String, String),
    /// input/output paths
    Positional(OsString),
}

impl Entry {
    fn name(&self) -> Option<&str> {
        match self {
            Entry::Flag(name) | Entry::Opt(name, _) | Entry::OptEq(name, _) => Some(name),
            Entry::Positional(_) => None,
        }
    }

    fn push_to(&self, argv: &mut Vec<OsString>) {
        match self {
            Entry::Flag(name) => argv.push(name.into()),
            Entry::Opt(name, value) => {
                argv.push(name.into());
                argv.push(value.clone());
            }
            Entry::OptEq(name, value) => argv.push(format!("{}={}", name, value).into()),
            Entry::Positional(value) => argv.push(value.clone()),
        }
    }
}

/// Captured result of a finished tool run
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

#[derive(Debug, Clone)]
pub struct ToolCommand {
    tool: String,
    program: PathBuf,
    entries: Vec<Entry>,
}

impl ToolCommand {
    /// `tool` is the display name used in errors, `program` the executable
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            entries: Vec::new(),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn flag(&mut self, name: &str) -> &mut Self {
        self.entries.push(Entry::Flag(name.to_string()));
        self
    }

    pub fn opt(&mut self, name: &str, value: impl Into<OsString>) -> &mut Self {
        self.entries.push(Entry::Opt(name.to_string(), value.into()));
        self
    }

    pub fn opt_eq(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.entries
            .push(Entry::OptEq(name.to_string(), value.into()));
        self
    }

    pub fn positional(&mut self, value: impl AsRef<Path>) -> &mut Self {
        self.entries
            .push(Entry::Positional(value.as_ref().as_os_str().to_owned()));
        self
    }

    /// Replace the value of option `name` in place, or append it if absent
    pub fn set(&mut self, name: &str, value: impl Into<OsString>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.name() == Some(name)) {
            Some(entry) => *entry = Entry::Opt(name.to_string(), value),
            None => self.entries.push(Entry::Opt(name.to_string(), value)),
        }
        self
    }

    /// Drop every entry named `name`
    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.entries.retain(|e| e.name() != Some(name));
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name() == Some(name))
    }

    pub fn to_args(&self) -> Vec<OsString> {
        let mut argv = Vec::new();
        for entry in &self.entries {
            entry.push_to(&mut argv);
        }
        argv
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// Only a failure to start the process is an error here; the caller
    /// decides what a non-zero exit means.
    pub fn run(&self) -> Result<ToolOutput> {
        log::debug!("Running: {}", self);

        let output = Command::new(&self.program)
            .args(self.to_args())
            .output()
            .map_err(|source| BatchError::ProcessLaunch {
                tool: self.tool.clone(),
                source,
            })?;

        Ok(ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in self.to_args() {
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}
