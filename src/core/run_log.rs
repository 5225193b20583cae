// RunLog - human-readable record of one run, echoed to the terminal
use chrono::Local;
use colored::Colorize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: Option<File>,
    echo: bool,
}

impl RunLog {
    /// Log file `<logs_dir>/<run_name>-<yymmdd-HHMMSS>.log`, created on the
    /// first write so an idle run leaves the logs directory empty.
    pub fn new(logs_dir: &Path, run_name: &str) -> Self {
        let stamp = Local::now().format("%y%m%d-%H%M%S");
        Self {
            path: logs_dir.join(format!("{}-{}.log", run_name, stamp)),
            file: None,
            echo: true,
        }
    }

    /// Stop echoing to stdout
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Processing file: a.m4a at 2024-01-01 10:00:00`
    pub fn status(&mut self, status: &str, file: &Path) {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());
        let line = format!(
            "{} file: {} at {}",
            status,
            name,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        if self.echo {
            println!();
            println!("{}", line.cyan());
        }
        self.append(&format!("\n----------------\n{}", line));
    }

    pub fn info(&mut self, message: &str) {
        if self.echo {
            println!("{}", message);
        }
        self.append(message);
    }

    pub fn warn(&mut self, message: &str) {
        if self.echo {
            println!("{}", format!("⚠️  {}", message).yellow().bold());
        }
        self.append(&format!("WARNING: {}", message));
    }

    pub fn error(&mut self, message: &str) {
        if self.echo {
            println!("{}", message.red().bold());
        }
        self.append(&format!("ERROR: {}", message));
    }

    fn append(&mut self, message: &str) {
        if self.file.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(file) => self.file = Some(file),
                Err(e) => {
                    log::warn!("Cannot open run log {:?}: {}", self.path, e);
                    return;
                }
            }
        }

        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", message).and_then(|_| file.flush()) {
                log::warn!("Cannot write run log {:?}: {}", self.path, e);
            }
        }
    }
}
