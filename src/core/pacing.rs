//! Pause between committed files.
//!
//! Either a fixed countdown (unattended runs) or a prompt that waits for the
//! operator to confirm each next file. These are the only places a run
//! yields; neither can be cancelled except by killing the process.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceDecision {
    Continue,
    Stop,
}

pub trait Pacer {
    /// Called after each committed file that has a successor
    fn pause(&mut self) -> Result<PaceDecision>;
}

/// Parse one line of operator input
pub fn parse_choice(input: &str) -> Option<PaceDecision> {
    match input.trim().to_lowercase().as_str() {
        "" | "c" | "continue" => Some(PaceDecision::Continue),
        "e" | "exit" => Some(PaceDecision::Stop),
        _ => None,
    }
}

/// Sleep a fixed number of seconds, printing a countdown
#[derive(Debug, Clone)]
pub struct CountdownPacer {
    seconds: u64,
    tick: Duration,
}

impl CountdownPacer {
    pub fn new(seconds: u64) -> Self {
        Self {
            seconds,
            tick: Duration::from_secs(1),
        }
    }

    /// Shorter ticks, for tests
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

impl Pacer for CountdownPacer {
    fn pause(&mut self) -> Result<PaceDecision> {
        if self.seconds == 0 {
            return Ok(PaceDecision::Continue);
        }

        println!("{}", format!("Waiting for {} seconds.", self.seconds).dimmed());
        let mut stdout = io::stdout();
        for remaining in (1..=self.seconds).rev() {
            // trailing spaces clear digits left over from a longer number
            print!("{}  \r", remaining);
            stdout.flush().ok();
            thread::sleep(self.tick);
        }
        println!();
        Ok(PaceDecision::Continue)
    }
}

/// Ask the operator before each next file
pub struct PromptPacer<R, W> {
    input: R,
    output: W,
}

impl PromptPacer<io::StdinLock<'static>, io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptPacer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Pacer for PromptPacer<R, W> {
    fn pause(&mut self) -> Result<PaceDecision> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "Press Enter to continue or input 'e' to exit.")?;
            write!(self.output, "> ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                // stdin closed: nobody is there to confirm
                writeln!(self.output)?;
                return Ok(PaceDecision::Stop);
            }

            match parse_choice(&line) {
                Some(decision) => return Ok(decision),
                None => writeln!(self.output, "Invalid input.")?,
            }
        }
    }
}
