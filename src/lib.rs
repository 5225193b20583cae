// mbatch Library - Public API

// Re-export error types
pub mod error;
pub use error::{BatchError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use core::config::Config;
pub use core::pipeline::{Pipeline, PipelineOptions, RunSummary};

// Initialize logging
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
