// Platform-specific code module

pub mod fs;

pub use fs::is_hidden;
