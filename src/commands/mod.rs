// Command handlers module
pub mod tools;
pub mod transcode;

// Re-exports for cleaner imports
pub use transcode::{execute_audio as audio, execute_video as video};
