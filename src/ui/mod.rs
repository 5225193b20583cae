// UI and formatting module

pub mod formatters;
pub mod prompts;

// Re-export commonly used items for cleaner imports
pub use formatters::{format_duration, format_savings};
pub use prompts::{bold, dimmed, field, info, success, warn};
