// Platform-specific filesystem checks used when enumerating sources

use std::fs::DirEntry;

/// Dot-files (e.g. macOS `._track.m4a` resource forks) plus, on Windows,
/// entries carrying the hidden attribute.
pub fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.') || has_hidden_attribute(entry)
}

#[cfg(windows)]
fn has_hidden_attribute(entry: &DirEntry) -> bool {
    const FILE_ATTRIBUTE_HIDDEN: u32 = 2;

    if let Ok(metadata) = entry.metadata() {
        use std::os::windows::fs::MetadataExt;
        (metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN) != 0
    } else {
        false
    }
}

#[cfg(not(windows))]
fn has_hidden_attribute(_entry: &DirEntry) -> bool {
    false
}
