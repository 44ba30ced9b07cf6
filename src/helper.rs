use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use log::{debug, error, trace};

use crate::{BrainError, Note, Result};

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Helper method to load a single note from file
pub fn load_note_from_file(path: &Path) -> Result<Note> {
    debug!("Loading note from file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        error!("Failed to open note file {}: {}", path.display(), e);
        BrainError::Io(e)
    })?;

    let note: Note = serde_json::from_str(&content)?;

    if let Err(message) = note.validate() {
        let error_msg = format!("Note from {} is invalid: {}", path.display(), message);
        error!("{}", error_msg);
        return Err(BrainError::InvalidFormat { message: error_msg });
    }

    trace!("Successfully loaded note: {}", note.id);
    Ok(note)
}

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    normalize_tags(
        tags.map(|t| t.split(',').map(|s| s.to_string()).collect())
            .unwrap_or_default(),
    )
}

/// Trims and lowercases tags, dropping empties and repeats while keeping
/// the first occurrence in place.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

/// Fractional days from `earlier` to `later`; negative if `earlier` is in the future.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / MILLIS_PER_DAY
}
