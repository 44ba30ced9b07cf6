use log::{debug, info};

use crate::{Note, NoteStore, Result};

/// Case-insensitive substring test over title, content and each tag.
/// `needle` must already be lowercase.
fn matches(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle)
        || note.content.to_lowercase().contains(needle)
        || note.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
}

/// Every note containing `query` in its title, content or tags.
///
/// A blank query returns nothing without touching the store. Results are
/// unranked.
pub async fn search(store: &dyn NoteStore, query: &str) -> Result<Vec<Note>> {
    if query.trim().is_empty() {
        debug!("Blank search query, skipping store");
        return Ok(Vec::new());
    }

    let needle = query.to_lowercase();
    let found = store
        .scan(&|note: &Note| matches(note, &needle))
        .await?;
    info!("Search '{}' matched {} notes", query, found.len());
    Ok(found)
}
