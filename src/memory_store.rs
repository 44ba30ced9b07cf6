//! In-memory note store.
//!
//! Implements the same contract as the file-backed store, which makes it the
//! store of choice for tests and throwaway sessions.
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use tokio::sync::RwLock;

use crate::{sort_by_recent_update, BrainError, Note, NotePredicate, NoteStore, Result};

#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: RwLock<HashMap<String, Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with `notes`.
    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let notes = notes
            .into_iter()
            .map(|note| (note.id.clone(), note))
            .collect();
        Self {
            notes: RwLock::new(notes),
        }
    }

    pub async fn len(&self) -> usize {
        self.notes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notes.read().await.is_empty()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Note>> {
        let mut notes = self.notes.write().await;
        match notes.get_mut(id) {
            Some(note) => {
                note.record_view(now);
                trace!("Recorded view {} for note {}", note.view_count, id);
                Ok(Some(note.clone()))
            }
            None => {
                debug!("Note not found: {}", id);
                Ok(None)
            }
        }
    }

    async fn peek(&self, id: &str) -> Result<Option<Note>> {
        Ok(self.notes.read().await.get(id).cloned())
    }

    async fn put(&self, note: Note) -> Result<()> {
        note.validate()
            .map_err(|message| BrainError::InvalidFormat { message })?;
        self.notes.write().await.insert(note.id.clone(), note);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.notes.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(BrainError::NoteNotFound { id: id.to_string() }),
        }
    }

    async fn scan(&self, predicate: NotePredicate<'_>) -> Result<Vec<Note>> {
        Ok(self
            .notes
            .read()
            .await
            .values()
            .filter(|note| predicate(note))
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self.notes.read().await.values().cloned().collect();
        sort_by_recent_update(&mut notes);
        Ok(notes)
    }
}
