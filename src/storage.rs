use std::{
    collections::{BTreeSet, HashMap},
    fs,
    io::Write,
    ops::{Bound, RangeBounds},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::{load_note_from_file, BrainError, Note, Result};

/// Borrowed filter used by [`NoteStore::scan`].
pub type NotePredicate<'a> = &'a (dyn Fn(&Note) -> bool + Send + Sync);

/// Timestamp fields a store can be range-scanned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteField {
    CreatedAt,
    UpdatedAt,
    LastViewedAt,
    NextReviewAt,
}

impl NoteField {
    /// The value of this field on `note`, if it has one.
    pub fn value_of(self, note: &Note) -> Option<DateTime<Utc>> {
        match self {
            NoteField::CreatedAt => Some(note.created_at),
            NoteField::UpdatedAt => Some(note.updated_at),
            NoteField::LastViewedAt => Some(note.last_viewed_at),
            NoteField::NextReviewAt => note.next_review_at,
        }
    }
}

/// Durable keyed record store the retention engine reads and writes.
///
/// `get` is a read with a side effect: it counts a view. Use `peek` for
/// reads that must leave the note untouched.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Fetches a note for display, recording the view before returning it.
    async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Note>>;

    /// Fetches a note without counting a view.
    async fn peek(&self, id: &str) -> Result<Option<Note>>;

    /// Inserts or replaces a note by id.
    async fn put(&self, note: Note) -> Result<()>;

    /// Removes a note permanently.
    async fn delete(&self, id: &str) -> Result<()>;

    /// All notes matching `predicate`, in no particular order.
    async fn scan(&self, predicate: NotePredicate<'_>) -> Result<Vec<Note>>;

    /// All notes, most recently updated first.
    async fn all(&self) -> Result<Vec<Note>>;

    /// Notes whose `field` lies within `(lo, hi)`. Notes without a value for
    /// `field` never match.
    async fn scan_range(
        &self,
        field: NoteField,
        lo: Bound<DateTime<Utc>>,
        hi: Bound<DateTime<Utc>>,
    ) -> Result<Vec<Note>> {
        self.scan(&move |note: &Note| {
            field
                .value_of(note)
                .is_some_and(|value| (lo, hi).contains(&value))
        })
        .await
    }

    /// Every distinct tag in use, sorted.
    async fn all_tags(&self) -> Result<Vec<String>> {
        let notes = self.scan(&|_: &Note| true).await?;
        let tags: BTreeSet<String> = notes.into_iter().flat_map(|note| note.tags).collect();
        Ok(tags.into_iter().collect())
    }

    /// Notes carrying exactly `tag`.
    async fn notes_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        let search_tag = tag.trim().to_lowercase();
        self.scan(&move |note: &Note| note.tags.iter().any(|t| *t == search_tag))
            .await
    }

    /// Notes flagged for memorization, due or not.
    async fn memorized(&self) -> Result<Vec<Note>> {
        self.scan(&|note: &Note| note.memorize).await
    }
}

/// Sorts notes the way [`NoteStore::all`] promises: newest update first.
pub fn sort_by_recent_update(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Ids become file names, so they must not be able to escape the notes directory.
fn ensure_storable_id(id: &str) -> Result<()> {
    // The first two characters become a directory name, so neither may be
    // "." or "..".
    if id.trim().is_empty()
        || id == "."
        || id.contains("..")
        || id.contains(['/', '\\'])
        || id.contains('\0')
    {
        return Err(BrainError::InvalidFormat {
            message: format!("Note id '{}' cannot be stored", id),
        });
    }
    Ok(())
}

/// Stores each note as a JSON file and keeps every note cached in memory.
pub struct FileNoteStorage {
    /// Root directory holding the note files
    notes_dir: PathBuf,

    /// In-memory cache of notes, indexed by note ID
    notes_cache: Arc<Mutex<HashMap<String, Note>>>,
}

impl FileNoteStorage {
    /// Opens the notes directory, creating it if needed, and loads every note.
    pub fn open(notes_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut storage = Self {
            notes_dir: notes_dir.into(),
            notes_cache: Arc::new(Mutex::new(HashMap::new())),
        };

        info!(
            "Initializing FileNoteStorage in {}",
            storage.notes_dir.display()
        );

        if !storage.notes_dir.exists() {
            debug!(
                "Notes directory does not exist, creating: {}",
                storage.notes_dir.display()
            );
            fs::create_dir_all(&storage.notes_dir).map_err(|e| {
                error!("Failed to create notes directory: {}", e);
                BrainError::DirectoryError {
                    path: storage.notes_dir.clone(),
                }
            })?;
        }

        storage.load_notes()?;
        Ok(storage)
    }

    pub fn notes_dir(&self) -> &Path {
        &self.notes_dir
    }

    /// Loads all notes from disk into the in-memory cache
    ///
    /// # Returns
    ///
    /// The number of notes loaded in case of success or an error
    pub fn load_notes(&mut self) -> Result<usize> {
        let mut notes_buffer = HashMap::new();
        let mut load_errors = 0usize;

        for entry in WalkDir::new(&self.notes_dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                match load_note_from_file(path) {
                    Ok(note) => {
                        notes_buffer.insert(note.id.clone(), note);
                    }
                    Err(e) => {
                        // Collect errors but continue processing
                        warn!("Failed to load note from {}: {}", path.display(), e);
                        load_errors += 1;
                    }
                }
            }
        }

        let notes_count = notes_buffer.len();

        {
            let mut cache = self.lock_cache()?;
            cache.clear();
            cache.extend(notes_buffer);
        }

        if load_errors > 0 {
            error!("Encountered {} errors while loading notes", load_errors);
        }

        info!("Loaded {} notes into cache", notes_count);
        Ok(notes_count)
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Note>>> {
        self.notes_cache
            .lock()
            .map_err(|_| BrainError::LockAcquisitionFailed {
                message: "Failed to acquire lock on notes cache".to_string(),
            })
    }

    /// Helper method to get the file path for a note
    fn get_note_path(&self, note_id: &str) -> PathBuf {
        // notes_dir/first_2_chars_of_id/note_id.json
        let id_prefix: String = note_id.chars().take(2).collect();

        self.notes_dir
            .join(id_prefix)
            .join(format!("{}.json", note_id))
    }

    /// Writes a note file atomically and refreshes the cache entry.
    fn save_note(&self, note: &Note) -> Result<()> {
        ensure_storable_id(&note.id)?;
        note.validate()
            .map_err(|message| BrainError::InvalidFormat { message })?;

        let file_path = self.get_note_path(&note.id);
        debug!("Saving note {} to {}", note.id, file_path.display());

        let dir = file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.notes_dir.clone());
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                error!("Failed to create directory {}: {}", dir.display(), e);
                BrainError::Io(e)
            })?;
        }

        let mut temp_file = NamedTempFile::new_in(&dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            BrainError::Io(e)
        })?;

        trace!("Serializing note to JSON");
        let json = serde_json::to_string_pretty(note)?;

        temp_file.write_all(json.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            BrainError::Io(e)
        })?;
        temp_file.flush()?;

        temp_file.persist(&file_path).map_err(|e| {
            error!(
                "Failed to persist file {}: {}",
                file_path.display(),
                e.error
            );
            BrainError::Io(e.error)
        })?;

        self.lock_cache()?.insert(note.id.clone(), note.clone());
        trace!("Note saved: {}", note.id);
        Ok(())
    }

    fn remove_note(&self, note_id: &str) -> Result<()> {
        info!("Deleting note: {}", note_id);

        if self.lock_cache()?.remove(note_id).is_none() {
            error!("Cannot delete note {}: Note not found", note_id);
            return Err(BrainError::NoteNotFound {
                id: note_id.to_string(),
            });
        }

        let file_path = self.get_note_path(note_id);
        if file_path.exists() {
            fs::remove_file(&file_path).map_err(|e| {
                error!("Failed to delete note file {}: {}", file_path.display(), e);
                BrainError::Io(e)
            })?;
        }

        if let Some(parent) = file_path.parent() {
            self.cleanup_empty_directory(parent);
        }

        Ok(())
    }

    /// Removes a prefix directory once its last note is gone
    fn cleanup_empty_directory(&self, dir_path: &Path) {
        if dir_path == self.notes_dir {
            return;
        }
        let is_empty = fs::read_dir(dir_path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            match fs::remove_dir(dir_path) {
                Ok(_) => debug!("Removed empty directory: {}", dir_path.display()),
                Err(e) => warn!(
                    "Failed to remove empty directory {}: {}",
                    dir_path.display(),
                    e
                ),
            }
        }
    }
}

#[async_trait]
impl NoteStore for FileNoteStorage {
    async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Note>> {
        debug!("Retrieving note by ID: {}", id);
        let viewed = {
            let cache = self.lock_cache()?;
            cache.get(id).cloned()
        };

        match viewed {
            Some(mut note) => {
                note.record_view(now);
                self.save_note(&note)?;
                Ok(Some(note))
            }
            None => {
                debug!("Note not found: {}", id);
                Ok(None)
            }
        }
    }

    async fn peek(&self, id: &str) -> Result<Option<Note>> {
        Ok(self.lock_cache()?.get(id).cloned())
    }

    async fn put(&self, note: Note) -> Result<()> {
        self.save_note(&note)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.remove_note(id)
    }

    async fn scan(&self, predicate: NotePredicate<'_>) -> Result<Vec<Note>> {
        let cache = self.lock_cache()?;
        let matching: Vec<Note> = cache
            .values()
            .filter(|note| predicate(note))
            .cloned()
            .collect();
        trace!(
            "Scan matched {} of {} cached notes",
            matching.len(),
            cache.len()
        );
        Ok(matching)
    }

    async fn all(&self) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self.lock_cache()?.values().cloned().collect();
        sort_by_recent_update(&mut notes);
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
    }

    fn note(title: &str) -> Note {
        Note::new(title.to_string(), format!("{} body", title), vec![], base())
    }

    #[tokio::test]
    async fn notes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let first = note("first");
        {
            let storage = FileNoteStorage::open(dir.path()).unwrap();
            storage.put(first.clone()).await.unwrap();
        }

        let reopened = FileNoteStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.peek(&first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn get_records_a_view_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileNoteStorage::open(dir.path()).unwrap();
        let n = note("viewed");
        storage.put(n.clone()).await.unwrap();

        let later = base() + Duration::days(2);
        let fetched = storage.get(&n.id, later).await.unwrap().unwrap();
        assert_eq!(fetched.view_count, 2);
        assert_eq!(fetched.last_viewed_at, later);

        let reopened = FileNoteStorage::open(dir.path()).unwrap();
        let stored = reopened.peek(&n.id).await.unwrap().unwrap();
        assert_eq!(stored.view_count, 2);
    }

    #[tokio::test]
    async fn delete_removes_file_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileNoteStorage::open(dir.path()).unwrap();
        let n = note("gone");
        storage.put(n.clone()).await.unwrap();

        storage.delete(&n.id).await.unwrap();
        assert!(storage.peek(&n.id).await.unwrap().is_none());
        assert!(!storage.get_note_path(&n.id).exists());
        assert!(matches!(
            storage.delete(&n.id).await,
            Err(BrainError::NoteNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unsafe_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileNoteStorage::open(dir.path()).unwrap();
        let mut n = note("escape");
        n.id = "../outside".to_string();

        assert!(matches!(
            storage.put(n).await,
            Err(BrainError::InvalidFormat { .. })
        ));
    }

    #[tokio::test]
    async fn dotted_ids_cannot_escape_the_notes_dir() {
        let root = tempfile::tempdir().unwrap();
        let notes_dir = root.path().join("notes");
        let storage = FileNoteStorage::open(&notes_dir).unwrap();

        for id in ["..evil", ".", "a..b"] {
            let mut n = note("escape");
            n.id = id.to_string();
            assert!(
                matches!(storage.put(n).await, Err(BrainError::InvalidFormat { .. })),
                "id {:?} was accepted",
                id
            );
        }

        let mut evil = note("imported");
        evil.id = "..evil".to_string();
        let document = serde_json::json!({ "notes": [evil] }).to_string();
        let summary = crate::import_data(&storage, &document).await.unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.errors, 1);

        assert!(!root.path().join("..evil.json").exists());
        assert!(storage.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_files_are_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let good = note("good");
        {
            let storage = FileNoteStorage::open(dir.path()).unwrap();
            storage.put(good.clone()).await.unwrap();
        }
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let storage = FileNoteStorage::open(dir.path()).unwrap();
        assert_eq!(storage.all().await.unwrap(), vec![good]);
    }

    #[tokio::test]
    async fn scan_range_excludes_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileNoteStorage::open(dir.path()).unwrap();
        let plain = note("plain");
        let mut scheduled = note("scheduled");
        scheduled.set_memorize(true, base());
        storage.put(plain).await.unwrap();
        storage.put(scheduled.clone()).await.unwrap();

        let found = storage
            .scan_range(
                NoteField::NextReviewAt,
                Bound::Unbounded,
                Bound::Included(base()),
            )
            .await
            .unwrap();
        assert_eq!(found, vec![scheduled]);
    }
}
