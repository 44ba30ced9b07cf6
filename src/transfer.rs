//! JSON export and import of the whole note collection.
//!
//! Export format:
//!
//! ```json
//! { "notes": [ ... ], "settings": { ... }, "exportedAt": "2024-05-01T10:00:00Z" }
//! ```
//!
//! On import each note stands alone: a broken record is counted and skipped,
//! while an unreadable document fails the whole import before anything is
//! written.
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{normalize_tags, BrainError, ImportSummary, Note, NoteStore, Result, Settings};

/// The exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub notes: Vec<Note>,
    pub settings: Settings,
    pub exported_at: DateTime<Utc>,
}

/// Serialises every note plus `settings` into the export document.
pub async fn export_data(
    store: &dyn NoteStore,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<String> {
    let bundle = ExportBundle {
        notes: store.all().await?,
        settings: settings.clone(),
        exported_at: now,
    };
    info!("Exporting {} notes", bundle.notes.len());
    Ok(serde_json::to_string_pretty(&bundle)?)
}

fn parse_note(record: Value) -> Result<Note> {
    let mut note: Note = serde_json::from_value(record)?;
    note.tags = normalize_tags(std::mem::take(&mut note.tags));
    note.validate()
        .map_err(|message| BrainError::InvalidFormat { message })?;
    Ok(note)
}

/// Imports an export document, inserting or replacing notes by id.
pub async fn import_data(store: &dyn NoteStore, json: &str) -> Result<ImportSummary> {
    let document: Value = serde_json::from_str(json).map_err(|e| BrainError::ImportFailed {
        message: format!("Invalid JSON format: {}", e),
    })?;
    let Value::Object(mut document) = document else {
        return Err(BrainError::ImportFailed {
            message: "Expected a JSON object at the top level".to_string(),
        });
    };

    let records = match document.remove("notes") {
        Some(Value::Array(records)) => records,
        Some(_) => {
            warn!("Import 'notes' is not an array, no notes imported");
            Vec::new()
        }
        None => Vec::new(),
    };

    let settings = match document.remove("settings") {
        Some(value @ Value::Object(_)) => match serde_json::from_value::<Settings>(value) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("Ignoring unreadable settings in import: {}", e);
                None
            }
        },
        _ => None,
    };

    let mut summary = ImportSummary {
        imported: 0,
        errors: 0,
        settings,
    };

    for (position, record) in records.into_iter().enumerate() {
        let outcome = match parse_note(record) {
            Ok(note) => store.put(note).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => summary.imported += 1,
            Err(e) => {
                warn!("Skipping note #{} in import: {}", position, e);
                summary.errors += 1;
            }
        }
    }

    debug!("Import settings present: {}", summary.settings.is_some());
    info!(
        "Imported {} notes with {} errors",
        summary.imported, summary.errors
    );
    Ok(summary)
}
