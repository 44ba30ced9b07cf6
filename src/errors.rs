//! Error types for the quickbrain application.
//!
//! This module defines the error type shared by the note store, the
//! retention engine, import/export and the command-line front end.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the quickbrain application.
#[derive(Error, Debug)]
pub enum BrainError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// A recall rating outside the accepted 1..=5 range.
    #[error("Invalid recall quality {quality}: expected a value between 1 and 5")]
    InvalidQuality { quality: i64 },

    /// Invalid note format or content.
    #[error("Invalid note format: {message}")]
    InvalidFormat { message: String },

    /// The import document could not be used at all.
    #[error("Import failed: {message}")]
    ImportFailed { message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },
}
