//! Shared result types and the command-line subcommands.
use std::path::PathBuf;

use clap::Subcommand;

use crate::{BrainError, Settings};

/// A specialized Result type for quickbrain operations.
pub type Result<T> = std::result::Result<T, BrainError>;

/// Outcome of importing an export document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    /// Notes written to the store
    pub imported: usize,
    /// Note records that were malformed or could not be stored
    pub errors: usize,
    /// Settings carried by the document, for the caller to persist
    pub settings: Option<Settings>,
}

/// Available subcommands for the quickbrain application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new note
    Create {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// Content of the note, can be markdown formatted
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the note's content
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Add the note to the review deck straight away
        #[clap(short, long)]
        memorize: bool,
    },

    /// Open a note for reading (counts as a view)
    View {
        /// ID of the note to view
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Show a note without counting a view
    Peek {
        /// ID of the note to show
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List notes, most recently updated first
    List {
        /// Filter notes by tag
        #[clap(short, long)]
        tag: Option<String>,

        /// Limit the number of notes returned
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Search notes by title, content or tag
    Search {
        /// Search query text
        query: String,

        /// Limit the number of search results (0 for all)
        #[clap(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: String,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// Tags to add (comma-separated)
        #[clap(short, long)]
        add_tags: Option<String>,

        /// Tags to remove (comma-separated)
        #[clap(short, long)]
        remove_tags: Option<String>,
    },

    /// Delete a note by ID
    Delete {
        /// ID of the note to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Add a note to the review deck, or take it out with --off
    Memorize {
        /// ID of the note
        id: String,

        /// Stop memorizing the note
        #[clap(long)]
        off: bool,
    },

    /// Run an interactive review session over the due notes
    Review,

    /// List notes due for review
    Due {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Show a few notes that have not been looked at in a while
    Resurface {
        /// Number of notes to pick (defaults to the resurfaceCount setting)
        #[clap(short = 'n', long)]
        limit: Option<usize>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Notes created a week, a month and a year ago today
    OnThisDay,

    /// Show two random notes side by side
    Mash,

    /// List every tag in use
    Tags,

    /// Export all notes and settings as JSON
    Export {
        /// Path where the export file will be written
        #[clap(short, long)]
        output: PathBuf,
    },

    /// Import notes and settings from an export file
    Import {
        /// Path to the export file
        source: PathBuf,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Update a setting, e.g. resurface_count=3
        #[clap(short, long)]
        set: Option<String>,

        /// Reset settings to defaults
        #[clap(short, long)]
        reset: bool,
    },
}
