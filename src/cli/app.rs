//! CLI module for the quickbrain application
//!
//! This module turns parsed subcommands into calls on the note store and
//! the retention engine, and renders the results for the terminal.
use std::{
    fs::{self, read_to_string},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{Local, Utc};
use console::style;
use log::{debug, info};

use crate::{
    due_notes, export_data, freshness, import_data, mash, on_this_day, parse_tags,
    preview_intervals, resurface, search, BrainError, Commands, Config, FreshnessLabel, Note,
    NoteStore, Quality, Result, ReviewSession, ReviewState, Serendipity, Settings,
};

/// CLI Application handler - processes CLI commands against a note store
pub struct App {
    /// The note storage backend
    store: Arc<dyn NoteStore>,

    /// Application configuration
    config: Config,

    /// Where `config` is persisted when settings change
    config_path: PathBuf,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application with the given storage backend and config
    pub fn new(
        store: Arc<dyn NoteStore>,
        config: Config,
        config_path: PathBuf,
        verbose: bool,
    ) -> Self {
        Self {
            store,
            config,
            config_path,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        debug!("Running command: {:?}", command);
        match command {
            Commands::Create {
                title,
                content,
                file,
                tags,
                memorize,
            } => self.create_note(title, content, file, tags, memorize).await,
            Commands::View { id, json } => self.view_note(&id, json, true).await,
            Commands::Peek { id, json } => self.view_note(&id, json, false).await,
            Commands::List { tag, limit, json } => self.list_notes(tag, limit, json).await,
            Commands::Search { query, limit, json } => {
                self.handle_search(&query, limit, json).await
            }
            Commands::Edit {
                id,
                title,
                content,
                add_tags,
                remove_tags,
            } => {
                self.handle_edit(&id, title, content, add_tags, remove_tags)
                    .await
            }
            Commands::Delete { id, force } => self.handle_delete(&id, force).await,
            Commands::Memorize { id, off } => self.handle_memorize(&id, !off).await,
            Commands::Review => self.handle_review().await,
            Commands::Due { json } => self.handle_due(json).await,
            Commands::Resurface { limit, json } => self.handle_resurface(limit, json).await,
            Commands::OnThisDay => self.handle_on_this_day().await,
            Commands::Mash => self.handle_mash().await,
            Commands::Tags => self.handle_tags().await,
            Commands::Export { output } => self.handle_export(&output).await,
            Commands::Import { source } => self.handle_import(&source).await,
            Commands::Config { show, set, reset } => self.handle_config(show, set, reset),
        }
    }

    async fn create_note(
        &self,
        title: Option<String>,
        content: Option<String>,
        file: Option<PathBuf>,
        tags: Option<String>,
        memorize: bool,
    ) -> Result<()> {
        let note_content = match (content, file) {
            (Some(_), Some(_)) => {
                return Err(BrainError::ApplicationError {
                    message: "Cannot specify both --content and --file options".to_string(),
                })
            }
            (Some(c), None) => c,
            (None, Some(file_path)) => read_content_from_file(&file_path)?,
            (None, None) => String::new(),
        };

        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        let now = Utc::now();
        let mut note = Note::new(title, note_content, parse_tags(tags), now);
        if memorize {
            note.set_memorize(true, now);
        }

        self.store.put(note.clone()).await?;
        println!("Note created with ID: {}", note.id);
        Ok(())
    }

    async fn view_note(&self, id: &str, json: bool, count_view: bool) -> Result<()> {
        let note = if count_view {
            self.store.get(id, Utc::now()).await?
        } else {
            self.store.peek(id).await?
        }
        .ok_or_else(|| BrainError::NoteNotFound { id: id.to_string() })?;

        if json {
            println!("{}", serde_json::to_string_pretty(&note)?);
            return Ok(());
        }

        self.print_note_header(&note);
        println!(
            "Views: {} | Last viewed: {}",
            note.view_count,
            note.last_viewed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
        if note.memorize {
            let state = ReviewState::of(&note);
            println!(
                "Memorizing: every {} day(s), ease {:.2}, next review {}",
                state.interval,
                state.ease_factor,
                state
                    .next_review_at
                    .map(|at| at.with_timezone(&Local).format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "now".to_string())
            );
        }
        if !note.content.is_empty() {
            println!("\n{}", note.content);
        }
        Ok(())
    }

    async fn list_notes(&self, tag: Option<String>, limit: usize, json: bool) -> Result<()> {
        let mut notes = match tag {
            Some(tag) => {
                let mut tagged = self.store.notes_by_tag(&tag).await?;
                crate::sort_by_recent_update(&mut tagged);
                tagged
            }
            None => self.store.all().await?,
        };
        notes.truncate(limit);
        self.display_notes(&notes, json)
    }

    async fn handle_search(&self, query: &str, limit: usize, json: bool) -> Result<()> {
        let mut results = search(self.store.as_ref(), query).await?;
        crate::sort_by_recent_update(&mut results);

        if limit > 0 {
            results.truncate(limit);
        }

        if results.is_empty() && !json {
            println!("No notes found matching query: \"{}\"", query);
            return Ok(());
        }
        self.display_notes(&results, json)
    }

    async fn handle_edit(
        &self,
        id: &str,
        title: Option<String>,
        content: Option<String>,
        add_tags: Option<String>,
        remove_tags: Option<String>,
    ) -> Result<()> {
        let mut note = self
            .store
            .peek(id)
            .await?
            .ok_or_else(|| BrainError::NoteNotFound { id: id.to_string() })?;

        let now = Utc::now();
        let mut changed = false;

        if let Some(new_title) = title {
            note.set_title(new_title, now);
            changed = true;
        }
        if let Some(new_content) = content {
            note.set_content(new_content, now);
            changed = true;
        }
        if add_tags.is_some() {
            note.add_tags(parse_tags(add_tags), now);
            changed = true;
        }
        if remove_tags.is_some() {
            note.remove_tags(&parse_tags(remove_tags), now);
            changed = true;
        }

        if !changed {
            println!("Nothing to change for note {}", note.id);
            return Ok(());
        }

        self.store.put(note.clone()).await?;
        println!("Note {} updated successfully", note.id);
        Ok(())
    }

    async fn handle_delete(&self, id: &str, force: bool) -> Result<()> {
        let note = self
            .store
            .peek(id)
            .await?
            .ok_or_else(|| BrainError::NoteNotFound { id: id.to_string() })?;

        if !force {
            println!("You are about to delete the following note:");
            println!("ID:     {}", note.id);
            println!("Title:  {}", note.title);
            println!("Tags:   {}", note.tags.join(", "));
            println!("\nThis action cannot be undone!");

            let input = prompt("Are you sure you want to delete this note? [y/N]: ")?;
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        self.store.delete(id).await?;
        println!(
            "Note '{}' ({}) has been permanently deleted.",
            note.title, note.id
        );
        Ok(())
    }

    async fn handle_memorize(&self, id: &str, memorize: bool) -> Result<()> {
        let mut note = self
            .store
            .peek(id)
            .await?
            .ok_or_else(|| BrainError::NoteNotFound { id: id.to_string() })?;

        note.set_memorize(memorize, Utc::now());
        self.store.put(note.clone()).await?;

        if memorize {
            println!("'{}' added to the review deck", note.title);
        } else {
            println!("'{}' removed from the review deck", note.title);
        }
        Ok(())
    }

    /// Interactive quiz: show the title, reveal the content, ask for a rating.
    async fn handle_review(&self) -> Result<()> {
        let store = self.store.as_ref();
        let mut session = ReviewSession::start(store, Utc::now()).await?;
        let mut reviewed = 0usize;

        while let Some(note) = session.current() {
            println!(
                "\n{} ({} left)",
                style(&note.title).bold(),
                session.remaining()
            );
            if !note.tags.is_empty() {
                println!("{}", style(format_tags(&note.tags)).cyan());
            }

            if prompt("Try to recall it, then press Enter to reveal (q to quit): ")? == "q" {
                break;
            }

            let state = match session.reveal(store).await.cloned() {
                Ok(revealed) => {
                    println!(
                        "\n{}\n",
                        if revealed.content.is_empty() {
                            "(no content)"
                        } else {
                            revealed.content.as_str()
                        }
                    );
                    ReviewState::of(&revealed)
                }
                Err(BrainError::NoteNotFound { id }) => {
                    println!("Note {} was deleted, reloading the review queue", id);
                    session = ReviewSession::start(store, Utc::now()).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let intervals = preview_intervals(&state);
            let quality = loop {
                let answer = prompt(&format!(
                    "Rate your recall 1-5 (1={}d 3={}d 5={}d, q to quit): ",
                    intervals[0], intervals[2], intervals[4]
                ))?;
                if answer == "q" {
                    break None;
                }
                match answer.parse::<i64>() {
                    Ok(value) => match Quality::new(value) {
                        Ok(quality) => break Some(quality),
                        Err(e) => println!("{}", e),
                    },
                    Err(_) => println!("Please enter a number between 1 and 5"),
                }
            };
            let Some(quality) = quality else {
                break;
            };

            match session.rate(store, quality, Utc::now()).await {
                Ok(rated) => {
                    reviewed += 1;
                    println!(
                        "Next review in {} day(s)",
                        rated.review_interval.unwrap_or(1)
                    );
                }
                Err(BrainError::NoteNotFound { id }) => {
                    println!("Note {} was deleted, reloading the review queue", id);
                    session = ReviewSession::start(store, Utc::now()).await?;
                }
                Err(e) => return Err(e),
            }
        }

        if reviewed == 0 && session.current().is_none() {
            println!("All caught up! No notes are due for review.");
        } else {
            println!("\nReviewed {} note(s).", reviewed);
        }
        info!("Review session finished after {} ratings", reviewed);
        Ok(())
    }

    async fn handle_due(&self, json: bool) -> Result<()> {
        let due = due_notes(self.store.as_ref(), Utc::now()).await?;
        if due.is_empty() && !json {
            println!("No notes are due for review.");
            return Ok(());
        }
        self.display_notes(&due, json)
    }

    async fn handle_resurface(&self, limit: Option<usize>, json: bool) -> Result<()> {
        let limit = limit.unwrap_or(self.config.settings.resurface_count);
        let notes = resurface(
            self.store.as_ref(),
            limit,
            Utc::now(),
            &mut rand::thread_rng(),
        )
        .await?;

        if notes.is_empty() && !json {
            println!("Nothing to resurface: every note was viewed within the last week.");
            return Ok(());
        }
        if !json {
            println!("{}", style("Remember these?").bold().yellow());
        }
        self.display_notes(&notes, json)
    }

    async fn handle_on_this_day(&self) -> Result<()> {
        let anniversaries = on_this_day(self.store.as_ref(), &Local::now()).await?;
        if anniversaries.is_empty() {
            println!("No notes were written on this day a week, a month or a year ago.");
            return Ok(());
        }

        for anniversary in anniversaries {
            println!("\n{}", style(anniversary.period.label()).bold().magenta());
            self.display_notes(&anniversary.notes, false)?;
        }
        Ok(())
    }

    async fn handle_mash(&self) -> Result<()> {
        match mash(self.store.as_ref(), &mut rand::thread_rng()).await? {
            Serendipity::Pair(first, second) => {
                println!("{}", style("What connects these two?").bold().green());
                self.display_notes(&[first, second], false)
            }
            Serendipity::Unavailable => {
                println!("Serendipity needs at least two notes.");
                Ok(())
            }
        }
    }

    async fn handle_tags(&self) -> Result<()> {
        let tags = self.store.all_tags().await?;
        if tags.is_empty() {
            println!("No tags in use.");
        } else {
            println!("{}", format_tags(&tags));
        }
        Ok(())
    }

    async fn handle_export(&self, output: &Path) -> Result<()> {
        let json = export_data(self.store.as_ref(), &self.config.settings, Utc::now()).await?;
        fs::write(output, json)?;
        println!("Exported notes to {}", output.display());
        Ok(())
    }

    async fn handle_import(&mut self, source: &Path) -> Result<()> {
        let json = read_content_from_file(source)?;
        let summary = import_data(self.store.as_ref(), &json).await?;

        if let Some(settings) = summary.settings {
            self.config.settings = settings;
            self.config.save(&self.config_path)?;
        }

        print!("Imported {} notes", summary.imported);
        if summary.errors > 0 {
            print!(" ({} errors)", summary.errors);
        }
        println!();
        Ok(())
    }

    fn handle_config(&mut self, show: bool, set: Option<String>, reset: bool) -> Result<()> {
        let show = show || (set.is_none() && !reset);

        if reset {
            self.config.settings = Settings::default();
            self.config.save(&self.config_path)?;
            println!("Settings reset to defaults");
        }

        if let Some(assignment) = set {
            self.config.settings.set(&assignment)?;
            self.config.save(&self.config_path)?;
            println!("Updated {}", assignment);
        }

        if show {
            println!("Configuration file: {}", self.config_path.display());
            println!("{}", serde_json::to_string_pretty(&self.config)?);
        }
        Ok(())
    }

    /// Display notes in the requested format
    fn display_notes(&self, notes: &[Note], json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(notes)?);
            return Ok(());
        }

        if notes.is_empty() {
            println!("No notes found matching the criteria.");
            return Ok(());
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }
            self.print_note_header(note);

            let preview = content_preview(&note.content, term_width.min(100));
            if !preview.is_empty() {
                println!("{}", preview);
            }
        }

        if self.verbose {
            println!(
                "\n{} note{}",
                notes.len(),
                if notes.len() == 1 { "" } else { "s" }
            );
        }
        Ok(())
    }

    fn print_note_header(&self, note: &Note) {
        let score = freshness(note, Utc::now());
        let label = FreshnessLabel::from_score(score);
        let label = match label {
            FreshnessLabel::Fresh => style(label.to_string()).green(),
            FreshnessLabel::Fading => style(label.to_string()).yellow(),
            FreshnessLabel::Forgotten => style(label.to_string()).red(),
        };

        println!(
            "ID: {} | Created: {} | {} ({:.0}%)",
            note.id,
            note.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            label,
            score * 100.0
        );
        println!("Title: {}", style(&note.title).bold());
        if !note.tags.is_empty() {
            println!("Tags: {}", style(format_tags(&note.tags)).cyan());
        }
    }
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(" ")
}

/// First non-empty line, cut to `max_len` characters
fn content_preview(content: &str, max_len: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_len).collect();
        format!("{}...", cut)
    }
}

fn read_content_from_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(BrainError::ApplicationError {
            message: format!("File not found: {}", path.display()),
        });
    }
    read_to_string(path).map_err(BrainError::Io)
}

/// Prints `message` and reads one trimmed, lowercased line from stdin.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    stdout().flush().map_err(BrainError::Io)?;

    let mut input = String::new();
    stdin().read_line(&mut input).map_err(BrainError::Io)?;
    Ok(input.trim().to_lowercase())
}
