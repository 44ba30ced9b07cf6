//! The note record and the mutations the rest of the crate relies on.
//!
//! Every content mutation stamps `updated_at`; opening a note for reading
//! goes through [`Note::record_view`]. Timestamps are always passed in so
//! callers (and tests) control the clock.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize_tags;

/// Ease factor given to a note when it starts being memorized.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Lowest ease factor the scheduler will ever store.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for the note
    pub id: String,
    /// Note title
    pub title: String,
    /// Note content in Markdown format
    pub content: String,
    /// Lowercase tags, in the order they were added
    pub tags: Vec<String>,
    /// When the note was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Last time the note was opened for reading
    pub last_viewed_at: DateTime<Utc>,
    /// How many times the note has been opened, starting at 1
    pub view_count: u32,
    /// Whether the note takes part in spaced repetition
    #[serde(default)]
    pub memorize: bool,
    /// When the note is next due for review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_at: Option<DateTime<Utc>>,
    /// Current review interval in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_interval: Option<u32>,
    /// SM-2 ease factor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease_factor: Option<f64>,
}

impl Note {
    /// Creates a new note with the given title and content
    pub fn new(title: String, content: String, tags: Vec<String>, now: DateTime<Utc>) -> Self {
        Note {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            tags: normalize_tags(tags),
            created_at: now,
            updated_at: now,
            last_viewed_at: now,
            view_count: 1,
            memorize: false,
            next_review_at: None,
            review_interval: None,
            ease_factor: None,
        }
    }

    pub fn set_title(&mut self, title: String, now: DateTime<Utc>) {
        self.title = title;
        self.updated_at = now;
    }

    pub fn set_content(&mut self, content: String, now: DateTime<Utc>) {
        self.content = content;
        self.updated_at = now;
    }

    /// Replaces the tag list, normalising it on the way in.
    pub fn set_tags(&mut self, tags: Vec<String>, now: DateTime<Utc>) {
        self.tags = normalize_tags(tags);
        self.updated_at = now;
    }

    /// Appends tags that are not already present.
    pub fn add_tags(&mut self, tags: Vec<String>, now: DateTime<Utc>) {
        let mut merged = std::mem::take(&mut self.tags);
        merged.extend(tags);
        self.set_tags(merged, now);
    }

    pub fn remove_tags(&mut self, tags: &[String], now: DateTime<Utc>) {
        let remove = normalize_tags(tags.to_vec());
        self.tags.retain(|tag| !remove.contains(tag));
        self.updated_at = now;
    }

    /// Turns spaced repetition on or off for this note.
    ///
    /// Switching it on schedules the note as due immediately with a one day
    /// interval and the default ease; switching it off clears the schedule.
    pub fn set_memorize(&mut self, memorize: bool, now: DateTime<Utc>) {
        if memorize && !self.memorize {
            self.next_review_at = Some(now);
            self.review_interval = Some(1);
            self.ease_factor = Some(DEFAULT_EASE_FACTOR);
        } else if !memorize && self.memorize {
            self.next_review_at = None;
            self.review_interval = None;
            self.ease_factor = None;
        }
        self.memorize = memorize;
        self.updated_at = now;
    }

    /// Counts one open-for-read.
    pub fn record_view(&mut self, now: DateTime<Utc>) {
        self.view_count = self.view_count.saturating_add(1);
        self.last_viewed_at = now;
    }

    /// Checks the field invariants a stored note must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("note has an empty id".to_string());
        }
        if self.view_count < 1 {
            return Err(format!("note {} has a view count below 1", self.id));
        }
        if self.review_interval == Some(0) {
            return Err(format!("note {} has a zero review interval", self.id));
        }
        if let Some(ease) = self.ease_factor {
            if !ease.is_finite() || ease < MIN_EASE_FACTOR {
                return Err(format!(
                    "note {} has an ease factor below {}",
                    self.id, MIN_EASE_FACTOR
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_note_starts_with_one_view() {
        let note = Note::new(
            "Title".to_string(),
            String::new(),
            vec!["Rust".to_string(), "rust".to_string()],
            at(1),
        );

        assert_eq!(note.view_count, 1);
        assert_eq!(note.created_at, at(1));
        assert_eq!(note.last_viewed_at, at(1));
        assert_eq!(note.tags, vec!["rust".to_string()]);
        assert!(!note.memorize);
        assert!(note.next_review_at.is_none());
    }

    #[test]
    fn mutations_touch_updated_at_only() {
        let mut note = Note::new("a".to_string(), String::new(), vec![], at(1));
        note.set_content("body".to_string(), at(2));
        assert_eq!(note.updated_at, at(2));
        assert_eq!(note.created_at, at(1));

        note.add_tags(vec!["Work".to_string()], at(3));
        assert_eq!(note.tags, vec!["work".to_string()]);
        assert_eq!(note.updated_at, at(3));

        note.remove_tags(&["WORK".to_string()], at(4));
        assert!(note.tags.is_empty());
        assert_eq!(note.last_viewed_at, at(1));
    }

    #[test]
    fn memorize_toggle_initialises_and_clears_schedule() {
        let mut note = Note::new("a".to_string(), String::new(), vec![], at(1));

        note.set_memorize(true, at(2));
        assert_eq!(note.next_review_at, Some(at(2)));
        assert_eq!(note.review_interval, Some(1));
        assert_eq!(note.ease_factor, Some(DEFAULT_EASE_FACTOR));

        // Turning it on again must not reset an existing schedule.
        note.review_interval = Some(6);
        note.set_memorize(true, at(3));
        assert_eq!(note.review_interval, Some(6));

        note.set_memorize(false, at(4));
        assert!(!note.memorize);
        assert!(note.next_review_at.is_none());
        assert!(note.review_interval.is_none());
        assert!(note.ease_factor.is_none());
    }

    #[test]
    fn record_view_increments_by_one() {
        let mut note = Note::new("a".to_string(), String::new(), vec![], at(1));
        note.record_view(at(1) + Duration::hours(5));
        assert_eq!(note.view_count, 2);
        assert_eq!(note.last_viewed_at, at(1) + Duration::hours(5));
        assert_eq!(note.updated_at, at(1));
    }

    #[test]
    fn validate_rejects_broken_records() {
        let mut note = Note::new("a".to_string(), String::new(), vec![], at(1));
        assert!(note.validate().is_ok());

        note.ease_factor = Some(1.0);
        assert!(note.validate().is_err());

        note.ease_factor = None;
        note.view_count = 0;
        assert!(note.validate().is_err());
    }
}
