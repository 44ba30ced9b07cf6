//! SM-2 style spaced repetition.
//!
//! Quality ratings (1-5):
//! - 1, 2: failed recall, the interval resets to one day
//! - 3: correct with serious difficulty
//! - 4: correct after hesitation
//! - 5: perfect recall
//!
//! The scheduling step itself ([`schedule`]) is pure; [`rate`] loads the note,
//! applies it and writes the note back. Ratings of the same note must not be
//! issued concurrently.
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::{BrainError, Note, NoteStore, Result, DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR};

/// A validated recall-quality rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Quality(value as u8))
        } else {
            Err(BrainError::InvalidQuality { quality: value })
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= 3
    }
}

impl TryFrom<i64> for Quality {
    type Error = BrainError;

    fn try_from(value: i64) -> Result<Self> {
        Quality::new(value)
    }
}

/// The scheduling fields of a memorized note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewState {
    pub interval: u32,
    pub ease_factor: f64,
    pub next_review_at: Option<DateTime<Utc>>,
}

impl ReviewState {
    /// Reads the schedule off a note, falling back to a fresh schedule for
    /// fields that were never set.
    pub fn of(note: &Note) -> Self {
        ReviewState {
            interval: note.review_interval.unwrap_or(1).max(1),
            ease_factor: note.ease_factor.unwrap_or(DEFAULT_EASE_FACTOR),
            next_review_at: note.next_review_at,
        }
    }

    fn apply_to(self, note: &mut Note) {
        note.review_interval = Some(self.interval);
        note.ease_factor = Some(self.ease_factor);
        note.next_review_at = self.next_review_at;
    }
}

/// Longest interval a rating can schedule, in days (about a century).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Interval in days the next review would use after a rating of `quality`.
pub fn next_interval(state: &ReviewState, quality: Quality) -> u32 {
    if !quality.is_pass() {
        return 1;
    }
    match state.interval {
        1 => 1,
        2 => 6,
        current => {
            let grown = (f64::from(current) * state.ease_factor).round();
            grown.clamp(1.0, f64::from(MAX_INTERVAL_DAYS)) as u32
        }
    }
}

/// Ease factor after a rating of `quality`; failed recalls leave it untouched.
pub fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    if !quality.is_pass() {
        return ease_factor;
    }
    let miss = f64::from(Quality::MAX - quality.value());
    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    (ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR)
}

/// Advances a schedule by one rating made at `now`.
pub fn schedule(state: &ReviewState, quality: Quality, now: DateTime<Utc>) -> ReviewState {
    let interval = next_interval(state, quality);
    ReviewState {
        interval,
        ease_factor: next_ease_factor(state.ease_factor, quality),
        next_review_at: Some(
            now.checked_add_signed(Duration::days(i64::from(interval)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        ),
    }
}

/// Intervals that ratings 1 through 5 would produce, for showing next to
/// the rating buttons.
pub fn preview_intervals(state: &ReviewState) -> [u32; 5] {
    let mut intervals = [0; 5];
    for (slot, value) in intervals.iter_mut().zip(Quality::MIN..=Quality::MAX) {
        *slot = next_interval(state, Quality(value));
    }
    intervals
}

/// Whether `note` should be shown in a review session at `now`.
pub fn is_due(note: &Note, now: DateTime<Utc>) -> bool {
    note.memorize && note.next_review_at.map_or(true, |at| at <= now)
}

/// Every memorized note whose review time has come.
pub async fn due_notes(store: &dyn NoteStore, now: DateTime<Utc>) -> Result<Vec<Note>> {
    let due = store.scan(&move |note: &Note| is_due(note, now)).await?;
    debug!("{} notes due for review", due.len());
    Ok(due)
}

/// Applies a rating to the stored note and returns the updated note.
///
/// The rating counts as a view for freshness purposes but does not bump the
/// view count. Nothing is written when the note no longer exists.
pub async fn rate(
    store: &dyn NoteStore,
    id: &str,
    quality: Quality,
    now: DateTime<Utc>,
) -> Result<Note> {
    let mut note = store
        .peek(id)
        .await?
        .ok_or_else(|| BrainError::NoteNotFound { id: id.to_string() })?;

    if !note.memorize {
        warn!("Rating note {} which is not flagged for memorization", id);
    }

    let before = ReviewState::of(&note);
    let after = schedule(&before, quality, now);
    after.apply_to(&mut note);
    note.last_viewed_at = now;

    store.put(note.clone()).await?;
    info!(
        "Rated note {} with quality {}: interval {} -> {} days, ease {:.2} -> {:.2}",
        id,
        quality.value(),
        before.interval,
        after.interval,
        before.ease_factor,
        after.ease_factor
    );
    Ok(note)
}

/// A caller-owned review queue.
///
/// The due set is fetched once, walked in order, and fetched again only
/// when the cursor runs off the end, so notes that became due mid-session
/// are picked up.
#[derive(Debug, Default)]
pub struct ReviewSession {
    queue: Vec<Note>,
    cursor: usize,
    revealed: bool,
}

impl ReviewSession {
    pub async fn start(store: &dyn NoteStore, now: DateTime<Utc>) -> Result<Self> {
        let queue = due_notes(store, now).await?;
        info!("Starting review session with {} due notes", queue.len());
        Ok(ReviewSession {
            queue,
            cursor: 0,
            revealed: false,
        })
    }

    /// The note currently being asked, if any remain.
    pub fn current(&self) -> Option<&Note> {
        self.queue.get(self.cursor)
    }

    pub fn remaining(&self) -> usize {
        self.queue.len().saturating_sub(self.cursor)
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Shows the answer for the current note, refreshing it from the store.
    pub async fn reveal(&mut self, store: &dyn NoteStore) -> Result<&Note> {
        let id = match self.current() {
            Some(note) => note.id.clone(),
            None => {
                return Err(BrainError::ApplicationError {
                    message: "No note left to reveal in this session".to_string(),
                })
            }
        };

        let fresh = store
            .peek(&id)
            .await?
            .ok_or(BrainError::NoteNotFound { id })?;
        self.queue[self.cursor] = fresh;
        self.revealed = true;
        Ok(&self.queue[self.cursor])
    }

    /// Rates the current note and moves on to the next one.
    pub async fn rate(
        &mut self,
        store: &dyn NoteStore,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> Result<Note> {
        let id = match self.current() {
            Some(note) => note.id.clone(),
            None => {
                return Err(BrainError::ApplicationError {
                    message: "No note left to rate in this session".to_string(),
                })
            }
        };

        let rated = rate(store, &id, quality, now).await?;

        self.cursor += 1;
        self.revealed = false;
        if self.cursor >= self.queue.len() {
            self.queue = due_notes(store, now).await?;
            self.cursor = 0;
            debug!("Review queue refilled with {} notes", self.queue.len());
        }
        Ok(rated)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::MemoryNoteStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()
    }

    fn q(value: i64) -> Quality {
        Quality::new(value).unwrap()
    }

    fn state(interval: u32, ease_factor: f64) -> ReviewState {
        ReviewState {
            interval,
            ease_factor,
            next_review_at: None,
        }
    }

    fn memorized(title: &str) -> Note {
        let mut note = Note::new(title.to_string(), String::new(), vec![], now());
        note.set_memorize(true, now());
        note
    }

    #[tokio::test]
    async fn huge_imported_interval_is_capped_instead_of_overflowing() {
        let mut note = memorized("ancient");
        note.review_interval = Some(50_000_000);
        let store = MemoryNoteStore::with_notes([note.clone()]);

        let rated = rate(&store, &note.id, q(5), now()).await.unwrap();
        assert_eq!(rated.review_interval, Some(MAX_INTERVAL_DAYS));
        assert_eq!(
            rated.next_review_at,
            Some(now() + Duration::days(i64::from(MAX_INTERVAL_DAYS)))
        );
    }

    #[test]
    fn schedule_saturates_at_the_latest_representable_instant() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(3);
        let next = schedule(&state(30, 2.5), q(5), late);
        assert_eq!(next.next_review_at, Some(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn quality_outside_range_is_rejected() {
        assert!(matches!(
            Quality::new(0),
            Err(BrainError::InvalidQuality { quality: 0 })
        ));
        assert!(Quality::new(6).is_err());
        assert!(Quality::try_from(-3).is_err());
        assert_eq!(q(5).value(), 5);
    }

    #[test]
    fn first_intervals_bypass_the_ease_factor() {
        let after = schedule(&state(1, 2.5), q(4), now());
        assert_eq!(after.interval, 1);
        assert!(after.ease_factor >= 2.5);
        assert_eq!(after.next_review_at, Some(now() + Duration::days(1)));

        let after = schedule(&state(2, 2.5), q(4), now());
        assert_eq!(after.interval, 6);
    }

    #[test]
    fn perfect_recall_raises_ease() {
        let after = schedule(&state(1, 2.5), q(5), now());
        assert!((after.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn larger_intervals_grow_by_ease() {
        let ease = 2.6;
        let after = schedule(&state(6, ease), q(5), now());
        assert_eq!(after.interval, (6.0_f64 * ease).round() as u32);
        assert_eq!(after.interval, 16);
    }

    #[test]
    fn failed_recall_resets_interval_and_keeps_ease() {
        for quality in [1, 2] {
            let after = schedule(&state(16, 2.2), q(quality), now());
            assert_eq!(after.interval, 1);
            assert_eq!(after.ease_factor, 2.2);
        }
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let mut current = state(3, 2.5);
        for _ in 0..50 {
            current = schedule(&current, q(3), now());
            assert!(current.ease_factor >= MIN_EASE_FACTOR);
        }
        assert_eq!(current.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn preview_matches_schedule() {
        let current = state(6, 2.5);
        assert_eq!(preview_intervals(&current), [1, 1, 15, 15, 15]);
    }

    #[test]
    fn due_requires_memorize_and_elapsed_time() {
        let mut note = memorized("due");
        assert!(is_due(&note, now()));

        note.next_review_at = Some(now() + Duration::days(1));
        assert!(!is_due(&note, now()));

        note.next_review_at = None;
        assert!(is_due(&note, now()));

        note.memorize = false;
        assert!(!is_due(&note, now()));
    }

    #[tokio::test]
    async fn rate_persists_schedule_and_view_time() {
        let note = memorized("card");
        let store = MemoryNoteStore::with_notes([note.clone()]);
        let later = now() + Duration::hours(3);

        let rated = rate(&store, &note.id, q(5), later).await.unwrap();
        assert_eq!(rated.review_interval, Some(1));
        assert_eq!(rated.next_review_at, Some(later + Duration::days(1)));
        assert_eq!(rated.last_viewed_at, later);
        assert_eq!(rated.view_count, 1);
        assert_eq!(store.peek(&note.id).await.unwrap(), Some(rated));
    }

    #[tokio::test]
    async fn rate_on_missing_note_is_not_found() {
        let store = MemoryNoteStore::new();
        assert!(matches!(
            rate(&store, "missing", q(4), now()).await,
            Err(BrainError::NoteNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn session_walks_queue_then_refetches() {
        let first = memorized("first");
        let second = memorized("second");
        let mut not_due = memorized("later");
        not_due.next_review_at = Some(now() + Duration::hours(1));
        let store = MemoryNoteStore::with_notes([first, second, not_due.clone()]);

        let mut session = ReviewSession::start(&store, now()).await.unwrap();
        assert_eq!(session.remaining(), 2);

        session.reveal(&store).await.unwrap();
        assert!(session.is_revealed());
        session.rate(&store, q(4), now()).await.unwrap();
        assert!(!session.is_revealed());
        assert_eq!(session.remaining(), 1);

        // Two hours in, the third note has become due and is picked up on refill.
        let later = now() + Duration::hours(2);
        session.rate(&store, q(4), later).await.unwrap();
        assert_eq!(session.remaining(), 1);
        assert_eq!(session.current().map(|n| n.id.clone()), Some(not_due.id));
    }

    #[tokio::test]
    async fn session_reports_deleted_note() {
        let note = memorized("deleted");
        let store = MemoryNoteStore::with_notes([note.clone()]);
        let mut session = ReviewSession::start(&store, now()).await.unwrap();

        store.delete(&note.id).await.unwrap();
        assert!(matches!(
            session.reveal(&store).await,
            Err(BrainError::NoteNotFound { .. })
        ));
        assert!(matches!(
            session.rate(&store, q(4), now()).await,
            Err(BrainError::NoteNotFound { .. })
        ));
        assert_eq!(session.remaining(), 1);
    }
}
