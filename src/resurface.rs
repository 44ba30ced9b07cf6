use std::ops::Bound;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rand::{seq::SliceRandom, Rng};

use crate::{Note, NoteField, NoteStore, Result};

/// Notes not viewed for longer than this are candidates for resurfacing.
pub const RESURFACE_AFTER_DAYS: i64 = 7;

/// Picks up to `limit` notes, uniformly at random and without repeats, among
/// those last viewed strictly more than a week before `now`.
pub async fn resurface<R: Rng + ?Sized>(
    store: &dyn NoteStore,
    limit: usize,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Vec<Note>> {
    let cutoff = now - Duration::days(RESURFACE_AFTER_DAYS);
    let stale = store
        .scan_range(
            NoteField::LastViewedAt,
            Bound::Unbounded,
            Bound::Excluded(cutoff),
        )
        .await?;
    debug!("{} notes not viewed since {}", stale.len(), cutoff);

    let picked: Vec<Note> = stale.choose_multiple(rng, limit).cloned().collect();
    info!("Resurfacing {} of {} stale notes", picked.len(), stale.len());
    Ok(picked)
}
