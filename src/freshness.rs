//! Recency decay model.
//!
//! A note is fully fresh for three days after it was last viewed, then
//! decays linearly until it is considered forgotten at thirty days.
use std::fmt;

use chrono::{DateTime, Utc};

use crate::{days_between, Note};

/// Days after a view during which a note stays fully fresh.
pub const FRESH_DAYS: f64 = 3.0;

/// Days after a view at which a note is fully forgotten.
pub const FORGOTTEN_DAYS: f64 = 30.0;

/// Discrete bucket derived from a freshness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessLabel {
    Fresh,
    Fading,
    Forgotten,
}

impl FreshnessLabel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            FreshnessLabel::Fresh
        } else if score > 0.3 {
            FreshnessLabel::Fading
        } else {
            FreshnessLabel::Forgotten
        }
    }
}

impl fmt::Display for FreshnessLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FreshnessLabel::Fresh => "Fresh",
            FreshnessLabel::Fading => "Fading",
            FreshnessLabel::Forgotten => "Forgotten",
        };
        f.write_str(label)
    }
}

/// Freshness score in `[0, 1]` for a given number of days since the last view.
pub fn freshness_for_days(days_since_view: f64) -> f64 {
    if days_since_view <= FRESH_DAYS {
        return 1.0;
    }
    if days_since_view >= FORGOTTEN_DAYS {
        return 0.0;
    }
    1.0 - (days_since_view - FRESH_DAYS) / (FORGOTTEN_DAYS - FRESH_DAYS)
}

/// Freshness of `note` as seen at `now`.
pub fn freshness(note: &Note, now: DateTime<Utc>) -> f64 {
    freshness_for_days(days_between(note.last_viewed_at, now))
}

pub fn freshness_label(note: &Note, now: DateTime<Utc>) -> FreshnessLabel {
    FreshnessLabel::from_score(freshness(note, now))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn anchors_hold() {
        assert_eq!(freshness_for_days(0.0), 1.0);
        assert_eq!(freshness_for_days(3.0), 1.0);
        assert_eq!(freshness_for_days(30.0), 0.0);
        assert_eq!(freshness_for_days(400.0), 0.0);
        // Viewed "in the future" by clock skew still counts as fresh.
        assert_eq!(freshness_for_days(-2.0), 1.0);
    }

    #[test]
    fn midpoint_is_one_half() {
        assert!((freshness_for_days(16.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn strictly_decreasing_between_anchors() {
        let mut previous = freshness_for_days(3.0);
        let mut day = 3.25;
        while day < 30.0 {
            let current = freshness_for_days(day);
            assert!(current < previous, "not decreasing at day {}", day);
            previous = current;
            day += 0.25;
        }
    }

    #[test]
    fn labels_follow_thresholds() {
        assert_eq!(FreshnessLabel::from_score(1.0), FreshnessLabel::Fresh);
        assert_eq!(FreshnessLabel::from_score(0.7), FreshnessLabel::Fading);
        assert_eq!(FreshnessLabel::from_score(0.31), FreshnessLabel::Fading);
        assert_eq!(FreshnessLabel::from_score(0.3), FreshnessLabel::Forgotten);
        assert_eq!(FreshnessLabel::Forgotten.to_string(), "Forgotten");
    }

    #[test]
    fn note_freshness_uses_last_view() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut note = Note::new("t".to_string(), String::new(), vec![], now);
        note.last_viewed_at = now - Duration::hours(16 * 24 + 12);

        assert!((freshness(&note, now) - 0.5).abs() < 1e-9);
        assert_eq!(freshness_label(&note, now), FreshnessLabel::Fading);
    }
}
