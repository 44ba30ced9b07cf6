//! "On this day" recall: notes created exactly a week, a month or a year
//! before today, by local calendar day.
use std::{fmt, ops::Bound};

use chrono::{DateTime, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use log::debug;

use crate::{Note, NoteField, NoteStore, Result};

/// The fixed look-back periods, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallPeriod {
    WeekAgo,
    MonthAgo,
    YearAgo,
}

impl RecallPeriod {
    pub const ALL: [RecallPeriod; 3] = [
        RecallPeriod::WeekAgo,
        RecallPeriod::MonthAgo,
        RecallPeriod::YearAgo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RecallPeriod::WeekAgo => "1 week ago",
            RecallPeriod::MonthAgo => "1 month ago",
            RecallPeriod::YearAgo => "1 year ago",
        }
    }

    /// The calendar day this period points at, counted back from `today`.
    ///
    /// Month and year steps clamp to the last day of a shorter month, so
    /// March 31st looks back to February 28th (or 29th) and February 29th
    /// looks back a year to February 28th.
    pub fn target_date(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            RecallPeriod::WeekAgo => today.checked_sub_days(Days::new(7)),
            RecallPeriod::MonthAgo => today.checked_sub_months(Months::new(1)),
            RecallPeriod::YearAgo => today.checked_sub_months(Months::new(12)),
        }
    }
}

impl fmt::Display for RecallPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Notes created on the day a period points at.
#[derive(Debug, Clone, PartialEq)]
pub struct Anniversary {
    pub period: RecallPeriod,
    pub notes: Vec<Note>,
}

const MINUTES_PER_DAY: i64 = 24 * 60;

/// First instant of `date` in `tz`. When a DST jump skips local midnight the
/// day starts at the first local minute that exists.
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..MINUTES_PER_DAY)
        .find_map(|minute| {
            tz.from_local_datetime(&(midnight + Duration::minutes(minute)))
                .earliest()
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// The `[start, end)` instants covering `date` in `tz`.
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_day(date, tz);
    let end = date
        .succ_opt()
        .map(|next| start_of_day(next, tz))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

/// Groups notes by anniversary of `now`'s calendar day in `now`'s time zone.
/// Periods with no matching note are left out.
pub async fn on_this_day<Tz: TimeZone>(
    store: &dyn NoteStore,
    now: &DateTime<Tz>,
) -> Result<Vec<Anniversary>> {
    let today = now.date_naive();
    let tz = now.timezone();
    let mut anniversaries = Vec::new();

    for period in RecallPeriod::ALL {
        let Some(target) = period.target_date(today) else {
            continue;
        };
        let (start, end) = day_bounds(target, &tz);
        let notes = store
            .scan_range(
                NoteField::CreatedAt,
                Bound::Included(start),
                Bound::Excluded(end),
            )
            .await?;
        debug!("{}: {} notes created on {}", period, notes.len(), target);

        if !notes.is_empty() {
            anniversaries.push(Anniversary { period, notes });
        }
    }

    Ok(anniversaries)
}
