use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SimError};

/// Longest interval the grid generator accepts, minutes
pub const MAX_GRID_INTERVAL_MINUTES: u32 = 1440;

/// Evenly spaced timestamps from `start` to `end` inclusive
///
/// Steps are taken in absolute time, so a DST transition neither repeats nor
/// skips a sample; timestamps are expressed in the grid's time zone.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval_minutes: u32,
    timezone: Tz,
}

impl TimeGrid {
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        interval_minutes: u32,
        timezone: Tz,
    ) -> Result<Self> {
        if !(1..=MAX_GRID_INTERVAL_MINUTES).contains(&interval_minutes) {
            return Err(SimError::invalid(
                "interval_minutes",
                format!("{interval_minutes} outside [1, {MAX_GRID_INTERVAL_MINUTES}]"),
            ));
        }
        if end < start {
            return Err(SimError::invalid(
                "end",
                format!("end {end} precedes start {start}"),
            ));
        }
        Ok(Self {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
            interval_minutes,
            timezone,
        })
    }

    /// Local midnight on 1 January through 23:59:59 on 31 December
    pub fn for_year(year: i32, timezone: Tz, interval_minutes: u32) -> Result<Self> {
        let start = timezone
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .earliest()
            .ok_or_else(|| SimError::invalid("year", format!("no local start of year {year}")))?;
        let end = timezone
            .with_ymd_and_hms(year, 12, 31, 23, 59, 59)
            .latest()
            .ok_or_else(|| SimError::invalid("year", format!("no local end of year {year}")))?;
        Self::new(start.fixed_offset(), end.fixed_offset(), interval_minutes, timezone)
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start.with_timezone(&self.timezone).fixed_offset()
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end.with_timezone(&self.timezone).fixed_offset()
    }

    pub fn interval(&self) -> Duration {
        Duration::minutes(self.interval_minutes as i64)
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn interval_hours(&self) -> f64 {
        self.interval_minutes as f64 / 60.0
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn len(&self) -> usize {
        ((self.end - self.start).num_seconds() / (self.interval_minutes as i64 * 60)) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn timestamps(&self) -> Vec<DateTime<FixedOffset>> {
        let step = self.interval();
        (0..self.len())
            .map(|k| {
                (self.start + step * k as i32)
                    .with_timezone(&self.timezone)
                    .fixed_offset()
            })
            .collect()
    }
}
