use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Expected spacing of a regular time series
///
/// Parsed from compact frequency strings: an optional positive count followed
/// by a unit (`s`, `min`/`T`, `h`/`H`, `d`/`D`), e.g. `"h"`, `"15min"`, `"5T"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cadence {
    seconds: i64,
}

impl Cadence {
    pub fn from_seconds(seconds: i64) -> Result<Self, SimError> {
        if seconds <= 0 {
            return Err(SimError::invalid("cadence", format!("must be positive, got {seconds}s")));
        }
        Ok(Self { seconds })
    }

    pub fn from_minutes(minutes: i64) -> Result<Self, SimError> {
        Self::from_seconds(minutes.saturating_mul(60))
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds)
    }

    pub fn hours(&self) -> f64 {
        self.seconds as f64 / 3600.0
    }
}

impl FromStr for Cadence {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
        let (count, unit) = raw.split_at(split);
        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| SimError::invalid("cadence", format!("bad count in {s:?}")))?
        };
        let unit_seconds = match unit {
            "s" | "S" | "sec" => 1,
            "min" | "T" => 60,
            "h" | "H" => 3600,
            "d" | "D" => 86_400,
            _ => {
                return Err(SimError::invalid(
                    "cadence",
                    format!("unrecognised unit in {s:?}"),
                ))
            }
        };
        Self::from_seconds(count.saturating_mul(unit_seconds))
    }
}

impl TryFrom<String> for Cadence {
    type Error = SimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cadence> for String {
    fn from(c: Cadence) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % 86_400 == 0 {
            write!(f, "{}d", s / 86_400)
        } else if s % 3600 == 0 {
            write!(f, "{}h", s / 3600)
        } else if s % 60 == 0 {
            write!(f, "{}min", s / 60)
        } else {
            write!(f, "{s}s")
        }
    }
}
