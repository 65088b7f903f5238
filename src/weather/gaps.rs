use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use super::{Cadence, WeatherSeries};
use crate::error::Result;

/// Run of consecutive missing timestamps between two present samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// First missing timestamp
    pub start: DateTime<FixedOffset>,
    /// Last missing timestamp
    pub end: DateTime<FixedOffset>,
    pub missing_points: usize,
}

impl Gap {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Find missing timestamps for an expected cadence given as a frequency
/// string such as `"1h"` or `"15min"`.
pub fn detect_gaps(series: &WeatherSeries, cadence: &str) -> Result<Vec<Gap>> {
    let cadence: Cadence = cadence.parse()?;
    Ok(detect_gaps_with(series, cadence))
}

/// Find missing timestamps on the grid anchored at the first sample.
pub fn detect_gaps_with(series: &WeatherSeries, cadence: Cadence) -> Vec<Gap> {
    let Some(anchor) = series.start() else {
        return Vec::new();
    };
    series
        .samples()
        .windows(2)
        .filter_map(|pair| {
            let missing = grid_points_between(anchor, cadence, pair[0].timestamp, pair[1].timestamp);
            let (first, last) = (missing.first()?, missing.last()?);
            Some(Gap {
                start: *first,
                end: *last,
                missing_points: missing.len(),
            })
        })
        .collect()
}

/// Grid timestamps strictly between `after` and `before`, expressed in the
/// offset of `after`.
pub(crate) fn grid_points_between(
    anchor: DateTime<FixedOffset>,
    cadence: Cadence,
    after: DateTime<FixedOffset>,
    before: DateTime<FixedOffset>,
) -> Vec<DateTime<FixedOffset>> {
    let step = cadence.seconds();
    let offset = (after - anchor).num_seconds();
    let mut k = offset.div_euclid(step) + 1;
    let mut points = Vec::new();
    loop {
        let t = (anchor + Duration::seconds(k * step)).with_timezone(after.offset());
        if t >= before {
            break;
        }
        points.push(t);
        k += 1;
    }
    points
}
