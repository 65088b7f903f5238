use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::Cadence;
use crate::domain::{WeatherColumn, WeatherSample};
use crate::error::{Result, SimError};

/// Weather observations ordered by strictly increasing timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WeatherSample>", into = "Vec<WeatherSample>")]
pub struct WeatherSeries {
    samples: Vec<WeatherSample>,
}

impl WeatherSeries {
    pub fn new(samples: Vec<WeatherSample>) -> Result<Self> {
        if let Some((prev, next)) = samples
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.timestamp >= b.timestamp)
        {
            return Err(SimError::invalid(
                "timestamp",
                format!(
                    "timestamps must be strictly increasing: {} followed by {}",
                    prev.timestamp, next.timestamp
                ),
            ));
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[WeatherSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<WeatherSample> {
        self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WeatherSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn end(&self) -> Option<DateTime<FixedOffset>> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Sample at exactly `timestamp` (compared as an instant)
    pub fn get(&self, timestamp: DateTime<FixedOffset>) -> Option<&WeatherSample> {
        self.samples
            .binary_search_by(|s| s.timestamp.cmp(&timestamp))
            .ok()
            .map(|i| &self.samples[i])
    }

    /// Samples within `[start, end]`
    pub fn slice(&self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        let lo = self.samples.partition_point(|s| s.timestamp < start);
        let hi = self.samples.partition_point(|s| s.timestamp <= end);
        Self {
            samples: self.samples[lo..hi.max(lo)].to_vec(),
        }
    }

    /// Columns holding at least one value
    pub fn columns(&self) -> BTreeSet<WeatherColumn> {
        WeatherColumn::ALL
            .into_iter()
            .filter(|c| self.samples.iter().any(|s| s.get(*c).is_some()))
            .collect()
    }

    /// Ambient temperature and at least one irradiance column must be present.
    pub fn require_schema(&self) -> Result<()> {
        if self.samples.is_empty() {
            return Err(SimError::data_quality("weather series is empty"));
        }
        let columns = self.columns();
        if !columns.contains(&WeatherColumn::AmbientTemp) {
            return Err(SimError::DataQuality {
                timestamp: None,
                column: Some(WeatherColumn::AmbientTemp.to_string()),
                value: None,
                message: "ambient temperature column is required".into(),
            });
        }
        if !WeatherColumn::IRRADIANCE.iter().any(|c| columns.contains(c)) {
            return Err(SimError::DataQuality {
                timestamp: None,
                column: Some("ghi/dni/dhi".into()),
                value: None,
                message: "at least one irradiance column is required".into(),
            });
        }
        Ok(())
    }

    /// Most common spacing between consecutive samples; ties go to the
    /// shorter spacing.
    pub fn infer_cadence(&self) -> Result<Cadence> {
        let counts = self
            .samples
            .iter()
            .tuple_windows()
            .map(|(a, b)| (b.timestamp - a.timestamp).num_seconds())
            .counts();
        let (seconds, _) = counts
            .into_iter()
            .max_by(|(sa, ca), (sb, cb)| ca.cmp(cb).then(sb.cmp(sa)))
            .ok_or_else(|| {
                SimError::invalid("cadence", "at least two samples are needed to infer a cadence")
            })?;
        Cadence::from_seconds(seconds)
    }
}

impl TryFrom<Vec<WeatherSample>> for WeatherSeries {
    type Error = SimError;

    fn try_from(samples: Vec<WeatherSample>) -> Result<Self> {
        Self::new(samples)
    }
}

impl From<WeatherSeries> for Vec<WeatherSample> {
    fn from(series: WeatherSeries) -> Self {
        series.samples
    }
}

impl<'a> IntoIterator for &'a WeatherSeries {
    type Item = &'a WeatherSample;
    type IntoIter = std::slice::Iter<'a, WeatherSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
