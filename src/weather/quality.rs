//! # Weather Quality Checks
//!
//! Independent per-sample checks over a weather series. Each flag is
//! computed on its own; [`QualityFlags::any`] ORs them together.

use std::fmt::Write as _;
use std::ops::RangeInclusive;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::WeatherSeries;
use crate::domain::{Location, WeatherColumn, WeatherSample};
use crate::error::Result;
use crate::solar::SolarGeometry;

const REPORT_EXAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Global irradiance tolerated with the sun down, W/m²
    pub night_irradiance: f64,
    /// Allowed |ghi - (dhi + dni·cos z)|, W/m²
    pub consistency_tolerance: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            night_irradiance: 10.0,
            consistency_tolerance: 50.0,
        }
    }
}

/// Flags raised for one sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFlags {
    pub nighttime_irradiance: bool,
    pub negative_value: bool,
    pub out_of_range: bool,
    pub inconsistent_irradiance: bool,
}

impl QualityFlags {
    pub fn any(&self) -> bool {
        self.nighttime_irradiance
            || self.negative_value
            || self.out_of_range
            || self.inconsistent_irradiance
    }

    /// Values that cannot be physical; the engine refuses to simulate these.
    pub fn is_malformed(&self) -> bool {
        self.negative_value || self.out_of_range
    }
}

/// Run every check over `series`, one flag set per sample.
pub fn check(
    series: &WeatherSeries,
    location: &Location,
    geometry: &dyn SolarGeometry,
    thresholds: &QualityThresholds,
) -> Result<Vec<QualityFlags>> {
    series
        .iter()
        .map(|sample| {
            let sun = geometry.sun_position(sample.timestamp, location)?;
            Ok(check_sample(sample, sun.elevation_deg, sun.zenith_deg, thresholds))
        })
        .collect()
}

pub fn check_sample(
    sample: &WeatherSample,
    elevation_deg: f64,
    zenith_deg: f64,
    thresholds: &QualityThresholds,
) -> QualityFlags {
    let nighttime_irradiance = elevation_deg <= 0.0
        && sample.ghi.is_some_and(|ghi| ghi > thresholds.night_irradiance);

    let negative_value = [sample.ghi, sample.dni, sample.dhi, sample.wind_speed]
        .into_iter()
        .flatten()
        .any(|v| v < 0.0);

    let out_of_range = !malformed_columns(sample).is_empty();

    // only meaningful with the sun up and all three components measured
    let inconsistent_irradiance = match (sample.ghi, sample.dni, sample.dhi) {
        (Some(ghi), Some(dni), Some(dhi)) if zenith_deg < 90.0 => {
            let closure = dhi + dni * zenith_deg.to_radians().cos();
            (ghi - closure).abs() > thresholds.consistency_tolerance
        }
        _ => false,
    };

    QualityFlags {
        nighttime_irradiance,
        negative_value,
        out_of_range,
        inconsistent_irradiance,
    }
}

/// Plausible values per column
fn physical_range(column: WeatherColumn) -> RangeInclusive<f64> {
    match column {
        WeatherColumn::AmbientTemp => -60.0..=60.0,
        WeatherColumn::Ghi | WeatherColumn::Dni => 0.0..=1500.0,
        WeatherColumn::Dhi => 0.0..=1000.0,
        WeatherColumn::WindSpeed => 0.0..=50.0,
        WeatherColumn::CloudCover => 0.0..=100.0,
    }
}

/// Columns of `sample` holding a negative or out-of-range value
pub fn malformed_columns(sample: &WeatherSample) -> Vec<WeatherColumn> {
    WeatherColumn::ALL
        .into_iter()
        .filter(|c| sample.get(*c).is_some_and(|v| !physical_range(*c).contains(&v)))
        .collect()
}

/// Aggregate view over the flags of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_samples: usize,
    pub flagged_samples: usize,
    pub nighttime_irradiance: usize,
    pub negative_value: usize,
    pub out_of_range: usize,
    pub inconsistent_irradiance: usize,
    /// First few flagged timestamps
    pub examples: Vec<DateTime<FixedOffset>>,
}

impl QualityReport {
    pub fn from_flags(series: &WeatherSeries, flags: &[QualityFlags]) -> Self {
        let count = |f: fn(&QualityFlags) -> bool| flags.iter().filter(|x| f(x)).count();
        let examples = series
            .iter()
            .zip(flags)
            .filter(|(_, f)| f.any())
            .take(REPORT_EXAMPLES)
            .map(|(s, _)| s.timestamp)
            .collect();
        Self {
            total_samples: flags.len(),
            flagged_samples: count(QualityFlags::any),
            nighttime_irradiance: count(|f| f.nighttime_irradiance),
            negative_value: count(|f| f.negative_value),
            out_of_range: count(|f| f.out_of_range),
            inconsistent_irradiance: count(|f| f.inconsistent_irradiance),
            examples,
        }
    }

    /// Share of clean samples, in percent
    pub fn quality_percent(&self) -> f64 {
        if self.total_samples == 0 {
            return 100.0;
        }
        100.0 * (self.total_samples - self.flagged_samples) as f64 / self.total_samples as f64
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Weather data quality report");
        let _ = writeln!(out, "  samples:                 {}", self.total_samples);
        let _ = writeln!(
            out,
            "  flagged:                 {} ({:.1}% clean)",
            self.flagged_samples,
            self.quality_percent()
        );
        let _ = writeln!(out, "  nighttime irradiance:    {}", self.nighttime_irradiance);
        let _ = writeln!(out, "  negative values:         {}", self.negative_value);
        let _ = writeln!(out, "  out of range:            {}", self.out_of_range);
        let _ = writeln!(out, "  inconsistent irradiance: {}", self.inconsistent_irradiance);
        if !self.examples.is_empty() {
            let _ = writeln!(out, "  first flagged:");
            for ts in &self.examples {
                let _ = writeln!(out, "    {}", ts.to_rfc3339());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solar::SpaIneichen;

    fn sample(ts: &str) -> WeatherSample {
        WeatherSample::empty(DateTime::parse_from_rfc3339(ts).unwrap())
    }

    #[test]
    fn nighttime_irradiance_is_the_only_flag_at_night() {
        let mut s = sample("2024-06-01T02:00:00Z");
        s.ambient_temp_c = Some(12.0);
        s.ghi = Some(50.0);
        let flags = check_sample(&s, -20.0, 110.0, &QualityThresholds::default());
        assert!(flags.nighttime_irradiance);
        assert!(!flags.negative_value);
        assert!(!flags.out_of_range);
        assert!(!flags.inconsistent_irradiance);
        assert!(flags.any());
        assert!(!flags.is_malformed());
    }

    #[test]
    fn negative_values_are_also_out_of_range() {
        let mut s = sample("2024-06-01T12:00:00Z");
        s.wind_speed = Some(-1.0);
        let flags = check_sample(&s, 50.0, 40.0, &QualityThresholds::default());
        assert!(flags.negative_value);
        assert!(flags.out_of_range);
        assert!(flags.is_malformed());
    }

    #[test]
    fn range_limits_per_column() {
        let t = QualityThresholds::default();
        let mut s = sample("2024-06-01T12:00:00Z");
        s.dhi = Some(1200.0);
        assert!(check_sample(&s, 50.0, 40.0, &t).out_of_range);
        let mut s = sample("2024-06-01T12:00:00Z");
        s.ambient_temp_c = Some(-61.0);
        assert!(check_sample(&s, 50.0, 40.0, &t).out_of_range);
        let mut s = sample("2024-06-01T12:00:00Z");
        s.cloud_cover_percent = Some(101.0);
        assert!(check_sample(&s, 50.0, 40.0, &t).out_of_range);
        let mut s = sample("2024-06-01T12:00:00Z");
        s.ghi = Some(1500.0);
        assert!(!check_sample(&s, 50.0, 40.0, &t).out_of_range);
    }

    #[test]
    fn malformed_columns_names_each_offender() {
        let mut s = sample("2024-06-01T12:00:00Z");
        s.ambient_temp_c = Some(-5.0);
        s.ghi = Some(-40.0);
        s.dhi = Some(80.0);
        s.cloud_cover_percent = Some(120.0);
        assert_eq!(
            malformed_columns(&s),
            vec![WeatherColumn::Ghi, WeatherColumn::CloudCover]
        );
    }

    #[test]
    fn closure_mismatch_is_inconsistent() {
        let t = QualityThresholds::default();
        let mut s = sample("2024-06-01T12:00:00Z");
        let cos_z = 40f64.to_radians().cos();
        s.dni = Some(800.0);
        s.dhi = Some(100.0);
        s.ghi = Some(100.0 + 800.0 * cos_z + 30.0);
        assert!(!check_sample(&s, 50.0, 40.0, &t).inconsistent_irradiance);
        s.ghi = Some(100.0 + 800.0 * cos_z + 80.0);
        assert!(check_sample(&s, 50.0, 40.0, &t).inconsistent_irradiance);
    }

    #[test]
    fn check_is_idempotent_and_reported() {
        let loc = Location::new(48.0, 11.0, 500.0, "Europe/Berlin").unwrap();
        let geometry = SpaIneichen::default();
        let mut night = sample("2024-06-01T00:00:00Z");
        night.ambient_temp_c = Some(10.0);
        night.ghi = Some(40.0);
        let mut day = sample("2024-06-01T11:00:00Z");
        day.ambient_temp_c = Some(22.0);
        day.ghi = Some(700.0);
        let series = WeatherSeries::new(vec![night, day]).unwrap();

        let t = QualityThresholds::default();
        let first = check(&series, &loc, &geometry, &t).unwrap();
        let second = check(&series, &loc, &geometry, &t).unwrap();
        assert_eq!(first, second);

        let report = QualityReport::from_flags(&series, &first);
        assert_eq!(report.flagged_samples, 1);
        assert_eq!(report.nighttime_irradiance, 1);
        assert!((report.quality_percent() - 50.0).abs() < 1e-9);
        assert!(report.render().contains("nighttime irradiance:    1"));
    }
}
