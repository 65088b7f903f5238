//! # Run Statistics
//!
//! Aggregates over [`PowerSample`]s. [`StatisticsAccumulator`] is a
//! mergeable partial result: sums and maxima only, so chunks processed on
//! different workers can be combined in any order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::domain::{PanelArray, PowerSample};
use crate::error::{Result, SimError};

/// Calendar month in the site's local time, written as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SimError::invalid("month", format!("expected YYYY-MM, got {s:?}"));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = SimError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Bucket {
    energy_wh: f64,
    power_sum_w: f64,
    peak_w: f64,
    samples: usize,
}

impl Bucket {
    fn add(&mut self, power_w: f64, energy_wh: f64) {
        self.energy_wh += energy_wh;
        self.power_sum_w += power_w;
        self.peak_w = self.peak_w.max(power_w);
        self.samples += 1;
    }

    fn merge(&mut self, other: &Bucket) {
        self.energy_wh += other.energy_wh;
        self.power_sum_w += other.power_sum_w;
        self.peak_w = self.peak_w.max(other.peak_w);
        self.samples += other.samples;
    }

    fn summary(&self) -> PeriodSummary {
        PeriodSummary {
            energy_kwh: self.energy_wh / 1000.0,
            average_power_w: if self.samples > 0 {
                self.power_sum_w / self.samples as f64
            } else {
                0.0
            },
            peak_power_w: self.peak_w,
            samples: self.samples,
        }
    }
}

/// Energy and power rollup for one month or day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub energy_kwh: f64,
    /// Mean DC power over every sample of the period
    pub average_power_w: f64,
    pub peak_power_w: f64,
    pub samples: usize,
}

#[derive(Debug, Clone)]
pub struct StatisticsAccumulator {
    interval_hours: f64,
    timezone: Tz,
    samples: usize,
    energy_wh: f64,
    ac_energy_wh: Option<f64>,
    peak_w: f64,
    daylight_samples: usize,
    daylight_power_sum_w: f64,
    poa_insolation_wh_m2: f64,
    monthly: BTreeMap<MonthKey, Bucket>,
    daily: BTreeMap<NaiveDate, Bucket>,
}

impl StatisticsAccumulator {
    pub fn new(interval_hours: f64, timezone: Tz) -> Self {
        Self {
            interval_hours,
            timezone,
            samples: 0,
            energy_wh: 0.0,
            ac_energy_wh: None,
            peak_w: 0.0,
            daylight_samples: 0,
            daylight_power_sum_w: 0.0,
            poa_insolation_wh_m2: 0.0,
            monthly: BTreeMap::new(),
            daily: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, sample: &PowerSample) {
        let dt = self.interval_hours;
        let power = sample.dc_power_w;
        let energy = power * dt;

        self.samples += 1;
        self.energy_wh += energy;
        if let Some(ac) = sample.ac_power_w {
            *self.ac_energy_wh.get_or_insert(0.0) += ac * dt;
        }
        self.peak_w = self.peak_w.max(power);
        if sample.is_daylight() {
            self.daylight_samples += 1;
            self.daylight_power_sum_w += power;
        }
        self.poa_insolation_wh_m2 += sample.poa.global * dt;

        let local = sample.timestamp.with_timezone(&self.timezone);
        let month = MonthKey {
            year: local.year(),
            month: local.month(),
        };
        self.monthly.entry(month).or_default().add(power, energy);
        self.daily.entry(local.date_naive()).or_default().add(power, energy);
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.samples += other.samples;
        self.energy_wh += other.energy_wh;
        self.ac_energy_wh = match (self.ac_energy_wh, other.ac_energy_wh) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.peak_w = self.peak_w.max(other.peak_w);
        self.daylight_samples += other.daylight_samples;
        self.daylight_power_sum_w += other.daylight_power_sum_w;
        self.poa_insolation_wh_m2 += other.poa_insolation_wh_m2;
        for (k, b) in &other.monthly {
            self.monthly.entry(*k).or_default().merge(b);
        }
        for (k, b) in &other.daily {
            self.daily.entry(*k).or_default().merge(b);
        }
        self
    }

    pub fn finish(&self, panel: &PanelArray) -> SimulationStatistics {
        let total_energy_kwh = self.energy_wh / 1000.0;
        let simulated_hours = self.samples as f64 * self.interval_hours;
        let rated_kw = panel.rated_power_w() / 1000.0;
        let capacity_factor = if simulated_hours > 0.0 {
            total_energy_kwh / (rated_kw * simulated_hours)
        } else {
            0.0
        };
        let reference_wh = self.poa_insolation_wh_m2 * panel.area_m2() * panel.efficiency();
        let performance_ratio = if reference_wh > 0.0 {
            self.energy_wh / reference_wh
        } else {
            0.0
        };

        SimulationStatistics {
            sample_count: self.samples,
            total_energy_kwh,
            ac_energy_kwh: self.ac_energy_wh.map(|wh| wh / 1000.0),
            peak_power_w: self.peak_w,
            average_power_w: if self.daylight_samples > 0 {
                self.daylight_power_sum_w / self.daylight_samples as f64
            } else {
                0.0
            },
            daylight_hours: self.daylight_samples as f64 * self.interval_hours,
            capacity_factor,
            performance_ratio,
            monthly: self.monthly.iter().map(|(k, b)| (*k, b.summary())).collect(),
            daily: self.daily.iter().map(|(k, b)| (*k, b.summary())).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatistics {
    pub sample_count: usize,
    /// DC energy over the run
    pub total_energy_kwh: f64,
    pub ac_energy_kwh: Option<f64>,
    pub peak_power_w: f64,
    /// Mean DC power over samples with the sun above the horizon
    pub average_power_w: f64,
    pub daylight_hours: f64,
    /// Energy over nameplate (area x efficiency x 1 kW/m²) for the simulated hours
    pub capacity_factor: f64,
    /// Energy over plane-of-array insolation x area x efficiency
    pub performance_ratio: f64,
    pub monthly: BTreeMap<MonthKey, PeriodSummary>,
    pub daily: BTreeMap<NaiveDate, PeriodSummary>,
}

impl SimulationStatistics {
    pub fn monthly_energy_kwh(&self) -> BTreeMap<MonthKey, f64> {
        self.monthly.iter().map(|(k, s)| (*k, s.energy_kwh)).collect()
    }

    pub fn daily_energy_kwh(&self) -> BTreeMap<NaiveDate, f64> {
        self.daily.iter().map(|(k, s)| (*k, s.energy_kwh)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IrradianceComponents, PoaComponents, SunPosition};
    use chrono::{DateTime, Duration, FixedOffset};

    fn sample(ts: DateTime<FixedOffset>, power: f64, poa: f64) -> PowerSample {
        let elevation = if power > 0.0 { 30.0 } else { -10.0 };
        PowerSample {
            timestamp: ts,
            dc_power_w: power,
            ac_power_w: Some(power * 0.9),
            poa: PoaComponents {
                global: poa,
                ..Default::default()
            },
            cell_temperature_c: 25.0,
            temperature_factor: 1.0,
            ambient_temp_c: 20.0,
            irradiance: IrradianceComponents::ZERO,
            sun: SunPosition::from_zenith(90.0 - elevation, 180.0),
        }
    }

    fn day() -> Vec<PowerSample> {
        let t0 = DateTime::parse_from_rfc3339("2024-01-31T00:00:00+00:00").unwrap();
        (0..48)
            .map(|h| {
                let hour = h % 24;
                let power = if (8..16).contains(&hour) { 1000.0 } else { 0.0 };
                sample(t0 + Duration::hours(h), power, power * 5.0)
            })
            .collect()
    }

    fn panel() -> PanelArray {
        PanelArray::new(10.0, 0.2, 30.0, 180.0).unwrap()
    }

    #[test]
    fn totals_and_ratios() {
        let mut acc = StatisticsAccumulator::new(1.0, chrono_tz::UTC);
        for s in day() {
            acc.push(&s);
        }
        let stats = acc.finish(&panel());
        assert_eq!(stats.sample_count, 48);
        assert!((stats.total_energy_kwh - 16.0).abs() < 1e-9);
        assert!((stats.ac_energy_kwh.unwrap() - 14.4).abs() < 1e-9);
        assert_eq!(stats.peak_power_w, 1000.0);
        assert!((stats.average_power_w - 1000.0).abs() < 1e-9);
        assert!((stats.daylight_hours - 16.0).abs() < 1e-9);
        // 16 kWh over 2 kW for 48 h
        assert!((stats.capacity_factor - 16.0 / 96.0).abs() < 1e-12);
        // poa 5000 W/m² x 2 m² effective = 10 kW reference vs 1 kW produced
        assert!((stats.performance_ratio - 0.1).abs() < 1e-12);
    }

    #[test]
    fn buckets_follow_local_calendar() {
        let mut acc = StatisticsAccumulator::new(1.0, chrono_tz::UTC);
        for s in day() {
            acc.push(&s);
        }
        let stats = acc.finish(&panel());
        let months: Vec<String> = stats.monthly.keys().map(|k| k.to_string()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        assert_eq!(stats.daily.len(), 2);
        let jan = stats.monthly[&MonthKey { year: 2024, month: 1 }];
        assert!((jan.energy_kwh - 8.0).abs() < 1e-9);
        assert_eq!(jan.peak_power_w, 1000.0);
        assert!((jan.average_power_w - 1000.0 / 3.0).abs() < 1e-9);

        // the same instants seen from Tokyo shift into the next day
        let mut tokyo = StatisticsAccumulator::new(1.0, chrono_tz::Asia::Tokyo);
        for s in day() {
            tokyo.push(&s);
        }
        assert_eq!(tokyo.finish(&panel()).daily.len(), 3);
    }

    #[test]
    fn merge_is_order_independent() {
        let samples = day();
        let (a, b) = samples.split_at(17);
        let build = |part: &[PowerSample]| {
            let mut acc = StatisticsAccumulator::new(1.0, chrono_tz::UTC);
            for s in part {
                acc.push(s);
            }
            acc
        };
        let ab = build(a).merge(build(b)).finish(&panel());
        let ba = build(b).merge(build(a)).finish(&panel());
        let whole = build(&samples).finish(&panel());
        assert_eq!(ab, ba);
        assert_eq!(ab, whole);
    }

    #[test]
    fn statistics_serialize_to_json() {
        let mut acc = StatisticsAccumulator::new(1.0, chrono_tz::UTC);
        for s in day() {
            acc.push(&s);
        }
        let stats = acc.finish(&panel());
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"2024-02\""));
        let back: SimulationStatistics = serde_json::from_str(&json).unwrap();
        assert!(back.monthly.keys().eq(stats.monthly.keys()));
        assert_eq!(back.sample_count, 48);
        assert!("2024-13".parse::<MonthKey>().is_err());
    }

    #[test]
    fn empty_run_has_zero_ratios() {
        let stats = StatisticsAccumulator::new(1.0, chrono_tz::UTC).finish(&panel());
        assert_eq!(stats.capacity_factor, 0.0);
        assert_eq!(stats.performance_ratio, 0.0);
        assert!(stats.ac_energy_kwh.is_none());
    }
}
