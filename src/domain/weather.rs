use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// One observation row of a weather series
///
/// Every value is optional so that gaps inside a row survive parsing and
/// can be flagged or filled later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub timestamp: DateTime<FixedOffset>,
    pub ambient_temp_c: Option<f64>,
    pub ghi: Option<f64>,
    pub dni: Option<f64>,
    pub dhi: Option<f64>,
    /// m/s at module height
    pub wind_speed: Option<f64>,
    /// Cloud cover in percent (0..=100)
    pub cloud_cover_percent: Option<f64>,
}

impl WeatherSample {
    pub fn empty(timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp,
            ambient_temp_c: None,
            ghi: None,
            dni: None,
            dhi: None,
            wind_speed: None,
            cloud_cover_percent: None,
        }
    }

    pub fn with_irradiance(
        timestamp: DateTime<FixedOffset>,
        ambient_temp_c: f64,
        ghi: f64,
        dni: f64,
        dhi: f64,
    ) -> Self {
        Self {
            ambient_temp_c: Some(ambient_temp_c),
            ghi: Some(ghi),
            dni: Some(dni),
            dhi: Some(dhi),
            ..Self::empty(timestamp)
        }
    }

    pub fn get(&self, column: WeatherColumn) -> Option<f64> {
        match column {
            WeatherColumn::AmbientTemp => self.ambient_temp_c,
            WeatherColumn::Ghi => self.ghi,
            WeatherColumn::Dni => self.dni,
            WeatherColumn::Dhi => self.dhi,
            WeatherColumn::WindSpeed => self.wind_speed,
            WeatherColumn::CloudCover => self.cloud_cover_percent,
        }
    }

    pub fn set(&mut self, column: WeatherColumn, value: Option<f64>) {
        let slot = match column {
            WeatherColumn::AmbientTemp => &mut self.ambient_temp_c,
            WeatherColumn::Ghi => &mut self.ghi,
            WeatherColumn::Dni => &mut self.dni,
            WeatherColumn::Dhi => &mut self.dhi,
            WeatherColumn::WindSpeed => &mut self.wind_speed,
            WeatherColumn::CloudCover => &mut self.cloud_cover_percent,
        };
        *slot = value;
    }

    pub fn is_blank(&self) -> bool {
        WeatherColumn::ALL.iter().all(|c| self.get(*c).is_none())
    }
}

/// Value columns of a weather series
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WeatherColumn {
    AmbientTemp,
    Ghi,
    Dni,
    Dhi,
    WindSpeed,
    CloudCover,
}

impl WeatherColumn {
    pub const ALL: [WeatherColumn; 6] = [
        WeatherColumn::AmbientTemp,
        WeatherColumn::Ghi,
        WeatherColumn::Dni,
        WeatherColumn::Dhi,
        WeatherColumn::WindSpeed,
        WeatherColumn::CloudCover,
    ];

    pub const IRRADIANCE: [WeatherColumn; 3] =
        [WeatherColumn::Ghi, WeatherColumn::Dni, WeatherColumn::Dhi];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_accessors_round_trip() {
        let ts = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let mut sample = WeatherSample::empty(ts);
        assert!(sample.is_blank());
        for (i, column) in WeatherColumn::ALL.iter().enumerate() {
            sample.set(*column, Some(i as f64));
        }
        for (i, column) in WeatherColumn::ALL.iter().enumerate() {
            assert_eq!(sample.get(*column), Some(i as f64));
        }
        assert!(!sample.is_blank());
    }

    #[test]
    fn column_names_are_snake_case() {
        assert_eq!(WeatherColumn::AmbientTemp.to_string(), "ambient_temp");
        assert_eq!("cloud_cover".parse::<WeatherColumn>().unwrap(), WeatherColumn::CloudCover);
    }
}
