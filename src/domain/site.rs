//! # Site and Array Configuration
//!
//! Immutable descriptions of where the system sits and what is mounted there.
//! Both types validate on construction and expose read-only accessors, so a
//! value that exists is always within its physical domain.

use chrono_tz::Tz;
use validator::Validate;

use crate::error::{Result, SimError};

/// Default power temperature coefficient (fraction per °C, i.e. -0.4 %/°C)
pub const DEFAULT_TEMP_COEFFICIENT: f64 = -0.004;

/// Geographic site of a PV system
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    longitude: f64,
    /// Meters above sea level
    #[validate(range(min = 0.0, max = 9000.0))]
    altitude: f64,
    timezone: Tz,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, altitude: f64, timezone: &str) -> Result<Self> {
        ensure_finite("latitude", latitude)?;
        ensure_finite("longitude", longitude)?;
        ensure_finite("altitude", altitude)?;
        let timezone: Tz = timezone
            .parse()
            .map_err(|e| SimError::invalid("timezone", format!("{timezone}: {e}")))?;
        let location = Self {
            latitude,
            longitude,
            altitude,
            timezone,
        };
        location.validate()?;
        Ok(location)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}

/// Aggregate description of the installed modules
///
/// Orientation follows the usual convention: tilt 0° is horizontal, 90° is
/// vertical; azimuth is measured clockwise from north (180° faces south).
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct PanelArray {
    #[validate(range(exclusive_min = 0.0))]
    area_m2: f64,
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    efficiency: f64,
    #[validate(range(min = 0.0, max = 90.0))]
    tilt_deg: f64,
    #[validate(range(min = 0.0, exclusive_max = 360.0))]
    azimuth_deg: f64,
    /// Power change per °C away from 25°C, as a fraction (-0.004 = -0.4 %/°C)
    #[validate(range(min = -0.1, max = 0.1))]
    temp_coefficient: f64,
    /// Nominal operating cell temperature from the module datasheet
    #[validate(range(min = 20.0, max = 80.0))]
    noct_c: Option<f64>,
}

impl PanelArray {
    pub fn new(area_m2: f64, efficiency: f64, tilt_deg: f64, azimuth_deg: f64) -> Result<Self> {
        Self::from_parts(
            area_m2,
            efficiency,
            tilt_deg,
            azimuth_deg,
            DEFAULT_TEMP_COEFFICIENT,
            None,
        )
    }

    pub fn from_parts(
        area_m2: f64,
        efficiency: f64,
        tilt_deg: f64,
        azimuth_deg: f64,
        temp_coefficient: f64,
        noct_c: Option<f64>,
    ) -> Result<Self> {
        ensure_finite("area_m2", area_m2)?;
        ensure_finite("efficiency", efficiency)?;
        ensure_finite("tilt_deg", tilt_deg)?;
        ensure_finite("azimuth_deg", azimuth_deg)?;
        ensure_finite("temp_coefficient", temp_coefficient)?;
        if let Some(noct) = noct_c {
            ensure_finite("noct_c", noct)?;
        }
        let panel = Self {
            area_m2,
            efficiency,
            tilt_deg,
            azimuth_deg,
            temp_coefficient,
            noct_c,
        };
        panel.validate()?;
        Ok(panel)
    }

    pub fn with_temp_coefficient(self, temp_coefficient: f64) -> Result<Self> {
        Self::from_parts(
            self.area_m2,
            self.efficiency,
            self.tilt_deg,
            self.azimuth_deg,
            temp_coefficient,
            self.noct_c,
        )
    }

    pub fn with_noct(self, noct_c: f64) -> Result<Self> {
        Self::from_parts(
            self.area_m2,
            self.efficiency,
            self.tilt_deg,
            self.azimuth_deg,
            self.temp_coefficient,
            Some(noct_c),
        )
    }

    pub fn area_m2(&self) -> f64 {
        self.area_m2
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    pub fn tilt_deg(&self) -> f64 {
        self.tilt_deg
    }

    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth_deg
    }

    pub fn temp_coefficient(&self) -> f64 {
        self.temp_coefficient
    }

    pub fn noct_c(&self) -> Option<f64> {
        self.noct_c
    }

    /// Nameplate DC rating at 1000 W/m², in watts
    pub fn rated_power_w(&self) -> f64 {
        self.area_m2 * self.efficiency * 1000.0
    }
}

pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("must be finite, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn location_parses_timezone() {
        let loc = Location::new(52.52, 13.405, 34.0, "Europe/Berlin").unwrap();
        assert_eq!(loc.timezone(), chrono_tz::Europe::Berlin);
        assert_eq!(loc.altitude(), 34.0);
    }

    #[rstest]
    #[case(91.0, 0.0, 0.0, "UTC")]
    #[case(-90.5, 0.0, 0.0, "UTC")]
    #[case(0.0, 180.5, 0.0, "UTC")]
    #[case(0.0, 0.0, -10.0, "UTC")]
    #[case(0.0, 0.0, 0.0, "Mars/Olympus_Mons")]
    #[case(f64::NAN, 0.0, 0.0, "UTC")]
    fn location_rejects_out_of_domain(
        #[case] lat: f64,
        #[case] lon: f64,
        #[case] alt: f64,
        #[case] tz: &str,
    ) {
        let err = Location::new(lat, lon, alt, tz).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { .. }));
    }

    #[test]
    fn panel_defaults_temperature_coefficient() {
        let panel = PanelArray::new(10.0, 0.2, 35.0, 180.0).unwrap();
        assert_eq!(panel.temp_coefficient(), DEFAULT_TEMP_COEFFICIENT);
        assert!(panel.noct_c().is_none());
        assert!((panel.rated_power_w() - 2000.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(0.0, 0.2, 30.0, 180.0)]
    #[case(10.0, 0.0, 30.0, 180.0)]
    #[case(10.0, 1.0, 30.0, 180.0)]
    #[case(10.0, 0.2, 91.0, 180.0)]
    #[case(10.0, 0.2, -1.0, 180.0)]
    #[case(10.0, 0.2, 30.0, 360.0)]
    fn panel_rejects_out_of_domain(
        #[case] area: f64,
        #[case] eff: f64,
        #[case] tilt: f64,
        #[case] az: f64,
    ) {
        assert!(PanelArray::new(area, eff, tilt, az).is_err());
    }

    #[test]
    fn panel_builders_revalidate() {
        let panel = PanelArray::new(10.0, 0.2, 35.0, 180.0).unwrap();
        assert!(panel.clone().with_noct(45.0).is_ok());
        assert!(panel.clone().with_noct(200.0).is_err());
        assert!(panel.with_temp_coefficient(-0.5).is_err());
    }
}
