//! # Solar Geometry and Clear-Sky Provider
//!
//! The pipeline and the weather quality gate ask a [`SolarGeometry`] for the
//! sun position and the cloudless irradiance at a site. The default
//! implementation combines the NREL Solar Position Algorithm with the
//! Ineichen–Perez clear-sky model; tests and callers with their own
//! ephemeris can inject something else.

pub mod clearsky;
pub mod position;

use chrono::{DateTime, Datelike, FixedOffset};

use crate::domain::{IrradianceComponents, Location, SunPosition};
use crate::error::{Result, SimError};

pub use clearsky::{
    extraterrestrial_irradiance, relative_air_mass, DEFAULT_LINKE_TURBIDITY, SOLAR_CONSTANT,
};

/// Sun position and clear-sky irradiance for a site
pub trait SolarGeometry: Send + Sync {
    fn sun_position(&self, timestamp: DateTime<FixedOffset>, location: &Location)
        -> Result<SunPosition>;

    fn clear_sky(
        &self,
        timestamp: DateTime<FixedOffset>,
        sun: &SunPosition,
        location: &Location,
    ) -> IrradianceComponents;
}

/// SPA sun position with Ineichen–Perez clear sky
#[derive(Debug, Clone, Copy)]
pub struct SpaIneichen {
    linke_turbidity: f64,
}

impl SpaIneichen {
    pub fn new(linke_turbidity: f64) -> Result<Self> {
        if !(linke_turbidity.is_finite() && (1.0..=10.0).contains(&linke_turbidity)) {
            return Err(SimError::invalid(
                "linke_turbidity",
                format!("must be within [1, 10], got {linke_turbidity}"),
            ));
        }
        Ok(Self { linke_turbidity })
    }

    pub fn linke_turbidity(&self) -> f64 {
        self.linke_turbidity
    }
}

impl Default for SpaIneichen {
    fn default() -> Self {
        Self {
            linke_turbidity: DEFAULT_LINKE_TURBIDITY,
        }
    }
}

impl SolarGeometry for SpaIneichen {
    fn sun_position(
        &self,
        timestamp: DateTime<FixedOffset>,
        location: &Location,
    ) -> Result<SunPosition> {
        position::spa_position(timestamp, location)
    }

    fn clear_sky(
        &self,
        timestamp: DateTime<FixedOffset>,
        sun: &SunPosition,
        location: &Location,
    ) -> IrradianceComponents {
        clearsky::ineichen(
            sun.zenith_deg,
            location.altitude(),
            timestamp.ordinal(),
            self.linke_turbidity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unphysical_turbidity() {
        assert!(SpaIneichen::new(0.5).is_err());
        assert!(SpaIneichen::new(f64::NAN).is_err());
        assert!(SpaIneichen::new(4.0).is_ok());
    }

    #[test]
    fn clear_sky_follows_sun() {
        let provider = SpaIneichen::default();
        let loc = Location::new(40.0, 0.0, 0.0, "UTC").unwrap();
        let noon = DateTime::parse_from_rfc3339("2024-03-20T12:07:00Z").unwrap();
        let night = DateTime::parse_from_rfc3339("2024-03-20T23:00:00Z").unwrap();

        let sun = provider.sun_position(noon, &loc).unwrap();
        let irr = provider.clear_sky(noon, &sun, &loc);
        assert!(irr.ghi > 700.0);

        let sun = provider.sun_position(night, &loc).unwrap();
        assert_eq!(provider.clear_sky(night, &sun, &loc), IrradianceComponents::ZERO);
    }
}
