use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::{IrradianceComponents, PoaComponents, SunPosition};

/// Output of the pipeline for one timestamp, with the intermediate values
/// kept for diagnostics and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub timestamp: DateTime<FixedOffset>,
    pub dc_power_w: f64,
    pub ac_power_w: Option<f64>,
    pub poa: PoaComponents,
    pub cell_temperature_c: f64,
    pub temperature_factor: f64,
    pub ambient_temp_c: f64,
    /// Horizontal irradiance that reached the transposition stage
    pub irradiance: IrradianceComponents,
    pub sun: SunPosition,
}

impl PowerSample {
    /// Sample for a sun at or below the horizon. The cell sits at ambient
    /// temperature, and `temperature_factor` is the factor for that
    /// temperature.
    pub fn night(
        timestamp: DateTime<FixedOffset>,
        sun: SunPosition,
        ambient_temp_c: f64,
        temperature_factor: f64,
        with_ac: bool,
    ) -> Self {
        Self {
            timestamp,
            dc_power_w: 0.0,
            ac_power_w: with_ac.then_some(0.0),
            poa: PoaComponents::dark(90.0),
            cell_temperature_c: ambient_temp_c,
            temperature_factor,
            ambient_temp_c,
            irradiance: IrradianceComponents::ZERO,
            sun,
        }
    }

    pub fn is_daylight(&self) -> bool {
        self.sun.is_above_horizon()
    }
}
