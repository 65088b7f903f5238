//! # Irradiance-to-Power Pipeline
//!
//! Composes the per-timestamp stages:
//!
//! ```text
//! geometry/clear sky -> cloud attenuation -> POA transposition
//!                    -> cell temperature -> power derating
//! ```
//!
//! Each stage is a pure function over value types. The models used by each
//! stage are fixed when the [`Pipeline`] is built and never change during a
//! run, which is what makes a `Pipeline` safe to share across worker threads.

pub mod cloud;
pub mod decomposition;
pub mod iam;
pub mod poa;
pub mod power;
pub mod temperature;

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::domain::{
    IrradianceComponents, Location, PanelArray, PowerSample, SunPosition, WeatherSample,
};
use crate::error::{Result, SimError};
use crate::solar::{SolarGeometry, SpaIneichen};

pub use cloud::{attenuate, CloudCover, CloudModel};
pub use iam::IamModel;
pub use poa::{transpose, DiffuseModel, DEFAULT_ALBEDO};
pub use power::{power, temperature_factor, DerateFactors, PowerOutput};
pub use temperature::{cell_temperature, ThermalModel, ThermalModelKind};

/// Wind speed assumed when a sample carries none, m/s
pub const DEFAULT_WIND_SPEED: f64 = 1.0;

/// Models selected for each interchangeable stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSet {
    pub cloud: CloudModel,
    pub diffuse: DiffuseModel,
    pub iam: IamModel,
    pub thermal: ThermalModel,
}

impl ModelSet {
    /// Default models with the standard thermal parameters for `panel`
    pub fn for_panel(panel: &PanelArray) -> Self {
        Self {
            cloud: CloudModel::default(),
            diffuse: DiffuseModel::default(),
            iam: IamModel::default(),
            thermal: ThermalModel::standard(ThermalModelKind::default(), panel),
        }
    }
}

/// Ambient conditions assumed for a clear-sky run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClearSkyConditions {
    pub ambient_temp_c: f64,
    pub wind_speed: f64,
    pub cloud_cover: CloudCover,
}

impl Default for ClearSkyConditions {
    fn default() -> Self {
        Self {
            ambient_temp_c: 25.0,
            wind_speed: DEFAULT_WIND_SPEED,
            cloud_cover: CloudCover::CLEAR,
        }
    }
}

/// Where the irradiance for one timestamp comes from
#[derive(Debug, Clone, Copy)]
pub enum SkyCondition<'a> {
    ClearSky(ClearSkyConditions),
    Observed(&'a WeatherSample),
}

pub struct Pipeline {
    geometry: Arc<dyn SolarGeometry>,
    models: ModelSet,
    albedo: f64,
    derate: DerateFactors,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("models", &self.models)
            .field("albedo", &self.albedo)
            .field("derate", &self.derate)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        geometry: Arc<dyn SolarGeometry>,
        models: ModelSet,
        albedo: f64,
        derate: DerateFactors,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&albedo) {
            return Err(SimError::invalid("albedo", format!("{albedo} outside [0, 1]")));
        }
        models.thermal.validate()?;
        derate.validate()?;
        Ok(Self {
            geometry,
            models,
            albedo,
            derate,
        })
    }

    /// SPA/Ineichen geometry, default models, default albedo, no losses
    pub fn with_defaults(panel: &PanelArray) -> Self {
        Self {
            geometry: Arc::new(SpaIneichen::default()),
            models: ModelSet::for_panel(panel),
            albedo: DEFAULT_ALBEDO,
            derate: DerateFactors::default(),
        }
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn derate(&self) -> &DerateFactors {
        &self.derate
    }

    pub fn geometry(&self) -> &dyn SolarGeometry {
        self.geometry.as_ref()
    }

    /// Run every stage for one timestamp.
    pub fn evaluate(
        &self,
        timestamp: DateTime<FixedOffset>,
        location: &Location,
        panel: &PanelArray,
        sky: SkyCondition<'_>,
    ) -> Result<PowerSample> {
        let sun = self.geometry.sun_position(timestamp, location)?;
        let (ambient, wind) = match sky {
            SkyCondition::ClearSky(c) => (c.ambient_temp_c, c.wind_speed),
            SkyCondition::Observed(sample) => {
                let ambient = sample.ambient_temp_c.ok_or_else(|| {
                    SimError::bad_sample(timestamp, "ambient_temp", None, "missing ambient temperature")
                })?;
                (ambient, sample.wind_speed.unwrap_or(DEFAULT_WIND_SPEED))
            }
        };

        if !sun.is_above_horizon() {
            return Ok(PowerSample::night(
                timestamp,
                sun,
                ambient,
                temperature_factor(panel.temp_coefficient(), ambient),
                self.derate.inverter_efficiency.is_some(),
            ));
        }

        let irradiance = self.resolve_irradiance(timestamp, location, &sun, sky)?;
        let poa = transpose(
            irradiance,
            sun.zenith_deg,
            sun.azimuth_deg,
            panel.tilt_deg(),
            panel.azimuth_deg(),
            self.albedo,
            self.models.diffuse,
            self.models.iam,
        )?;
        let cell_temperature_c = cell_temperature(poa.global, ambient, wind, &self.models.thermal)?;
        let output = power(poa.global, cell_temperature_c, panel, &self.derate)?;

        Ok(PowerSample {
            timestamp,
            dc_power_w: output.dc_power_w,
            ac_power_w: output.ac_power_w,
            poa,
            cell_temperature_c,
            temperature_factor: output.temperature_factor,
            ambient_temp_c: ambient,
            irradiance,
            sun,
        })
    }

    fn resolve_irradiance(
        &self,
        timestamp: DateTime<FixedOffset>,
        location: &Location,
        sun: &SunPosition,
        sky: SkyCondition<'_>,
    ) -> Result<IrradianceComponents> {
        let sample = match sky {
            SkyCondition::ClearSky(c) => {
                let clear = self.geometry.clear_sky(timestamp, sun, location);
                return attenuate(clear, c.cloud_cover, sun.elevation_deg, self.models.cloud);
            }
            SkyCondition::Observed(sample) => sample,
        };

        let cos_z = sun.cos_zenith().max(0.0);
        let measured = match (sample.ghi, sample.dni, sample.dhi) {
            (Some(ghi), Some(dni), Some(dhi)) => Some(IrradianceComponents { ghi, dni, dhi }),
            (Some(ghi), Some(dni), None) => Some(IrradianceComponents {
                ghi,
                dni,
                dhi: (ghi - dni * cos_z).max(0.0),
            }),
            (Some(ghi), None, Some(dhi)) => Some(IrradianceComponents {
                ghi,
                dni: if cos_z > 0.0 { ((ghi - dhi) / cos_z).max(0.0) } else { 0.0 },
                dhi,
            }),
            (None, Some(dni), Some(dhi)) => Some(IrradianceComponents {
                ghi: dhi + dni * cos_z,
                dni,
                dhi,
            }),
            (Some(ghi), None, None) => {
                Some(decomposition::erbs(ghi, sun.zenith_deg, timestamp.ordinal()))
            }
            _ => None,
        };
        if let Some(irradiance) = measured {
            return Ok(irradiance);
        }

        match sample.cloud_cover_percent {
            Some(percent) => {
                let clear = self.geometry.clear_sky(timestamp, sun, location);
                attenuate(
                    clear,
                    CloudCover::Percent(percent),
                    sun.elevation_deg,
                    self.models.cloud,
                )
            }
            None => Err(SimError::bad_sample(
                timestamp,
                "irradiance",
                None,
                "sample has neither usable irradiance nor cloud cover",
            )),
        }
    }
}
