use serde::{Deserialize, Serialize};

/// Apparent sun position for a site and instant
///
/// Zenith and elevation are refraction corrected; azimuth is measured
/// clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunPosition {
    pub zenith_deg: f64,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
}

impl SunPosition {
    pub fn from_zenith(zenith_deg: f64, azimuth_deg: f64) -> Self {
        Self {
            zenith_deg,
            elevation_deg: 90.0 - zenith_deg,
            azimuth_deg,
        }
    }

    pub fn is_above_horizon(&self) -> bool {
        self.elevation_deg > 0.0
    }

    pub fn cos_zenith(&self) -> f64 {
        self.zenith_deg.to_radians().cos()
    }
}

/// Horizontal irradiance split into its three components, W/m²
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IrradianceComponents {
    /// Global horizontal irradiance
    pub ghi: f64,
    /// Direct normal irradiance
    pub dni: f64,
    /// Diffuse horizontal irradiance
    pub dhi: f64,
}

impl IrradianceComponents {
    pub const ZERO: Self = Self {
        ghi: 0.0,
        dni: 0.0,
        dhi: 0.0,
    };

    pub fn new(ghi: f64, dni: f64, dhi: f64) -> Self {
        Self { ghi, dni, dhi }
    }

    /// Global horizontal recomputed from the beam and diffuse parts
    pub fn closure_ghi(&self, zenith_deg: f64) -> f64 {
        self.dhi + self.dni * zenith_deg.to_radians().cos().max(0.0)
    }
}

/// Irradiance on the tilted module plane, W/m²
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoaComponents {
    pub global: f64,
    /// Beam component after the incidence-angle reflection loss
    pub direct: f64,
    pub sky_diffuse: f64,
    pub ground_diffuse: f64,
    /// Angle of incidence of the beam on the module, degrees
    pub aoi_deg: f64,
    /// Incidence-angle modifier applied to the beam (0..=1)
    pub iam: f64,
}

impl PoaComponents {
    pub fn dark(aoi_deg: f64) -> Self {
        Self {
            aoi_deg,
            ..Self::default()
        }
    }

    pub fn diffuse(&self) -> f64 {
        self.sky_diffuse + self.ground_diffuse
    }
}
