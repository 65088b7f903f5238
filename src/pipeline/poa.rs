//! # Plane-of-Array Transposition
//!
//! Projects horizontal irradiance onto the tilted module plane:
//!
//! - **Beam**: DNI times the cosine of the angle of incidence, reduced by the
//!   incidence-angle modifier.
//! - **Sky diffuse**: isotropic, Perez (1990) or Hay–Davies.
//! - **Ground reflected**: GHI times albedo times the ground view factor.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::iam::IamModel;
use crate::domain::{IrradianceComponents, PoaComponents};
use crate::error::{Result, SimError};
use crate::solar::{relative_air_mass, SOLAR_CONSTANT};

pub const DEFAULT_ALBEDO: f64 = 0.2;

/// Below this cosine the beam is treated as parallel to the module plane
const GRAZING_COS: f64 = 1e-10;

/// Sky-diffuse transposition model
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiffuseModel {
    Isotropic,
    #[default]
    Perez,
    HayDavies,
}

// Perez et al. (1990) all-sites composite coefficients:
// f11 f12 f13 f21 f22 f23 per sky clearness bin.
const PEREZ_COEFFICIENTS: [[f64; 6]; 8] = [
    [-0.008, 0.588, -0.062, -0.060, 0.072, -0.022],
    [0.130, 0.683, -0.151, -0.019, 0.066, -0.029],
    [0.330, 0.487, -0.221, 0.055, -0.064, -0.026],
    [0.568, 0.187, -0.295, 0.109, -0.152, -0.014],
    [0.873, -0.392, -0.362, 0.226, -0.462, 0.001],
    [1.132, -1.237, -0.412, 0.288, -0.823, 0.056],
    [1.060, -1.600, -0.359, 0.264, -1.127, 0.131],
    [0.678, -0.327, -0.250, 0.156, -1.377, 0.251],
];

const PEREZ_EPSILON_BINS: [f64; 7] = [1.065, 1.23, 1.5, 1.95, 2.8, 4.5, 6.2];

/// Angle of incidence between the sun and the module normal, degrees
pub fn angle_of_incidence(
    sun_zenith_deg: f64,
    sun_azimuth_deg: f64,
    tilt_deg: f64,
    panel_azimuth_deg: f64,
) -> f64 {
    cos_incidence(sun_zenith_deg, sun_azimuth_deg, tilt_deg, panel_azimuth_deg)
        .acos()
        .to_degrees()
}

fn cos_incidence(zenith_deg: f64, sun_azimuth_deg: f64, tilt_deg: f64, panel_azimuth_deg: f64) -> f64 {
    let z = zenith_deg.to_radians();
    let t = tilt_deg.to_radians();
    let da = (sun_azimuth_deg - panel_azimuth_deg).to_radians();
    (z.cos() * t.cos() + z.sin() * t.sin() * da.cos()).clamp(-1.0, 1.0)
}

/// Transpose horizontal irradiance onto the module plane.
#[allow(clippy::too_many_arguments)]
pub fn transpose(
    irradiance: IrradianceComponents,
    sun_zenith_deg: f64,
    sun_azimuth_deg: f64,
    tilt_deg: f64,
    panel_azimuth_deg: f64,
    albedo: f64,
    diffuse_model: DiffuseModel,
    iam_model: IamModel,
) -> Result<PoaComponents> {
    if !(0.0..=90.0).contains(&tilt_deg) {
        return Err(SimError::invalid("tilt", format!("{tilt_deg} outside [0, 90]")));
    }
    if !(0.0..360.0).contains(&panel_azimuth_deg) {
        return Err(SimError::invalid(
            "azimuth",
            format!("{panel_azimuth_deg} outside [0, 360)"),
        ));
    }
    if !(0.0..=1.0).contains(&albedo) {
        return Err(SimError::invalid("albedo", format!("{albedo} outside [0, 1]")));
    }
    for (name, value) in [
        ("ghi", irradiance.ghi),
        ("dni", irradiance.dni),
        ("dhi", irradiance.dhi),
    ] {
        if !(value >= 0.0 && value.is_finite()) {
            return Err(SimError::invalid(name, format!("irradiance must be >= 0, got {value}")));
        }
    }

    let mut cos_aoi = cos_incidence(sun_zenith_deg, sun_azimuth_deg, tilt_deg, panel_azimuth_deg);
    if cos_aoi.abs() < GRAZING_COS {
        cos_aoi = 0.0;
    }
    let aoi_deg = cos_aoi.acos().to_degrees();
    let cos_tilt = tilt_deg.to_radians().cos();

    let sun_up = sun_zenith_deg < 90.0;
    let iam = if sun_up && cos_aoi > 0.0 {
        iam_model.modifier(aoi_deg)
    } else {
        0.0
    };
    let beam = if sun_up {
        irradiance.dni * cos_aoi.max(0.0) * iam
    } else {
        0.0
    };

    let sky_diffuse = match diffuse_model {
        _ if irradiance.dni <= 0.0 || !sun_up => isotropic(irradiance.dhi, cos_tilt),
        DiffuseModel::Isotropic => isotropic(irradiance.dhi, cos_tilt),
        DiffuseModel::HayDavies => hay_davies(irradiance, sun_zenith_deg, cos_aoi, cos_tilt),
        DiffuseModel::Perez => perez(irradiance, sun_zenith_deg, cos_aoi, tilt_deg),
    };
    let ground_diffuse = irradiance.ghi * albedo * (1.0 - cos_tilt) / 2.0;

    Ok(PoaComponents {
        global: (beam + sky_diffuse + ground_diffuse).max(0.0),
        direct: beam,
        sky_diffuse,
        ground_diffuse,
        aoi_deg,
        iam,
    })
}

fn isotropic(dhi: f64, cos_tilt: f64) -> f64 {
    dhi * (1.0 + cos_tilt) / 2.0
}

fn hay_davies(irr: IrradianceComponents, zenith_deg: f64, cos_aoi: f64, cos_tilt: f64) -> f64 {
    let anisotropy = (irr.dni / SOLAR_CONSTANT).clamp(0.0, 1.0);
    let cos_z = zenith_deg.to_radians().cos().max(85f64.to_radians().cos());
    let rb = cos_aoi.max(0.0) / cos_z;
    (irr.dhi * (anisotropy * rb + (1.0 - anisotropy) * (1.0 + cos_tilt) / 2.0)).max(0.0)
}

fn perez(irr: IrradianceComponents, zenith_deg: f64, cos_aoi: f64, tilt_deg: f64) -> f64 {
    if irr.dhi <= 0.0 {
        return 0.0;
    }
    let Some(air_mass) = relative_air_mass(zenith_deg) else {
        return isotropic(irr.dhi, tilt_deg.to_radians().cos());
    };
    let z = zenith_deg.to_radians();
    let kz3 = 1.041 * z.powi(3);
    let epsilon = ((irr.dhi + irr.dni) / irr.dhi + kz3) / (1.0 + kz3);
    let bin = PEREZ_EPSILON_BINS
        .iter()
        .position(|edge| epsilon < *edge)
        .unwrap_or(PEREZ_EPSILON_BINS.len());
    let [f11, f12, f13, f21, f22, f23] = PEREZ_COEFFICIENTS[bin];

    let delta = irr.dhi * air_mass / SOLAR_CONSTANT;
    let f1 = (f11 + f12 * delta + f13 * z).max(0.0);
    let f2 = f21 + f22 * delta + f23 * z;

    let a = cos_aoi.max(0.0);
    let b = z.cos().max(85f64.to_radians().cos());
    let t = tilt_deg.to_radians();

    let sky = irr.dhi * ((1.0 - f1) * (1.0 + t.cos()) / 2.0 + f1 * a / b + f2 * t.sin());
    sky.max(0.0)
}
