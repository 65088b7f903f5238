//! # Clear-Sky Irradiance
//!
//! Ineichen–Perez clear-sky model with the altitude corrections of the
//! original publication, plus the air-mass and extraterrestrial helpers the
//! transposition models share.
//!
//! References:
//! - Ineichen, P.; Perez, R. (2002). A new airmass independent formulation
//!   for the Linke turbidity coefficient. Solar Energy 73(3), 151-157.
//! - Kasten, F.; Young, A. T. (1989). Revised optical air mass tables and
//!   approximation formula. Applied Optics 28(22), 4735-4738.

use std::f64::consts::PI;

use crate::domain::IrradianceComponents;

/// Solar constant used for the extraterrestrial irradiance, W/m²
pub const SOLAR_CONSTANT: f64 = 1367.0;

/// Default Linke turbidity for a moderately clean mid-latitude atmosphere
pub const DEFAULT_LINKE_TURBIDITY: f64 = 3.0;

const SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;

/// Relative optical air mass (Kasten–Young 1989) for an apparent zenith.
///
/// Returns `None` when the sun is at or below the horizon.
pub fn relative_air_mass(zenith_deg: f64) -> Option<f64> {
    if !(0.0..90.0).contains(&zenith_deg) {
        return None;
    }
    let cos_z = zenith_deg.to_radians().cos();
    Some(1.0 / (cos_z + 0.50572 * (96.07995 - zenith_deg).powf(-1.6364)))
}

/// Standard-atmosphere surface pressure for an altitude in meters
pub fn pressure_at_altitude(altitude_m: f64) -> f64 {
    SEA_LEVEL_PRESSURE_PA * (1.0 - 2.25577e-5 * altitude_m).powf(5.25588)
}

/// Pressure-corrected air mass
pub fn absolute_air_mass(relative: f64, pressure_pa: f64) -> f64 {
    relative * pressure_pa / SEA_LEVEL_PRESSURE_PA
}

/// Extraterrestrial normal irradiance for a day of year (Spencer 1971)
pub fn extraterrestrial_irradiance(day_of_year: u32) -> f64 {
    let b = 2.0 * PI * (day_of_year as f64 - 1.0) / 365.0;
    SOLAR_CONSTANT
        * (1.000_11
            + 0.034_221 * b.cos()
            + 0.001_28 * b.sin()
            + 0.000_719 * (2.0 * b).cos()
            + 0.000_077 * (2.0 * b).sin())
}

/// Ineichen–Perez clear-sky irradiance.
///
/// All components are zero for a sun at or below the horizon.
pub fn ineichen(
    apparent_zenith_deg: f64,
    altitude_m: f64,
    day_of_year: u32,
    linke_turbidity: f64,
) -> IrradianceComponents {
    let Some(am_rel) = relative_air_mass(apparent_zenith_deg) else {
        return IrradianceComponents::ZERO;
    };
    let cos_z = apparent_zenith_deg.to_radians().cos().max(0.0);
    let am = absolute_air_mass(am_rel, pressure_at_altitude(altitude_m));
    let tl = linke_turbidity;
    let i0 = extraterrestrial_irradiance(day_of_year);

    let fh1 = (-altitude_m / 8000.0).exp();
    let fh2 = (-altitude_m / 1250.0).exp();
    let cg1 = 5.09e-5 * altitude_m + 0.868;
    let cg2 = 3.92e-5 * altitude_m + 0.0387;

    let ghi = (cg1 * i0 * cos_z * (-cg2 * am * (fh1 + fh2 * (tl - 1.0))).exp()).max(0.0);

    let b = 0.664 + 0.163 / fh1;
    let bnci = b * (-0.09 * am * (tl - 1.0)).exp() * i0;
    let bnci_2 = if cos_z > 0.0 {
        let ratio = (1.0 - (0.1 - 0.2 * (-tl).exp()) / (0.1 + 0.882 / fh1)) / cos_z;
        ghi * ratio.clamp(0.0, 1e20)
    } else {
        0.0
    };
    let dni = bnci.min(bnci_2).max(0.0);
    let dhi = (ghi - dni * cos_z).max(0.0);

    IrradianceComponents { ghi, dni, dhi }
}
