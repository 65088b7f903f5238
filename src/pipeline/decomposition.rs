//! Splits measured global horizontal irradiance into beam and diffuse parts
//! with the Erbs et al. (1982) diffuse-fraction correlation.

use crate::domain::IrradianceComponents;
use crate::solar::extraterrestrial_irradiance;

/// Above this zenith the beam is not resolved and all light is diffuse
const MAX_BEAM_ZENITH: f64 = 87.0;

pub fn erbs(ghi: f64, zenith_deg: f64, day_of_year: u32) -> IrradianceComponents {
    if ghi <= 0.0 || zenith_deg >= 90.0 {
        return IrradianceComponents::new(ghi.max(0.0), 0.0, ghi.max(0.0));
    }
    let cos_z = zenith_deg.to_radians().cos();
    if zenith_deg > MAX_BEAM_ZENITH {
        return IrradianceComponents::new(ghi, 0.0, ghi);
    }
    let kt = (ghi / (extraterrestrial_irradiance(day_of_year) * cos_z)).clamp(0.0, 1.0);
    let kd = if kt <= 0.22 {
        1.0 - 0.09 * kt
    } else if kt <= 0.8 {
        0.9511 - 0.1604 * kt + 4.388 * kt.powi(2) - 16.638 * kt.powi(3) + 12.336 * kt.powi(4)
    } else {
        0.165
    };
    let dhi = ghi * kd.clamp(0.0, 1.0);
    let dni = ((ghi - dhi) / cos_z).max(0.0);
    IrradianceComponents { ghi, dni, dhi }
}
