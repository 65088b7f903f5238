//! Incidence-angle modifiers: the fraction of beam irradiance that survives
//! reflection at the module cover for a given angle of incidence.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

const ASHRAE_B: f64 = 0.05;
const GLASS_REFRACTIVE_INDEX: f64 = 1.526;
const GLASS_EXTINCTION_PER_M: f64 = 4.0;
const GLASS_THICKNESS_M: f64 = 0.002;
const MARTIN_RUIZ_AR: f64 = 0.16;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IamModel {
    /// ASHRAE single-parameter model
    Ashrae,
    /// Fresnel reflection plus absorption in the glass cover (De Soto 2006)
    #[default]
    Physical,
    /// Martin & Ruiz (2001) empirical model
    MartinRuiz,
}

impl IamModel {
    /// Modifier in [0, 1]; zero for incidence at or beyond 90°.
    pub fn modifier(&self, aoi_deg: f64) -> f64 {
        if aoi_deg >= 90.0 {
            return 0.0;
        }
        let aoi = aoi_deg.abs();
        let value = match self {
            IamModel::Ashrae => ashrae(aoi),
            IamModel::Physical => physical(aoi),
            IamModel::MartinRuiz => martin_ruiz(aoi),
        };
        value.clamp(0.0, 1.0)
    }
}

fn ashrae(aoi_deg: f64) -> f64 {
    let cos = aoi_deg.to_radians().cos();
    if cos <= 0.0 {
        return 0.0;
    }
    1.0 - ASHRAE_B * (1.0 / cos - 1.0)
}

fn physical(aoi_deg: f64) -> f64 {
    if aoi_deg < 1e-6 {
        return 1.0;
    }
    let n = GLASS_REFRACTIVE_INDEX;
    let kl = GLASS_EXTINCTION_PER_M * GLASS_THICKNESS_M;
    let theta = aoi_deg.to_radians();
    let theta_r = (theta.sin() / n).asin();

    let rs = ((theta_r - theta).sin() / (theta_r + theta).sin()).powi(2);
    let rp = ((theta_r - theta).tan() / (theta_r + theta).tan()).powi(2);
    let tau = (-kl / theta_r.cos()).exp() * (1.0 - 0.5 * (rs + rp));

    let r0 = ((n - 1.0) / (n + 1.0)).powi(2);
    let tau0 = (-kl).exp() * (1.0 - r0);
    tau / tau0
}

fn martin_ruiz(aoi_deg: f64) -> f64 {
    let cos = aoi_deg.to_radians().cos().max(0.0);
    (1.0 - (-cos / MARTIN_RUIZ_AR).exp()) / (1.0 - (-1.0 / MARTIN_RUIZ_AR).exp())
}
