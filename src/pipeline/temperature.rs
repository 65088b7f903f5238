//! # Cell Temperature
//!
//! Steady-state cell temperature from plane-of-array irradiance, ambient
//! temperature and wind. Every model here returns the ambient temperature in
//! the dark, rises with irradiance and falls (or stays flat) with wind.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::domain::PanelArray;
use crate::error::{Result, SimError};

/// Irradiance at which the SAPM conduction offset is specified, W/m²
const SAPM_REFERENCE_IRRADIANCE: f64 = 1000.0;
/// NOCT test conditions: 800 W/m², 20°C ambient, 1 m/s wind
const NOCT_IRRADIANCE: f64 = 800.0;
const NOCT_AMBIENT: f64 = 20.0;
const DEFAULT_NOCT: f64 = 45.0;

/// Thermal model identifier, as used in configuration
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ThermalModelKind {
    #[default]
    Faiman,
    Sapm,
    Pvsyst,
    GenericLinear,
    Noct,
}

/// Thermal model with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ThermalModel {
    /// Radiative/convective heat balance, Faiman (2008): `u0 + u1·ws`
    Faiman { u0: f64, u1: f64 },
    /// Sandia array performance model (King 2004)
    Sapm { a: f64, b: f64, delta_t: f64 },
    /// PVsyst heat loss factor model
    Pvsyst {
        u_c: f64,
        u_v: f64,
        module_efficiency: f64,
        absorptance: f64,
    },
    /// Linear heat loss with an absorbed-irradiance numerator
    GenericLinear {
        u_const: f64,
        du_wind: f64,
        module_efficiency: f64,
        absorptance: f64,
    },
    /// Datasheet NOCT with a wind correction normalised to 1 m/s
    Noct { noct_c: f64 },
}

impl ThermalModel {
    /// Standard parameter set for a model, filled from the panel where the
    /// model needs module data.
    pub fn standard(kind: ThermalModelKind, panel: &PanelArray) -> Self {
        match kind {
            ThermalModelKind::Faiman => ThermalModel::Faiman { u0: 25.0, u1: 6.84 },
            // open rack, glass/glass
            ThermalModelKind::Sapm => ThermalModel::Sapm {
                a: -3.47,
                b: -0.0594,
                delta_t: 3.0,
            },
            ThermalModelKind::Pvsyst => ThermalModel::Pvsyst {
                u_c: 29.0,
                u_v: 0.0,
                module_efficiency: panel.efficiency(),
                absorptance: 0.9,
            },
            ThermalModelKind::GenericLinear => ThermalModel::GenericLinear {
                u_const: 29.0,
                du_wind: 0.0,
                module_efficiency: panel.efficiency(),
                absorptance: 0.9,
            },
            ThermalModelKind::Noct => ThermalModel::Noct {
                noct_c: panel.noct_c().unwrap_or(DEFAULT_NOCT),
            },
        }
    }

    pub fn kind(&self) -> ThermalModelKind {
        match self {
            ThermalModel::Faiman { .. } => ThermalModelKind::Faiman,
            ThermalModel::Sapm { .. } => ThermalModelKind::Sapm,
            ThermalModel::Pvsyst { .. } => ThermalModelKind::Pvsyst,
            ThermalModel::GenericLinear { .. } => ThermalModelKind::GenericLinear,
            ThermalModel::Noct { .. } => ThermalModelKind::Noct,
        }
    }

    /// Rejects parameter sets that would break the monotonicity guarantees.
    pub fn validate(&self) -> Result<()> {
        let bad = |name: &str, reason: &str| Err(SimError::invalid(name, reason.to_string()));
        match *self {
            ThermalModel::Faiman { u0, u1 } => {
                if !(u0 > 0.0) {
                    return bad("u0", "must be > 0");
                }
                if !(u1 >= 0.0) {
                    return bad("u1", "must be >= 0");
                }
            }
            ThermalModel::Sapm { a, b, delta_t } => {
                if !a.is_finite() {
                    return bad("a", "must be finite");
                }
                if !(b <= 0.0) {
                    return bad("b", "must be <= 0 so wind cools the module");
                }
                if !(delta_t >= 0.0) {
                    return bad("delta_t", "must be >= 0");
                }
            }
            ThermalModel::Pvsyst {
                u_c: u_const,
                u_v: du_wind,
                module_efficiency,
                absorptance,
            }
            | ThermalModel::GenericLinear {
                u_const,
                du_wind,
                module_efficiency,
                absorptance,
            } => {
                if !(u_const > 0.0) {
                    return bad("u_const", "must be > 0");
                }
                if !(du_wind >= 0.0) {
                    return bad("du_wind", "must be >= 0");
                }
                if !(0.0..1.0).contains(&module_efficiency) {
                    return bad("module_efficiency", "must be within [0, 1)");
                }
                if !(0.0..=1.0).contains(&absorptance) {
                    return bad("absorptance", "must be within [0, 1]");
                }
            }
            ThermalModel::Noct { noct_c } => {
                if !(noct_c > NOCT_AMBIENT && noct_c <= 80.0) {
                    return bad("noct_c", "must be within (20, 80]");
                }
            }
        }
        Ok(())
    }
}

/// Cell temperature in °C.
pub fn cell_temperature(
    poa_global: f64,
    ambient_temp_c: f64,
    wind_speed: f64,
    model: &ThermalModel,
) -> Result<f64> {
    if !(wind_speed >= 0.0) {
        return Err(SimError::invalid(
            "wind_speed",
            format!("must be >= 0, got {wind_speed}"),
        ));
    }
    if !(poa_global >= 0.0) {
        return Err(SimError::invalid(
            "poa_global",
            format!("must be >= 0, got {poa_global}"),
        ));
    }
    model.validate()?;

    let rise = match *model {
        ThermalModel::Faiman { u0, u1 } => poa_global / (u0 + u1 * wind_speed),
        ThermalModel::Sapm { a, b, delta_t } => {
            poa_global * (a + b * wind_speed).exp()
                + poa_global / SAPM_REFERENCE_IRRADIANCE * delta_t
        }
        ThermalModel::Pvsyst {
            u_c,
            u_v,
            module_efficiency,
            absorptance,
        } => absorptance * poa_global * (1.0 - module_efficiency) / (u_c + u_v * wind_speed),
        ThermalModel::GenericLinear {
            u_const,
            du_wind,
            module_efficiency,
            absorptance,
        } => {
            poa_global * (absorptance - module_efficiency).max(0.0)
                / (u_const + du_wind * wind_speed)
        }
        ThermalModel::Noct { noct_c } => {
            poa_global / NOCT_IRRADIANCE * (noct_c - NOCT_AMBIENT) * 9.5 / (5.7 + 3.8 * wind_speed)
        }
    };
    Ok(ambient_temp_c + rise)
}
