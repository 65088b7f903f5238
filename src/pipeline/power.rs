use serde::{Deserialize, Serialize};

use crate::domain::PanelArray;
use crate::error::{Result, SimError};

/// Reference cell temperature for nameplate ratings, °C
pub const REFERENCE_CELL_TEMP: f64 = 25.0;

/// Multiplicative losses applied after the temperature correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerateFactors {
    /// Fraction of light passing through dirt on the cover (1.0 = clean)
    pub soiling: f64,
    /// Remaining fraction of nameplate after ageing (1.0 = new)
    pub degradation: f64,
    /// DC to AC conversion efficiency; `None` skips the AC stage
    pub inverter_efficiency: Option<f64>,
}

impl Default for DerateFactors {
    fn default() -> Self {
        Self {
            soiling: 1.0,
            degradation: 1.0,
            inverter_efficiency: None,
        }
    }
}

impl DerateFactors {
    pub fn validate(&self) -> Result<()> {
        check_unit_fraction("soiling", self.soiling)?;
        check_unit_fraction("degradation", self.degradation)?;
        if let Some(eff) = self.inverter_efficiency {
            check_unit_fraction("inverter_efficiency", eff)?;
        }
        Ok(())
    }
}

fn check_unit_fraction(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("{value} outside (0, 1]")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerOutput {
    pub dc_power_w: f64,
    pub ac_power_w: Option<f64>,
    pub temperature_factor: f64,
}

/// Power temperature correction relative to 25°C.
///
/// Exceeds 1 for cells cooler than the reference; may go negative in
/// extreme heat, which [`power`] saturates to zero output.
pub fn temperature_factor(temp_coefficient: f64, cell_temp_c: f64) -> f64 {
    1.0 + temp_coefficient * (cell_temp_c - REFERENCE_CELL_TEMP)
}

/// DC (and optionally AC) output for a plane-of-array irradiance.
pub fn power(
    poa_global: f64,
    cell_temp_c: f64,
    panel: &PanelArray,
    derate: &DerateFactors,
) -> Result<PowerOutput> {
    derate.validate()?;
    if !(poa_global >= 0.0) {
        return Err(SimError::invalid(
            "poa_global",
            format!("must be >= 0, got {poa_global}"),
        ));
    }
    let factor = temperature_factor(panel.temp_coefficient(), cell_temp_c);
    let dc = (poa_global
        * panel.area_m2()
        * panel.efficiency()
        * factor
        * derate.soiling
        * derate.degradation)
        .max(0.0);
    Ok(PowerOutput {
        dc_power_w: dc,
        ac_power_w: derate.inverter_efficiency.map(|eff| dc * eff),
        temperature_factor: factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn panel() -> PanelArray {
        PanelArray::new(10.0, 0.2, 30.0, 180.0).unwrap()
    }

    #[test]
    fn standard_conditions_give_nameplate() {
        let out = power(1000.0, 25.0, &panel(), &DerateFactors::default()).unwrap();
        assert!((out.dc_power_w - 2000.0).abs() < 1e-9);
        assert_eq!(out.temperature_factor, 1.0);
        assert!(out.ac_power_w.is_none());
    }

    #[test]
    fn cold_cells_exceed_nameplate() {
        let out = power(1000.0, 5.0, &panel(), &DerateFactors::default()).unwrap();
        assert!(out.temperature_factor > 1.0);
        assert!(out.dc_power_w > 2000.0);
    }

    #[test]
    fn extreme_heat_saturates_at_zero() {
        let out = power(1000.0, 400.0, &panel(), &DerateFactors::default()).unwrap();
        assert!(out.temperature_factor < 0.0);
        assert_eq!(out.dc_power_w, 0.0);
    }

    #[test]
    fn derates_multiply_through() {
        let derate = DerateFactors {
            soiling: 0.98,
            degradation: 0.95,
            inverter_efficiency: Some(0.96),
        };
        let out = power(1000.0, 25.0, &panel(), &derate).unwrap();
        let dc = 2000.0 * 0.98 * 0.95;
        assert!((out.dc_power_w - dc).abs() < 1e-9);
        assert!((out.ac_power_w.unwrap() - dc * 0.96).abs() < 1e-9);
    }

    #[rstest]
    #[case(0.0, 1.0, None)]
    #[case(1.1, 1.0, None)]
    #[case(1.0, -0.5, None)]
    #[case(1.0, 1.0, Some(0.0))]
    #[case(1.0, 1.0, Some(1.01))]
    fn rejects_out_of_range_derates(
        #[case] soiling: f64,
        #[case] degradation: f64,
        #[case] inverter_efficiency: Option<f64>,
    ) {
        let derate = DerateFactors { soiling, degradation, inverter_efficiency };
        let err = power(800.0, 30.0, &panel(), &derate).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { .. }));
    }
}
