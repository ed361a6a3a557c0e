//! Resistance-to-conductivity calibration
//!
//! Two equations are in use, one per probe family:
//!
//! | Model | Equation | Probe |
//! |-------|----------|-------|
//! | [`CalibrationModel::Linear`] | `k = 1/(cell_constant·R) + intercept` | four-pole |
//! | [`CalibrationModel::PowerLaw`] | `k = 10^A · (R − B)^C` | two-pole |
//!
//! Coefficients are fitted offline against standard solutions and supplied
//! through [`SensorConfig`](crate::config::SensorConfig). A freshly built
//! probe runs with the placeholder coefficients returned by
//! [`CalibrationModel::uncalibrated_linear`] or
//! [`CalibrationModel::uncalibrated_power_law`]; conductivities computed from
//! them carry `calibrated == false` so the logger can tell.
//!
//! The units of `k` are whatever the standards were recorded in. The salinity
//! relation in [`seawater`](crate::seawater) expects mS/cm.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{MeasurementError, MeasurementResult};
use crate::traits::Validatable;

/// Conductivity calibration equation with its fitted coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "model", rename_all = "snake_case"))]
pub enum CalibrationModel {
    /// `k = 1/(cell_constant·R) + intercept`
    Linear {
        /// Cell constant (1/cm)
        cell_constant: f32,
        /// Intercept, in conductivity units
        intercept: f32,
    },
    /// `k = 10^a · (R − b)^c`
    PowerLaw {
        /// Scale exponent (decades)
        a: f32,
        /// Resistance offset (Ω)
        b: f32,
        /// Power applied to the offset resistance
        c: f32,
    },
}

impl Default for CalibrationModel {
    fn default() -> Self {
        Self::uncalibrated_linear()
    }
}

/// Conductivity together with the calibration state it was computed under
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Conductivity {
    /// Conductivity in the calibration's units
    pub value: f32,
    /// False when the placeholder coefficients were used
    pub calibrated: bool,
}

impl CalibrationModel {
    /// Linear model from a cell constant and intercept
    pub const fn linear(cell_constant: f32, intercept: f32) -> Self {
        Self::Linear { cell_constant, intercept }
    }

    /// Power-law model from fitted coefficients
    pub const fn power_law(a: f32, b: f32, c: f32) -> Self {
        Self::PowerLaw { a, b, c }
    }

    /// Placeholder for a four-pole probe that has not been through calibration
    pub const fn uncalibrated_linear() -> Self {
        Self::linear(1.0, 0.0)
    }

    /// Placeholder for a two-pole probe that has not been through calibration
    pub const fn uncalibrated_power_law() -> Self {
        Self::power_law(1.0, 1.0, 1.0)
    }

    /// False while the placeholder coefficients are in place
    pub fn is_calibrated(&self) -> bool {
        *self != Self::uncalibrated_linear() && *self != Self::uncalibrated_power_law()
    }

    /// Reject coefficients no fit could have produced
    pub fn validate(&self) -> MeasurementResult<()> {
        match *self {
            Self::Linear { cell_constant, intercept } => {
                if !cell_constant.is_valid() || cell_constant == 0.0 {
                    return Err(MeasurementError::InvalidConfig {
                        reason: "cell constant must be finite and non-zero",
                    });
                }
                if !intercept.is_valid() {
                    return Err(MeasurementError::InvalidConfig {
                        reason: "intercept must be finite",
                    });
                }
            }
            Self::PowerLaw { a, b, c } => {
                if !(a.is_valid() && b.is_valid() && c.is_valid()) {
                    return Err(MeasurementError::InvalidConfig {
                        reason: "power-law coefficients must be finite",
                    });
                }
            }
        }
        Ok(())
    }

    /// Conductivity for a reduced cell resistance (Ω)
    ///
    /// Fails with `DomainViolation` when the equation has no finite value:
    /// zero resistance under the linear model, or `R − B` that a fractional
    /// or negative exponent cannot be applied to.
    ///
    /// ```rust
    /// use ctdlog_core::calibration::CalibrationModel;
    ///
    /// let model = CalibrationModel::linear(1.0, 0.0);
    /// assert_eq!(model.conductivity(100.0).map(|k| k.value), Ok(0.01));
    /// assert!(model.conductivity(0.0).is_err());
    /// ```
    pub fn conductivity(&self, resistance_ohms: f32) -> MeasurementResult<Conductivity> {
        if !resistance_ohms.is_valid() {
            return Err(MeasurementError::domain("conductivity", "resistance is not finite"));
        }

        let value = match *self {
            Self::Linear { cell_constant, intercept } => {
                let denominator = cell_constant * resistance_ohms;
                if denominator == 0.0 {
                    return Err(MeasurementError::domain("conductivity", "zero resistance"));
                }
                1.0 / denominator + intercept
            }
            Self::PowerLaw { a, b, c } => {
                let base = resistance_ohms - b;
                if base < 0.0 {
                    return Err(MeasurementError::domain(
                        "conductivity",
                        "resistance below power-law offset",
                    ));
                }
                libm::powf(10.0, a) * libm::powf(base, c)
            }
        };

        if !value.is_valid() {
            return Err(MeasurementError::domain("conductivity", "result is not finite"));
        }
        Ok(Conductivity {
            value,
            calibrated: self.is_calibrated(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_linear_model() {
        let model = CalibrationModel::linear(1.0, 0.0);
        let k = model.conductivity(100.0).unwrap();
        assert_eq!(k.value, 0.01);
        assert!(!k.calibrated);
    }

    #[test]
    fn linear_with_intercept() {
        let model = CalibrationModel::linear(0.5, 3.0);
        let k = model.conductivity(40.0).unwrap();
        assert!((k.value - 3.05).abs() < 1e-6);
        assert!(k.calibrated);
    }

    #[test]
    fn zero_resistance_is_a_domain_error() {
        let err = CalibrationModel::linear(1.0, 0.0).conductivity(0.0).unwrap_err();
        assert!(matches!(err, MeasurementError::DomainViolation { quantity: "conductivity", .. }));
    }

    #[test]
    fn non_finite_resistance_rejected() {
        let model = CalibrationModel::linear(1.0, 0.0);
        assert!(model.conductivity(f32::NAN).is_err());
        assert!(model.conductivity(f32::INFINITY).is_err());
    }

    #[test]
    fn power_law_model() {
        // 10^2 * (1100 - 100)^-0.5 = 100 / sqrt(1000)
        let model = CalibrationModel::power_law(2.0, 100.0, -0.5);
        let k = model.conductivity(1100.0).unwrap();
        assert!((k.value - 3.162_277_7).abs() < 1e-4);
        assert!(k.calibrated);
    }

    #[test]
    fn power_law_below_offset_fails() {
        let model = CalibrationModel::power_law(2.0, 500.0, -0.5);
        assert!(model.conductivity(400.0).is_err());
        // Zero base with a negative exponent diverges
        assert!(model.conductivity(500.0).is_err());
    }

    #[test]
    fn placeholder_coefficients_are_uncalibrated() {
        assert!(!CalibrationModel::uncalibrated_linear().is_calibrated());
        assert!(!CalibrationModel::uncalibrated_power_law().is_calibrated());
        assert!(!CalibrationModel::default().is_calibrated());
        assert!(CalibrationModel::linear(0.92, 15.0).is_calibrated());

        let k = CalibrationModel::uncalibrated_power_law().conductivity(11.0).unwrap();
        assert_eq!(k.value, 100.0);
        assert!(!k.calibrated);
    }

    #[test]
    fn invalid_coefficients_rejected() {
        assert!(CalibrationModel::linear(0.0, 1.0).validate().is_err());
        assert!(CalibrationModel::linear(1.0, f32::NAN).validate().is_err());
        assert!(CalibrationModel::power_law(f32::INFINITY, 0.0, 1.0).validate().is_err());
        assert!(CalibrationModel::power_law(1.0, 0.0, 1.0).validate().is_ok());
    }
}
