//! Salinity, temperature-compensated conductivity and dissolved solids
//!
//! All three are derived from a calibrated conductivity and a temperature.
//! They are computed independently: a salinity domain failure leaves `k25`
//! and TDS usable, and never touches the resistance or conductivity they
//! were derived from.
//!
//! Salinity is only meaningful for `k` in mS/cm. The conductance term
//! `k^-1.07 − 7.464e-4` crosses zero near `k ≈ 836 mS/cm`, far above
//! seawater (~50 mS/cm); readings above that usually mean the calibration
//! produced µS/cm.

use crate::constants::seawater::{
    CHLORINITY_TO_SALINITY, K25_REFERENCE_TEMPERATURE_C, K25_TEMPERATURE_COEFFICIENT,
    SALINITY_CONDUCTANCE_EXPONENT, SALINITY_CONDUCTANCE_OFFSET, SALINITY_CONDUCTANCE_SCALE,
    SALINITY_TEMPERATURE_POLY, TDS_PER_K25,
};
use crate::errors::{MeasurementError, MeasurementResult};
use crate::traits::Validatable;

/// Salinity (ppt) from temperature (°C) and conductivity (mS/cm)
///
/// Fails with `DomainViolation` unless `k > 0` and `k^-1.07 > 7.464e-4`.
pub fn salinity(temperature_c: f32, conductivity: f32) -> MeasurementResult<f32> {
    if !temperature_c.is_valid() {
        return Err(MeasurementError::domain("salinity", "temperature is not finite"));
    }
    if !conductivity.is_valid() || conductivity <= 0.0 {
        return Err(MeasurementError::domain("salinity", "conductivity must be positive"));
    }

    let conductance = libm::powf(conductivity, SALINITY_CONDUCTANCE_EXPONENT);
    let denominator = conductance - SALINITY_CONDUCTANCE_OFFSET;
    if denominator <= 0.0 {
        return Err(MeasurementError::domain(
            "salinity",
            "k^-1.07 must exceed 7.464e-4",
        ));
    }

    let a = SALINITY_CONDUCTANCE_SCALE / denominator;
    let chlorinity = a * temperature_polynomial(temperature_c);
    let value = CHLORINITY_TO_SALINITY * chlorinity;
    if !value.is_valid() {
        return Err(MeasurementError::domain("salinity", "result is not finite"));
    }
    Ok(value)
}

/// `K(T) = B0 + B1·T + … + B6·T⁶`, Horner form
fn temperature_polynomial(t: f32) -> f32 {
    SALINITY_TEMPERATURE_POLY
        .iter()
        .rev()
        .fold(0.0, |acc, &b| acc * t + b)
}

/// Conductivity compensated to 25 °C, for KCl standards and fresh water
pub fn k25(conductivity: f32, temperature_c: f32) -> MeasurementResult<f32> {
    let factor = 1.0 + K25_TEMPERATURE_COEFFICIENT * (temperature_c - K25_REFERENCE_TEMPERATURE_C);
    if !factor.is_valid() || factor <= 0.0 {
        return Err(MeasurementError::domain(
            "k25",
            "compensation factor is not positive",
        ));
    }
    let value = conductivity / factor;
    if !value.is_valid() {
        return Err(MeasurementError::domain("k25", "result is not finite"));
    }
    Ok(value)
}

/// Total dissolved solids estimated from k25
pub fn total_dissolved_solids(k25: f32) -> f32 {
    TDS_PER_K25 * k25
}
