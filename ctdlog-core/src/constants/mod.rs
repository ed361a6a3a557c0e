//! Constants for the Measurement Core
//!
//! Every numeric value used by the excitation, conversion and calibration
//! code is defined here with its unit and source.
//!
//! ## Organization
//!
//! - **ADC**: converter resolution, reference voltage, sample buffer capacity
//! - **Seawater**: salinity polynomial, temperature compensation, TDS factor
//! - **Thermistor**: Steinhart-Hart coefficients and out-of-range sentinels
//! - **Timing**: default excitation timings and sample counts per variant
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Include units in the name
//! 3. Reference the datasheet or publication the value comes from

/// ADC resolution, reference voltage and buffer limits.
pub mod adc;

/// Salinity, temperature compensation and dissolved solids coefficients.
pub mod seawater;

/// Thermistor model coefficients and sentinel temperatures.
pub mod thermistor;

/// Excitation timings and default sample counts.
pub mod timing;

pub use adc::{ADC_BITS_12, ADC_FULL_SCALE_12BIT, DEFAULT_V_REF, MAX_SAMPLES};
pub use thermistor::{THERMISTOR_HIGH_COUNT_SENTINEL_C, THERMISTOR_LOW_COUNT_SENTINEL_C};
pub use timing::{FOUR_POLE_DEFAULT_SAMPLES, THERMISTOR_DEFAULT_SAMPLES, TWO_POLE_DEFAULT_SAMPLES};
