//! Thermistor Model Constants
//!
//! The probes carry a Littelfuse PS103J2 10 kΩ NTC thermistor read through a
//! fixed-resistor voltage divider.

/// Steinhart-Hart coefficient A for the PS103J2.
pub const PS103J2_A: f32 = 0.001125308852122;

/// Steinhart-Hart coefficient B for the PS103J2.
pub const PS103J2_B: f32 = 0.000234711863267;

/// Steinhart-Hart coefficient C for the PS103J2.
pub const PS103J2_C: f32 = 0.000000085663516;

/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f32 = 273.15;

/// Fixed divider resistor on the logger boards (Ω).
pub const DEFAULT_DIVIDER_RESISTANCE_OHMS: f32 = 20_000.0;

/// Settle time between powering the divider and sampling it (µs).
pub const THERMISTOR_SETTLE_US: u32 = 1000;

/// Settle time after forcing the power/ground pins low before a run (µs).
pub const THERMISTOR_PREPARE_US: u32 = 1000;

/// Reported for a sample whose count sits at full scale (°C).
///
/// The divider output at the rail means the thermistor resistance is
/// unbounded, i.e. below the usable range.
pub const THERMISTOR_HIGH_COUNT_SENTINEL_C: f32 = -55.0;

/// Reported for a sample whose count is zero (°C).
///
/// Zero resistance, i.e. above the usable range.
pub const THERMISTOR_LOW_COUNT_SENTINEL_C: f32 = 150.0;
