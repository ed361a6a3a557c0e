//! ADC Resolution and Reference Values
//!
//! The logger boards read the electrodes through the microcontroller's
//! on-chip successive-approximation ADC.

/// Resolution of the on-chip converters on both supported boards (bits).
///
/// Source: STM32F405 and RP2040 reference manuals
pub const ADC_BITS_12: u8 = 12;

/// Largest count a 12-bit converter can return.
///
/// Counts lie in `[0, ADC_FULL_SCALE_12BIT]`; a reading at either end of the
/// range means the input is clipped.
pub const ADC_FULL_SCALE_12BIT: u16 = 4095;

/// Native width of `read_u16`-style ADC APIs that left-justify the result (bits).
///
/// A 12-bit reading obtained through such an API is right-shifted by 4.
pub const ADC_BITS_16: u8 = 16;

/// ADC reference and pin drive voltage (V).
///
/// The excitation pins switch between ground and the 3.3 V rail, which is
/// also the ADC reference, so one value is used for both.
pub const DEFAULT_V_REF: f32 = 3.3;

/// Capacity of the fixed-size sample buffers (samples per channel per phase).
///
/// Large enough for the 400-sample in-situ thermistor reading. A four-pole
/// acquisition at full capacity uses `512 * 2 bytes * 3 channels * 2 phases`
/// = 6 KB of stack.
pub const MAX_SAMPLES: usize = 512;

/// Current-sense resistor fitted on the four-pole boards (Ω).
pub const FOUR_POLE_SENSE_RESISTANCE_OHMS: f32 = 250.0;

/// Series resistor fitted on the two-pole boards (Ω).
pub const TWO_POLE_SERIES_RESISTANCE_OHMS: f32 = 1000.0;
