//! Excitation Timing and Sample Count Defaults

/// Samples per polarity for a four-pole conductivity measurement.
pub const FOUR_POLE_DEFAULT_SAMPLES: usize = 12;

/// Polarity on/off durations for the four-pole cell (µs).
///
/// The four-pole boards sample immediately after switching.
pub const FOUR_POLE_DEFAULT_PHASE_US: u32 = 0;

/// Samples per polarity for a two-pole conductivity measurement.
pub const TWO_POLE_DEFAULT_SAMPLES: usize = 100;

/// Polarity on/off durations for the two-pole cell (µs).
pub const TWO_POLE_DEFAULT_PHASE_US: u32 = 100;

/// Samples for a standalone thermistor reading.
pub const THERMISTOR_DEFAULT_SAMPLES: usize = 100;

/// Samples for the thermistor reading taken inside a conductivity measurement.
pub const THERMISTOR_IN_SITU_SAMPLES: usize = 400;

/// Pause between calibration trials (ms).
pub const CALIBRATION_TRIAL_PAUSE_MS: u32 = 500;
