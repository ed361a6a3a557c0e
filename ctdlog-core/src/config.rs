//! Sensor configuration
//!
//! Everything a sensor instance needs besides its pins: ADC bit depth and
//! reference, sense resistor value, calibration coefficients, and the
//! per-call sample count and excitation timings.
//!
//! Configuration is validated once, at construction, so a bad value fails
//! before any electrode is driven:
//!
//! ```rust
//! use ctdlog_core::config::{AdcConfig, MeasureParams, SampleCount, SensorConfig};
//! use ctdlog_core::calibration::CalibrationModel;
//!
//! let config = SensorConfig::four_pole_12bit(CalibrationModel::linear(0.95, 12.0));
//! assert!(config.validate().is_ok());
//!
//! // Zero samples is refused outright
//! assert!(SampleCount::new(0).is_err());
//!
//! let params = MeasureParams::four_pole();
//! assert_eq!(params.samples.get(), 12);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationModel;
use crate::constants::adc::{
    ADC_BITS_12, ADC_BITS_16, DEFAULT_V_REF, FOUR_POLE_SENSE_RESISTANCE_OHMS, MAX_SAMPLES,
    TWO_POLE_SERIES_RESISTANCE_OHMS,
};
use crate::constants::timing::{
    FOUR_POLE_DEFAULT_PHASE_US, FOUR_POLE_DEFAULT_SAMPLES, TWO_POLE_DEFAULT_PHASE_US,
    TWO_POLE_DEFAULT_SAMPLES,
};
use crate::errors::{MeasurementError, MeasurementResult};
use crate::reducer::TrimWindow;
use crate::traits::Validatable;

/// ADC resolution and reference
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdcConfig {
    /// Effective resolution of the converter (bits)
    pub resolution_bits: u8,
    /// Width of the word returned by the driver (bits); larger than
    /// `resolution_bits` when the driver left-justifies the result
    pub native_bits: u8,
    /// Reference voltage, also the excitation drive voltage (V)
    pub v_ref: f32,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self::twelve_bit()
    }
}

impl AdcConfig {
    /// 12-bit converter read as a right-justified 12-bit word
    pub const fn twelve_bit() -> Self {
        Self {
            resolution_bits: ADC_BITS_12,
            native_bits: ADC_BITS_12,
            v_ref: DEFAULT_V_REF,
        }
    }

    /// 12-bit converter read through a `read_u16`-style API
    pub const fn twelve_bit_left_justified() -> Self {
        Self {
            resolution_bits: ADC_BITS_12,
            native_bits: ADC_BITS_16,
            v_ref: DEFAULT_V_REF,
        }
    }

    /// Largest count after normalization (`2^bits - 1`)
    pub fn full_scale(&self) -> u16 {
        ((1u32 << self.resolution_bits.min(16)) - 1) as u16
    }

    /// Shift a raw driver word down to the effective resolution
    ///
    /// Returns the count and whether it had to be clamped to full scale. A
    /// clamped word means the driver returned more bits than configured.
    pub fn normalize(&self, raw: u16) -> (u16, bool) {
        let shift = self.native_bits.saturating_sub(self.resolution_bits).min(15);
        let count = raw >> shift;
        let full_scale = self.full_scale();
        if count > full_scale {
            (full_scale, true)
        } else {
            (count, false)
        }
    }

    /// Check bit depths and reference voltage
    pub fn validate(&self) -> MeasurementResult<()> {
        if self.resolution_bits == 0 || self.resolution_bits > 16 {
            return Err(MeasurementError::InvalidConfig {
                reason: "ADC resolution must be 1..=16 bits",
            });
        }
        if self.native_bits < self.resolution_bits || self.native_bits > 16 {
            return Err(MeasurementError::InvalidConfig {
                reason: "ADC native width must be resolution..=16 bits",
            });
        }
        if !self.v_ref.is_valid() || self.v_ref <= 0.0 {
            return Err(MeasurementError::InvalidConfig {
                reason: "ADC reference voltage must be positive",
            });
        }
        Ok(())
    }
}

/// Polarity on/off durations for one excitation cycle (µs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExcitationTiming {
    /// Forward polarity held high before sampling
    pub on1_us: u32,
    /// Both outputs low after the forward phase
    pub off1_us: u32,
    /// Reverse polarity held high before sampling
    pub on2_us: u32,
    /// Both outputs low after the reverse phase
    pub off2_us: u32,
}

impl ExcitationTiming {
    /// Same duration for every interval
    pub const fn uniform(us: u32) -> Self {
        Self {
            on1_us: us,
            off1_us: us,
            on2_us: us,
            off2_us: us,
        }
    }

    /// Nominal duration of one full cycle, excluding ADC conversion time
    pub fn cycle_us(&self) -> u64 {
        self.on1_us as u64 + self.off1_us as u64 + self.on2_us as u64 + self.off2_us as u64
    }
}

/// Number of samples per channel per polarity
///
/// Always in `1..=MAX_SAMPLES` with a non-empty trim window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleCount(usize);

impl SampleCount {
    /// Validate a sample count
    pub fn new(n: usize) -> MeasurementResult<Self> {
        if n == 0 || n > MAX_SAMPLES {
            return Err(MeasurementError::InvalidSampleCount {
                requested: n,
                max: MAX_SAMPLES,
            });
        }
        TrimWindow::for_len(n)?;
        Ok(Self(n))
    }

    /// Number of samples per channel and polarity
    pub fn get(&self) -> usize {
        self.0
    }

    /// Trim window for this many samples
    pub fn trim_window(&self) -> TrimWindow {
        // Non-empty by construction
        TrimWindow::for_len(self.0).unwrap_or(TrimWindow { lower: 0, upper: self.0 })
    }
}

impl TryFrom<usize> for SampleCount {
    type Error = MeasurementError;

    fn try_from(n: usize) -> MeasurementResult<Self> {
        Self::new(n)
    }
}

/// Arguments of one `measure()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureParams {
    /// Samples per channel and polarity
    pub samples: SampleCount,
    /// On/off intervals of the excitation cycle
    pub timing: ExcitationTiming,
}

impl MeasureParams {
    /// Validate and bundle a sample count with timings
    pub fn new(samples: usize, timing: ExcitationTiming) -> MeasurementResult<Self> {
        Ok(Self {
            samples: SampleCount::new(samples)?,
            timing,
        })
    }

    /// Four-pole defaults: 12 samples, switch and sample immediately
    pub fn four_pole() -> Self {
        Self {
            samples: SampleCount(FOUR_POLE_DEFAULT_SAMPLES),
            timing: ExcitationTiming::uniform(FOUR_POLE_DEFAULT_PHASE_US),
        }
    }

    /// Two-pole defaults: 100 samples, 100 µs per interval
    pub fn two_pole() -> Self {
        Self {
            samples: SampleCount(TWO_POLE_DEFAULT_SAMPLES),
            timing: ExcitationTiming::uniform(TWO_POLE_DEFAULT_PHASE_US),
        }
    }
}

/// Static description of one conductivity probe
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorConfig {
    /// Converter the cell is read through
    pub adc: AdcConfig,
    /// Current-sense (four-pole) or series (two-pole) resistor (Ω)
    pub sense_resistance_ohms: f32,
    /// Resistance to conductivity model
    pub calibration: CalibrationModel,
}

impl SensorConfig {
    /// Four-pole board with a 12-bit right-justified ADC
    pub fn four_pole_12bit(calibration: CalibrationModel) -> Self {
        Self {
            adc: AdcConfig::twelve_bit(),
            sense_resistance_ohms: FOUR_POLE_SENSE_RESISTANCE_OHMS,
            calibration,
        }
    }

    /// Four-pole board whose ADC driver left-justifies to 16 bits
    pub fn four_pole_16bit_native(calibration: CalibrationModel) -> Self {
        Self {
            adc: AdcConfig::twelve_bit_left_justified(),
            sense_resistance_ohms: FOUR_POLE_SENSE_RESISTANCE_OHMS,
            calibration,
        }
    }

    /// Two-pole board with a 12-bit right-justified ADC
    pub fn two_pole_12bit(calibration: CalibrationModel) -> Self {
        Self {
            adc: AdcConfig::twelve_bit(),
            sense_resistance_ohms: TWO_POLE_SERIES_RESISTANCE_OHMS,
            calibration,
        }
    }

    /// Check every field
    pub fn validate(&self) -> MeasurementResult<()> {
        self.adc.validate()?;
        if !self.sense_resistance_ohms.is_valid() || self.sense_resistance_ohms <= 0.0 {
            return Err(MeasurementError::InvalidConfig {
                reason: "sense resistance must be positive",
            });
        }
        self.calibration.validate()
    }
}
