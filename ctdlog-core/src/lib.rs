//! Measurement core for the ctdlog conductivity/temperature datalogger
//!
//! Drives the electrodes, samples the ADC and turns raw counts into
//! resistance, temperature, conductivity and salinity.
//! Designed for battery-powered loggers that wake, measure and sleep.
//!
//! Key constraints:
//! - No heap allocation on the measurement path (fixed `heapless` buffers)
//! - Microsecond excitation timing, fully synchronous
//! - Hardware only through `embedded-hal` traits, so the same code runs on
//!   the board and against test doubles
//!
//! Pipeline:
//!
//! ```text
//! ExcitationSequencer ──▶ ElectricalModel ──▶ trimmed mean ──▶ CalibrationModel
//!  (pins + ADC, n cycles)  (per-sample R)      (per phase)      (k, S, k25, TDS)
//!
//! Thermistor: sample ──▶ Steinhart–Hart ──▶ trimmed mean
//! ```
//!
//! ```no_run
//! use ctdlog_core::{CalibrationModel, FourPoleSensor, SensorConfig};
//! # use ctdlog_core::excitation::{ExcitationSource, PolarityBatches};
//! # use ctdlog_core::config::{AdcConfig, ExcitationTiming, SampleCount};
//! # struct Board;
//! # impl ExcitationSource<3> for Board {
//! #     fn acquire(&mut self, _: SampleCount, _: &ExcitationTiming)
//! #         -> ctdlog_core::MeasurementResult<PolarityBatches<3>> { unimplemented!() }
//! #     fn adc(&self) -> AdcConfig { AdcConfig::twelve_bit() }
//! # }
//! # let board = Board;
//!
//! let config = SensorConfig::four_pole_12bit(CalibrationModel::linear(0.95, 12.0));
//! let mut sensor = FourPoleSensor::new(board, config)?;
//!
//! let m = sensor.measure_default()?;
//! match m.conductivity {
//!     Ok(k) => {}   // log it
//!     Err(e) => {}  // resistance untrusted or outside the calibration
//! }
//! # Ok::<(), ctdlog_core::MeasurementError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod calibration;
pub mod config;
pub mod constants;
pub mod converter;
pub mod datalog;
pub mod errors;
pub mod excitation;
pub mod reducer;
pub mod seawater;
pub mod sensor;
pub mod thermistor;
pub mod time;
pub mod traits;

#[cfg(feature = "std")]
pub mod recorder;

// Public API
pub use calibration::{CalibrationModel, Conductivity};
pub use config::{AdcConfig, ExcitationTiming, MeasureParams, SampleCount, SensorConfig};
pub use converter::{PhaseResistance, INVALID_RESISTANCE_OHMS};
pub use errors::{MeasurementError, MeasurementResult, Severity};
pub use excitation::{ExcitationSequencer, ExcitationSource, FourPoleChannels, SingleChannel};
pub use reducer::{trimmed_mean, TrimWindow};
pub use sensor::{FourPole, FourPoleSensor, Measurement, Sensor, TwoPole, TwoPoleSensor};
pub use thermistor::{Thermistor, ThermistorConfig, ThermistorReading};
pub use time::Clock;
pub use traits::{AdcChannel, NoPin, NoProbe, TemperatureProbe};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
