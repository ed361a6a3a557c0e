//! Error Types for the Measurement Core
//!
//! ## Design Philosophy
//!
//! The measurement core runs between sleep cycles on a battery-powered logger,
//! so errors follow the same rules as the rest of the hot path:
//!
//! 1. **No Heap Allocation**: context is carried as `&'static str` and plain
//!    numbers, never `String`.
//!
//! 2. **Copy Semantics**: errors are small and `Copy`, so they can be stored in
//!    a [`Measurement`](crate::sensor::Measurement) next to the values that
//!    did compute successfully.
//!
//! 3. **Actionable Severity**: every error maps to a [`Severity`] telling the
//!    logging loop whether to retry on the next wake-up or abort the campaign.
//!
//! ## Error Categories
//!
//! ### Configuration (fatal, raised before any pin is toggled)
//! - `InvalidSampleCount`: zero samples, or more than the sample buffers hold
//! - `EmptyTrimWindow`: the quartile trim would average zero elements
//! - `InvalidConfig`: bad ADC bit depth, non-positive resistor, etc.
//!
//! ### Peripheral (transient)
//! - `Peripheral`: a pin or ADC driver reported an error
//!
//! ### Calibration math
//! - `DomainViolation`: the formula is undefined for the input, e.g. the
//!   salinity term `k^-1.07 - 7.464e-4` is not positive
//!
//! Per-sample conversion faults (zero current, saturated ADC) are **not**
//! errors: they are substituted with a sentinel and counted, see
//! [`converter`](crate::converter).
//!
//! ```rust
//! use ctdlog_core::{MeasurementError, Severity};
//!
//! fn on_failure(err: MeasurementError) {
//!     match err.severity() {
//!         Severity::Transient => { /* log and try again next interval */ }
//!         Severity::Fatal => { /* stop the campaign, configuration is wrong */ }
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for measurement operations
pub type MeasurementResult<T> = Result<T, MeasurementError>;

/// How the caller should react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Retry upstream; the next measurement may succeed
    Transient,
    /// Abort; retrying with the same configuration or input cannot succeed
    Fatal,
}

/// Measurement errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum MeasurementError {
    /// Sample count is zero or exceeds the fixed buffer capacity
    #[error("Invalid sample count {requested} (must be 1..={max})")]
    InvalidSampleCount {
        /// Number of samples requested by the caller
        requested: usize,
        /// Largest sample count the buffers can hold
        max: usize,
    },

    /// Quartile trimming would leave nothing to average
    #[error("Trim window for {samples} samples is empty")]
    EmptyTrimWindow {
        /// Length of the sequence that was to be reduced
        samples: usize,
    },

    /// Sensor or ADC configuration is unusable
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Which setting is wrong
        reason: &'static str,
    },

    /// A pin or ADC driver returned an error
    #[error("Peripheral failure: {device}")]
    Peripheral {
        /// Pin or channel that failed
        device: &'static str,
    },

    /// Calibration formula is undefined for the given input
    #[error("Domain violation computing {quantity}: {reason}")]
    DomainViolation {
        /// Quantity being computed (e.g. "salinity")
        quantity: &'static str,
        /// Why the input is out of range
        reason: &'static str,
    },
}

impl MeasurementError {
    /// Classify the error for the logging loop
    pub fn severity(&self) -> Severity {
        match self {
            Self::Peripheral { .. } => Severity::Transient,
            Self::InvalidSampleCount { .. }
            | Self::EmptyTrimWindow { .. }
            | Self::InvalidConfig { .. }
            | Self::DomainViolation { .. } => Severity::Fatal,
        }
    }

    /// True for errors raised while validating configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidSampleCount { .. } | Self::EmptyTrimWindow { .. } | Self::InvalidConfig { .. }
        )
    }

    pub(crate) const fn domain(quantity: &'static str, reason: &'static str) -> Self {
        Self::DomainViolation { quantity, reason }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MeasurementError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InvalidSampleCount { requested, max } =>
                defmt::write!(fmt, "Sample count {} outside 1..={}", requested, max),
            Self::EmptyTrimWindow { samples } =>
                defmt::write!(fmt, "Empty trim window for {} samples", samples),
            Self::InvalidConfig { reason } =>
                defmt::write!(fmt, "Invalid config: {}", reason),
            Self::Peripheral { device } =>
                defmt::write!(fmt, "Peripheral failure: {}", device),
            Self::DomainViolation { quantity, reason } =>
                defmt::write!(fmt, "Domain violation ({}): {}", quantity, reason),
        }
    }
}
