//! Quartile-trimmed mean
//!
//! Every raw and derived sample array in a measurement collapses to one
//! scalar through the same reduction: sort, drop the lowest and highest
//! quarter, average the middle half.
//!
//! ```text
//! n = 12, sorted:  1  2  3 | 4  5  6  7  8  9 | 10 11 12
//!                  ^^^^^^^   ^^^^^^^^^^^^^^^^   ^^^^^^^^
//!                  dropped   averaged = 6.5     dropped
//!
//! lower = floor(n/4) = 3, upper = ceil(3n/4) = 9, window = [3, 9)
//! ```
//!
//! Switching transients show up as isolated large excursions, which this
//! rejects without the tuning a median filter or sigma-clip would need.
//!
//! The converter relies on this for its fault policy: a faulted sample is
//! replaced by a large negative sentinel, which sorts into the dropped lower
//! quarter as long as no more than `lower` samples faulted. See
//! [`PhaseResistance`](crate::converter::PhaseResistance).

use core::cmp::Ordering;

use heapless::Vec;

use crate::constants::adc::MAX_SAMPLES;
use crate::errors::{MeasurementError, MeasurementResult};

/// Index range kept by the quartile trim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimWindow {
    /// First kept index, `floor(n/4)`
    pub lower: usize,
    /// One past the last kept index, `ceil(3n/4)`
    pub upper: usize,
}

impl TrimWindow {
    /// Window for a sequence of `n` samples
    ///
    /// Fails when the window would be empty, which only happens for `n == 0`;
    /// the check stays explicit so the mean can never divide by zero.
    pub fn for_len(n: usize) -> MeasurementResult<Self> {
        let lower = n / 4;
        let upper = (3 * n + 3) / 4;
        if upper <= lower {
            return Err(MeasurementError::EmptyTrimWindow { samples: n });
        }
        Ok(Self { lower, upper })
    }

    /// Number of samples averaged
    pub fn len(&self) -> usize {
        self.upper - self.lower
    }

    /// True when nothing survives the trim
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of samples dropped from each end (bottom, top)
    pub fn dropped(&self, n: usize) -> (usize, usize) {
        (self.lower, n.saturating_sub(self.upper))
    }
}

/// Sample types the reducer can sort and average
pub trait TrimSample: Copy {
    /// Total order used for sorting
    fn total_order(&self, other: &Self) -> Ordering;

    /// Widen for accumulation
    fn to_f64(self) -> f64;
}

impl TrimSample for u16 {
    fn total_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl TrimSample for f32 {
    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Sort `samples` in place and return the mean of the middle half
pub fn trimmed_mean_in_place<T: TrimSample>(samples: &mut [T]) -> MeasurementResult<f32> {
    let window = TrimWindow::for_len(samples.len())?;
    samples.sort_unstable_by(T::total_order);

    let sum: f64 = samples[window.lower..window.upper]
        .iter()
        .map(|s| s.to_f64())
        .sum();
    Ok((sum / window.len() as f64) as f32)
}

/// Mean of the middle half of `samples`, leaving the input untouched
///
/// Copies into a fixed-capacity buffer, so at most
/// [`MAX_SAMPLES`](crate::constants::MAX_SAMPLES) samples are accepted.
pub fn trimmed_mean<T: TrimSample>(samples: &[T]) -> MeasurementResult<f32> {
    let mut scratch: Vec<T, MAX_SAMPLES> = Vec::from_slice(samples).map_err(|_| {
        MeasurementError::InvalidSampleCount {
            requested: samples.len(),
            max: MAX_SAMPLES,
        }
    })?;
    trimmed_mean_in_place(&mut scratch)
}
