//! Time sources for the measurement core
//!
//! Delays are issued through `embedded_hal::delay::DelayNs`; this module only
//! covers *reading* time, which the core needs for two things:
//! - the thermistor ground pulse must last exactly as long as the power
//!   pulse did, including the ADC conversion time
//! - excitation runs report their duration and effective cycle frequency
//!
//! Sources:
//! - Hardware timer (implement [`Clock`] on the HAL's microsecond counter)
//! - System clock (when `std` is available)
//! - [`ManualClock`] for tests and simulation

/// Timestamp in microseconds since an arbitrary origin (monotonic)
pub type Micros = u64;

/// Monotonic microsecond counter
pub trait Clock {
    /// Current time in microseconds
    fn now_us(&mut self) -> Micros;

    /// Microseconds elapsed since `earlier`, saturating on wrap or reset
    fn elapsed_since(&mut self, earlier: Micros) -> Micros {
        self.now_us().saturating_sub(earlier)
    }
}

/// Clock that only moves when told to
///
/// Used by the test doubles: a fake delay advances it by the requested
/// duration, so measured on-times are deterministic.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Micros,
}

impl ManualClock {
    /// Clock reading `start` until moved
    pub fn new(start: Micros) -> Self {
        Self { now: start }
    }

    /// Jump to an absolute time
    pub fn set(&mut self, now: Micros) {
        self.now = now;
    }

    /// Move forward, saturating at the end of the range
    pub fn advance(&mut self, us: Micros) {
        self.now = self.now.saturating_add(us);
    }
}

impl Clock for ManualClock {
    fn now_us(&mut self) -> Micros {
        self.now
    }
}

/// System monotonic clock (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Clock whose zero is the moment of construction
    pub fn new() -> Self {
        Self { origin: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now_us(&mut self) -> Micros {
        self.origin.elapsed().as_micros() as Micros
    }
}

/// Cycle frequency in Hz for `cycles` completed in `elapsed_us`
pub fn cycle_frequency_hz(cycles: usize, elapsed_us: Micros) -> Option<f32> {
    if elapsed_us == 0 {
        return None;
    }
    Some(cycles as f32 * 1_000_000.0 / elapsed_us as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let mut clock = ManualClock::new(1000);
        assert_eq!(clock.now_us(), 1000);

        clock.advance(500);
        assert_eq!(clock.now_us(), 1500);
        assert_eq!(clock.elapsed_since(1200), 300);
    }

    #[test]
    fn elapsed_saturates_after_reset() {
        let mut clock = ManualClock::new(10);
        assert_eq!(clock.elapsed_since(50), 0);
    }

    #[test]
    fn frequency_calculation() {
        // 12 cycles in 6ms = 2 kHz
        assert_eq!(cycle_frequency_hz(12, 6000), Some(2000.0));

        // Zero elapsed time has no meaningful frequency
        assert_eq!(cycle_frequency_hz(12, 0), None);
    }
}
