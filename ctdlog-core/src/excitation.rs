//! Alternating-polarity excitation and synchronized sampling
//!
//! ## Why alternate polarity?
//!
//! A DC current through an electrolyte polarizes the electrodes: ions pile up
//! at the surfaces and the apparent resistance drifts upward for as long as
//! the bias is held. Driving the cell with a square wave whose two halves
//! carry opposite currents keeps the net charge near zero.
//!
//! ## Cycle
//!
//! ```text
//!            on1   off1    on2   off2
//! forward  ▁▁█████▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁
//! reverse  ▁▁▁▁▁▁▁▁▁▁▁▁▁▁█████▁▁▁▁▁▁▁▁▁▁▁▁
//!                ^              ^
//!           sample fwd     sample rev
//! ```
//!
//! Each phase samples every channel of the [`ChannelSet`] once: the
//! current-sense node and both inner electrodes on a four-pole cell, the
//! single divider node on a two-pole cell.
//!
//! ## Invariants
//!
//! - At most one polarity output is high at any instant; each phase drives
//!   its output low before the other is raised.
//! - Both outputs are low after construction, after every completed
//!   acquisition, and after an acquisition aborted by a driver error.
//! - The run is fully synchronous. Timing depends on nothing but the
//!   injected delay, so it must run with interrupts that could stretch the
//!   `on` intervals kept short; the resistance math assumes each sample is
//!   taken at steady state.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use heapless::Vec;

use crate::config::{AdcConfig, ExcitationTiming, SampleCount};
use crate::constants::adc::MAX_SAMPLES;
use crate::errors::{MeasurementError, MeasurementResult};
use crate::reducer::trimmed_mean;
use crate::time::{cycle_frequency_hz, Clock, Micros};
use crate::traits::{drive, read_blocking, AdcChannel};

/// Raw counts for one channel in one polarity phase
pub type SampleBatch = Vec<u16, MAX_SAMPLES>;

/// Index of the current-sense channel in a four-pole acquisition
pub const CURRENT_CHANNEL: usize = 0;
/// Index of inner electrode 3 (farthest from the sense resistor)
pub const PROBE3_CHANNEL: usize = 1;
/// Index of inner electrode 4 (closest to the sense resistor)
pub const PROBE4_CHANNEL: usize = 2;

/// Raw counts for every channel in one polarity phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSamples<const CH: usize> {
    channels: [SampleBatch; CH],
}

impl<const CH: usize> Default for PhaseSamples<CH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CH: usize> PhaseSamples<CH> {
    /// Empty batches for every channel
    pub fn new() -> Self {
        Self {
            channels: core::array::from_fn(|_| SampleBatch::new()),
        }
    }

    /// Build from per-channel batches, which must all have the same length
    pub fn from_batches(channels: [&[u16]; CH]) -> MeasurementResult<Self> {
        let mut phase = Self::new();
        let len = channels.first().map_or(0, |c| c.len());
        for (batch, counts) in phase.channels.iter_mut().zip(channels.iter()) {
            if counts.len() != len {
                return Err(MeasurementError::InvalidConfig {
                    reason: "channel batches differ in length",
                });
            }
            *batch = SampleBatch::from_slice(counts).map_err(|_| {
                MeasurementError::InvalidSampleCount {
                    requested: counts.len(),
                    max: MAX_SAMPLES,
                }
            })?;
        }
        Ok(phase)
    }

    /// Append one simultaneous reading of every channel
    pub fn push(&mut self, counts: [u16; CH]) -> MeasurementResult<()> {
        for (batch, count) in self.channels.iter_mut().zip(counts) {
            batch.push(count).map_err(|_| MeasurementError::InvalidSampleCount {
                requested: MAX_SAMPLES + 1,
                max: MAX_SAMPLES,
            })?;
        }
        Ok(())
    }

    /// Counts collected on `channel`
    pub fn channel(&self, channel: usize) -> &[u16] {
        match self.channels.get(channel) {
            Some(batch) => batch.as_slice(),
            None => &[],
        }
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, |b| b.len())
    }

    /// True before the first sample is pushed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Quartile-trimmed mean count of every channel
    pub fn mean_counts(&self) -> MeasurementResult<[f32; CH]> {
        let mut means = [0.0; CH];
        for (mean, batch) in means.iter_mut().zip(self.channels.iter()) {
            *mean = trimmed_mean(batch.as_slice())?;
        }
        Ok(means)
    }
}

/// Raw counts from one acquisition, both polarities
#[derive(Debug, Clone, PartialEq)]
pub struct PolarityBatches<const CH: usize> {
    /// Forward polarity (first output high)
    pub forward: PhaseSamples<CH>,
    /// Reverse polarity (second output high)
    pub reverse: PhaseSamples<CH>,
    /// Wall time of the excitation run, when a clock is available
    pub elapsed_us: Option<Micros>,
}

impl<const CH: usize> PolarityBatches<CH> {
    /// Empty forward and reverse phases
    pub fn new() -> Self {
        Self {
            forward: PhaseSamples::new(),
            reverse: PhaseSamples::new(),
            elapsed_us: None,
        }
    }
}

impl<const CH: usize> Default for PolarityBatches<CH> {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything that can run `n` excitation cycles and hand back raw counts
///
/// Implemented by [`ExcitationSequencer`] for real pins; tests and
/// simulations implement it directly with fixed batches.
pub trait ExcitationSource<const CH: usize> {
    /// Run `samples` cycles with the given timings
    fn acquire(
        &mut self,
        samples: SampleCount,
        timing: &ExcitationTiming,
    ) -> MeasurementResult<PolarityBatches<CH>>;

    /// Resolution the returned counts are expressed in
    fn adc(&self) -> AdcConfig;
}

impl<const CH: usize, S: ExcitationSource<CH> + ?Sized> ExcitationSource<CH> for &mut S {
    fn acquire(
        &mut self,
        samples: SampleCount,
        timing: &ExcitationTiming,
    ) -> MeasurementResult<PolarityBatches<CH>> {
        (**self).acquire(samples, timing)
    }

    fn adc(&self) -> AdcConfig {
        (**self).adc()
    }
}

/// ADC channels sampled together in each phase
pub trait ChannelSet<const CH: usize> {
    /// Read every channel once, returning raw driver words
    fn sample(&mut self) -> MeasurementResult<[u16; CH]>;
}

/// Two-pole cell: one divider node
#[derive(Debug)]
pub struct SingleChannel<A> {
    /// Divider node between the series resistor and the cell
    pub adc: A,
}

impl<A: AdcChannel> ChannelSet<1> for SingleChannel<A> {
    fn sample(&mut self) -> MeasurementResult<[u16; 1]> {
        Ok([read_blocking(&mut self.adc, "conductivity adc")?])
    }
}

/// Four-pole cell: current-sense node plus both inner electrodes
///
/// Read in the order current, probe 3, probe 4, as close together as the
/// converter allows.
#[derive(Debug)]
pub struct FourPoleChannels<I, P3, P4> {
    /// Current-sense resistor node
    pub current: I,
    /// Inner electrode nearest the forward drive
    pub probe3: P3,
    /// Other inner electrode
    pub probe4: P4,
}

impl<I, P3, P4> ChannelSet<3> for FourPoleChannels<I, P3, P4>
where
    I: AdcChannel,
    P3: AdcChannel,
    P4: AdcChannel,
{
    fn sample(&mut self) -> MeasurementResult<[u16; 3]> {
        let current = read_blocking(&mut self.current, "current-sense adc")?;
        let probe3 = read_blocking(&mut self.probe3, "probe 3 adc")?;
        let probe4 = read_blocking(&mut self.probe4, "probe 4 adc")?;
        Ok([current, probe3, probe4])
    }
}

/// Drives the two polarity outputs and samples a [`ChannelSet`] in each phase
///
/// Owns its pins and ADC channels; no other sensor can toggle them. The
/// constructor drives both outputs low.
pub struct ExcitationSequencer<A, B, C, D, K> {
    forward: A,
    reverse: B,
    channels: C,
    delay: D,
    clock: K,
    adc: AdcConfig,
}

impl<A, B, C, D, K> ExcitationSequencer<A, B, C, D, K>
where
    A: OutputPin,
    B: OutputPin,
    D: DelayNs,
    K: Clock,
{
    /// Take ownership of the hardware and park both outputs low
    pub fn new(
        forward: A,
        reverse: B,
        channels: C,
        delay: D,
        clock: K,
        adc: AdcConfig,
    ) -> MeasurementResult<Self> {
        adc.validate()?;
        let mut sequencer = Self {
            forward,
            reverse,
            channels,
            delay,
            clock,
            adc,
        };
        drive(&mut sequencer.forward, false, "forward polarity pin")?;
        drive(&mut sequencer.reverse, false, "reverse polarity pin")?;
        Ok(sequencer)
    }

    /// Hand the hardware back, both outputs low
    pub fn release(mut self) -> (A, B, C, D, K) {
        self.park();
        (self.forward, self.reverse, self.channels, self.delay, self.clock)
    }

    /// Best-effort return to the idle state after an aborted run
    fn park(&mut self) {
        let _ = self.forward.set_low();
        let _ = self.reverse.set_low();
    }

    fn run<const CH: usize>(
        &mut self,
        samples: SampleCount,
        timing: &ExcitationTiming,
    ) -> MeasurementResult<PolarityBatches<CH>>
    where
        C: ChannelSet<CH>,
    {
        let mut batches = PolarityBatches::new();
        let start = self.clock.now_us();

        for _ in 0..samples.get() {
            drive(&mut self.forward, true, "forward polarity pin")?;
            self.delay.delay_us(timing.on1_us);
            let counts = self.read_phase()?;
            batches.forward.push(counts)?;
            drive(&mut self.forward, false, "forward polarity pin")?;
            self.delay.delay_us(timing.off1_us);

            drive(&mut self.reverse, true, "reverse polarity pin")?;
            self.delay.delay_us(timing.on2_us);
            let counts = self.read_phase()?;
            batches.reverse.push(counts)?;
            drive(&mut self.reverse, false, "reverse polarity pin")?;
            self.delay.delay_us(timing.off2_us);
        }

        let elapsed = self.clock.elapsed_since(start);
        if elapsed > 0 {
            batches.elapsed_us = Some(elapsed);
            if let Some(hz) = cycle_frequency_hz(samples.get(), elapsed) {
                diag_debug!("excitation: {} cycles in {} us ({} Hz)", samples.get(), elapsed, hz);
            }
        }
        Ok(batches)
    }

    fn read_phase<const CH: usize>(&mut self) -> MeasurementResult<[u16; CH]>
    where
        C: ChannelSet<CH>,
    {
        let mut counts = self.channels.sample()?;
        for count in counts.iter_mut() {
            let (normalized, clamped) = self.adc.normalize(*count);
            if clamped {
                diag_warn!("adc word {} above full scale, clamped to {}", *count, normalized);
            }
            *count = normalized;
        }
        Ok(counts)
    }
}

impl<const CH: usize, A, B, C, D, K> ExcitationSource<CH> for ExcitationSequencer<A, B, C, D, K>
where
    A: OutputPin,
    B: OutputPin,
    C: ChannelSet<CH>,
    D: DelayNs,
    K: Clock,
{
    fn acquire(
        &mut self,
        samples: SampleCount,
        timing: &ExcitationTiming,
    ) -> MeasurementResult<PolarityBatches<CH>> {
        let result = self.run(samples, timing);
        if result.is_err() {
            self.park();
        }
        result
    }

    fn adc(&self) -> AdcConfig {
        self.adc
    }
}
