//! Thermistor temperature reader
//!
//! A self-contained sample → convert → reduce pipeline for one NTC
//! thermistor in a voltage divider with a fixed resistor:
//!
//! ```text
//!   power pin ── R_fixed ──●── thermistor ── ground pin
//!                          │
//!                         ADC
//! ```
//!
//! ## Sequence
//!
//! 1. Drive power and ground low, 1 ms settle each.
//! 2. For every sample: power high, settle, read, power low. The on-time is
//!    measured with the [`Clock`] and the ground pin is then held high for
//!    the same duration, so the net charge pushed into anything wired in
//!    parallel (the conductivity electrodes share the cable) is zero.
//! 3. Power low.
//!
//! Either pin may be absent when the divider is hard-wired to the rail or
//! to ground; pass `None::<NoPin>`.
//!
//! ## Conversion
//!
//! `R_t = (c/FS · R_fixed) / (1 − c/FS)` then Steinhart–Hart
//! `T = 1/(A + B·ln R_t + C·(ln R_t)³) − 273.15`. Counts at full scale
//! (open thermistor, very cold) report −55 °C and counts at zero (shorted,
//! very hot) report 150 °C. Those sentinels sit far enough from real water
//! temperatures that a handful of them trim away; the count is returned in
//! [`ThermistorReading::out_of_range_samples`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{AdcConfig, SampleCount};
use crate::constants::adc::MAX_SAMPLES;
use crate::constants::thermistor::{
    DEFAULT_DIVIDER_RESISTANCE_OHMS, KELVIN_OFFSET, PS103J2_A, PS103J2_B, PS103J2_C,
    THERMISTOR_HIGH_COUNT_SENTINEL_C, THERMISTOR_LOW_COUNT_SENTINEL_C, THERMISTOR_PREPARE_US,
    THERMISTOR_SETTLE_US,
};
use crate::constants::timing::THERMISTOR_DEFAULT_SAMPLES;
use crate::errors::{MeasurementError, MeasurementResult};
use crate::reducer::{trimmed_mean_in_place, TrimWindow};
use crate::time::Clock;
use crate::traits::{drive, read_blocking, AdcChannel, TemperatureProbe, Validatable};

/// Steinhart–Hart coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SteinhartHart {
    /// Constant term
    pub a: f32,
    /// Coefficient of ln R
    pub b: f32,
    /// Coefficient of (ln R)³
    pub c: f32,
}

impl SteinhartHart {
    /// Littelfuse PS103J2, 10 kΩ at 25 °C
    pub const PS103J2: Self = Self {
        a: PS103J2_A,
        b: PS103J2_B,
        c: PS103J2_C,
    };

    /// Temperature (°C) for a thermistor resistance (Ω)
    pub fn temperature_c(&self, resistance_ohms: f32) -> f32 {
        let ln_r = libm::logf(resistance_ohms);
        1.0 / (self.a + self.b * ln_r + self.c * ln_r * ln_r * ln_r) - KELVIN_OFFSET
    }
}

impl Default for SteinhartHart {
    fn default() -> Self {
        Self::PS103J2
    }
}

/// Divider and timing parameters for one thermistor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThermistorConfig {
    /// Converter on the divider node
    pub adc: AdcConfig,
    /// Fixed resistor between the power pin and the ADC node (Ω)
    pub divider_resistance_ohms: f32,
    /// Curve of the fitted thermistor
    pub coefficients: SteinhartHart,
    /// Power-on time before each read (µs)
    pub settle_us: u32,
}

impl Default for ThermistorConfig {
    fn default() -> Self {
        Self {
            adc: AdcConfig::twelve_bit(),
            divider_resistance_ohms: DEFAULT_DIVIDER_RESISTANCE_OHMS,
            coefficients: SteinhartHart::PS103J2,
            settle_us: THERMISTOR_SETTLE_US,
        }
    }
}

impl ThermistorConfig {
    /// Rejects an invalid ADC or a non-positive divider resistor
    pub fn validate(&self) -> MeasurementResult<()> {
        self.adc.validate()?;
        if !self.divider_resistance_ohms.is_valid() || self.divider_resistance_ohms <= 0.0 {
            return Err(MeasurementError::InvalidConfig {
                reason: "divider resistance must be positive",
            });
        }
        let SteinhartHart { a, b, c } = self.coefficients;
        if !(a.is_valid() && b.is_valid() && c.is_valid()) {
            return Err(MeasurementError::InvalidConfig {
                reason: "Steinhart-Hart coefficients must be finite",
            });
        }
        Ok(())
    }

    /// Temperature for one normalized count, and whether it is a sentinel
    pub fn count_to_temperature(&self, count: u16) -> (f32, bool) {
        let full_scale = self.adc.full_scale();
        if count >= full_scale {
            return (THERMISTOR_HIGH_COUNT_SENTINEL_C, true);
        }
        if count == 0 {
            return (THERMISTOR_LOW_COUNT_SENTINEL_C, true);
        }
        let ratio = count as f32 / full_scale as f32;
        let resistance = ratio * self.divider_resistance_ohms / (1.0 - ratio);
        (self.coefficients.temperature_c(resistance), false)
    }
}

/// Reduced thermistor temperature
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThermistorReading {
    /// Trimmed-mean temperature (°C)
    pub celsius: f32,
    /// Samples that hit a rail and were replaced by a sentinel
    pub out_of_range_samples: usize,
}

impl ThermistorReading {
    /// True when the out-of-range samples could have reached the mean
    pub fn is_suspect(&self, samples: SampleCount) -> bool {
        self.out_of_range_samples > samples.trim_window().lower
    }
}

/// Thermistor divider with optional switched power and ground
pub struct Thermistor<A, P, G, D, K> {
    adc: A,
    power: Option<P>,
    ground: Option<G>,
    delay: D,
    clock: K,
    config: ThermistorConfig,
}

impl<A, P, G, D, K> Thermistor<A, P, G, D, K>
where
    A: AdcChannel,
    P: OutputPin,
    G: OutputPin,
    D: DelayNs,
    K: Clock,
{
    /// `power` and `ground` are `None` for a hard-wired divider
    pub fn new(
        adc: A,
        power: Option<P>,
        ground: Option<G>,
        delay: D,
        clock: K,
        config: ThermistorConfig,
    ) -> MeasurementResult<Self> {
        config.validate()?;
        Ok(Self {
            adc,
            power,
            ground,
            delay,
            clock,
            config,
        })
    }

    /// Divider and timing parameters in use
    pub fn config(&self) -> &ThermistorConfig {
        &self.config
    }

    /// Hand the hardware back
    pub fn release(self) -> (A, Option<P>, Option<G>, D, K) {
        (self.adc, self.power, self.ground, self.delay, self.clock)
    }

    /// Standalone reading with the default sample count
    pub fn read_default(&mut self) -> MeasurementResult<ThermistorReading> {
        let samples = SampleCount::new(THERMISTOR_DEFAULT_SAMPLES)?;
        self.read(samples)
    }

    /// Take `samples` readings and reduce them
    pub fn read(&mut self, samples: SampleCount) -> MeasurementResult<ThermistorReading> {
        let result = self.sample_all(samples);
        if result.is_err() {
            if let Some(pin) = self.power.as_mut() {
                let _ = pin.set_low();
            }
            if let Some(pin) = self.ground.as_mut() {
                let _ = pin.set_low();
            }
        }
        result
    }

    fn sample_all(&mut self, samples: SampleCount) -> MeasurementResult<ThermistorReading> {
        let window = TrimWindow::for_len(samples.get())?;

        if let Some(pin) = self.power.as_mut() {
            drive(pin, false, "thermistor power pin")?;
        }
        self.delay.delay_us(THERMISTOR_PREPARE_US);
        if let Some(pin) = self.ground.as_mut() {
            drive(pin, false, "thermistor ground pin")?;
        }
        self.delay.delay_us(THERMISTOR_PREPARE_US);

        let mut temperatures: heapless::Vec<f32, MAX_SAMPLES> = heapless::Vec::new();
        let mut out_of_range = 0;
        for _ in 0..samples.get() {
            let count = self.sample_once()?;
            let (celsius, sentinel) = self.config.count_to_temperature(count);
            if sentinel {
                out_of_range += 1;
            }
            // SampleCount never exceeds the capacity
            let _ = temperatures.push(celsius);
        }

        if let Some(pin) = self.power.as_mut() {
            drive(pin, false, "thermistor power pin")?;
        }

        if out_of_range > 0 {
            diag_warn!(
                "thermistor: {} of {} samples out of range (budget {})",
                out_of_range,
                samples.get(),
                window.lower
            );
        }

        let celsius = trimmed_mean_in_place(&mut temperatures)?;
        Ok(ThermistorReading {
            celsius,
            out_of_range_samples: out_of_range,
        })
    }

    /// One powered read followed by the balancing ground pulse
    fn sample_once(&mut self) -> MeasurementResult<u16> {
        let raw = match self.power.as_mut() {
            Some(power) => {
                drive(power, true, "thermistor power pin")?;
                let on = self.clock.now_us();
                self.delay.delay_us(self.config.settle_us);
                let raw = read_blocking(&mut self.adc, "thermistor adc")?;
                drive(power, false, "thermistor power pin")?;
                let on_time = self.clock.elapsed_since(on);

                if let Some(ground) = self.ground.as_mut() {
                    drive(ground, true, "thermistor ground pin")?;
                    self.delay.delay_us(u32::try_from(on_time).unwrap_or(u32::MAX));
                    drive(ground, false, "thermistor ground pin")?;
                }
                raw
            }
            None => {
                self.delay.delay_us(self.config.settle_us);
                read_blocking(&mut self.adc, "thermistor adc")?
            }
        };

        let (count, clamped) = self.config.adc.normalize(raw);
        if clamped {
            diag_warn!("thermistor adc word {} above full scale", raw);
        }
        Ok(count)
    }
}

impl<A, P, G, D, K> TemperatureProbe for Thermistor<A, P, G, D, K>
where
    A: AdcChannel,
    P: OutputPin,
    G: OutputPin,
    D: DelayNs,
    K: Clock,
{
    fn read_temperature(&mut self, samples: SampleCount) -> MeasurementResult<ThermistorReading> {
        self.read(samples)
    }
}
