//! Conductivity sensor
//!
//! One generic component covers every probe family: timed excitation,
//! multi-channel sampling, robust reduction, calibration. What differs
//! between families is captured by two type parameters:
//!
//! - the electrode [`Topology`] (four-pole over three channels, two-pole
//!   over one), which fixes how a phase's counts become a resistance;
//! - the [`ExcitationSource`], normally an
//!   [`ExcitationSequencer`](crate::excitation::ExcitationSequencer) that
//!   owns the pins and ADC channels.
//!
//! ADC bit depth and calibration equation are runtime configuration in
//! [`SensorConfig`].
//!
//! ## Results
//!
//! [`Sensor::measure`] returns a fresh [`Measurement`]; nothing is cached
//! on the sensor. It fails only when the run itself failed (bad
//! configuration, a pin or ADC error). Derived quantities that are
//! undefined for this particular reading carry their own error, so a
//! salinity out of domain never hides a good resistance:
//!
//! ```text
//! resistance ──▶ conductivity ──▶ salinity
//!                     │   ▲
//!                     │   └── temperature (optional probe)
//!                     └─────▶ k25 ──▶ TDS
//! ```
//!
//! `measure` takes `&mut self`, so one sensor cannot be measured from two
//! places at once. Several sensors may run side by side as long as each owns
//! its own pins.

use core::marker::PhantomData;

use crate::calibration::Conductivity;
use crate::config::{MeasureParams, SampleCount, SensorConfig};
use crate::constants::timing::THERMISTOR_IN_SITU_SAMPLES;
use crate::converter::{ElectricalModel, PhaseResistance, Polarity};
use crate::errors::{MeasurementError, MeasurementResult};
use crate::excitation::{ExcitationSource, PhaseSamples, CURRENT_CHANNEL};
use crate::seawater;
use crate::thermistor::ThermistorReading;
use crate::time::Micros;
use crate::traits::{NoProbe, TemperatureProbe};

/// Electrode arrangement over `CH` sampled channels
pub trait Topology<const CH: usize> {
    /// Human-readable name for diagnostics
    const NAME: &'static str;

    /// Default sample count and timings for this probe family
    fn default_params() -> MeasureParams;

    /// Reduce one polarity phase to a resistance
    fn phase_resistance(
        model: &ElectricalModel,
        polarity: Polarity,
        phase: &PhaseSamples<CH>,
    ) -> MeasurementResult<PhaseResistance>;

    /// Resistance fed to the calibration equation
    fn cell_resistance(forward: &PhaseResistance, reverse: &PhaseResistance) -> Option<f32>;
}

/// Current-sense channel plus two inner electrodes
#[derive(Debug, Clone, Copy, Default)]
pub struct FourPole;

impl Topology<3> for FourPole {
    const NAME: &'static str = "four-pole";

    fn default_params() -> MeasureParams {
        MeasureParams::four_pole()
    }

    fn phase_resistance(
        model: &ElectricalModel,
        polarity: Polarity,
        phase: &PhaseSamples<3>,
    ) -> MeasurementResult<PhaseResistance> {
        model.four_pole_phase(polarity, phase)
    }

    /// Mean of both polarities; both must be trusted
    fn cell_resistance(forward: &PhaseResistance, reverse: &PhaseResistance) -> Option<f32> {
        Some((forward.value()? + reverse.value()?) / 2.0)
    }
}

/// Single divider node
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoPole;

impl Topology<1> for TwoPole {
    const NAME: &'static str = "two-pole";

    fn default_params() -> MeasureParams {
        MeasureParams::two_pole()
    }

    fn phase_resistance(
        model: &ElectricalModel,
        polarity: Polarity,
        phase: &PhaseSamples<1>,
    ) -> MeasurementResult<PhaseResistance> {
        model.two_pole_phase(polarity, phase)
    }

    /// The reverse-polarity resistance, as the calibrations were fitted on it
    fn cell_resistance(_forward: &PhaseResistance, reverse: &PhaseResistance) -> Option<f32> {
        reverse.value()
    }
}

/// Result of one `measure()` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement<const CH: usize> {
    /// Resistance with the forward polarity high (R1)
    pub forward: PhaseResistance,
    /// Resistance with the reverse polarity high (R2)
    pub reverse: PhaseResistance,
    /// Trimmed-mean count of every channel, forward polarity
    pub forward_counts: [f32; CH],
    /// Trimmed-mean count of every channel, reverse polarity
    pub reverse_counts: [f32; CH],
    /// Present when a temperature probe is attached
    pub temperature: Option<ThermistorReading>,
    /// Calibrated conductivity, or why it could not be computed
    pub conductivity: MeasurementResult<Conductivity>,
    /// `None` without a temperature
    pub salinity: Option<MeasurementResult<f32>>,
    /// Conductivity compensated to 25 °C
    pub k25: Option<MeasurementResult<f32>>,
    /// Total dissolved solids from k25
    pub tds: Option<MeasurementResult<f32>>,
    /// Wall time of the excitation run
    pub elapsed_us: Option<Micros>,
}

impl<const CH: usize> Measurement<CH> {
    /// Forward resistance, sentinel when untrusted (Ω)
    pub fn resistance1(&self) -> f32 {
        self.forward.ohms
    }

    /// Reverse resistance, sentinel when untrusted (Ω)
    pub fn resistance2(&self) -> f32 {
        self.reverse.ohms
    }

    /// Probe temperature (°C), suspect readings included
    pub fn temperature_c(&self) -> Option<f32> {
        self.temperature.map(|t| t.celsius)
    }

    /// Mean count on the current-sense (four-pole) or divider (two-pole) channel
    pub fn current_counts(&self) -> (f32, f32) {
        (
            self.forward_counts.get(CURRENT_CHANNEL).copied().unwrap_or(0.0),
            self.reverse_counts.get(CURRENT_CHANNEL).copied().unwrap_or(0.0),
        )
    }

    /// Forward counts followed by reverse counts, in channel order
    pub fn all_counts(&self) -> impl Iterator<Item = f32> + '_ {
        self.forward_counts.iter().chain(self.reverse_counts.iter()).copied()
    }
}

/// Conductivity probe with an optional temperature probe
pub struct Sensor<S, G, T, const CH: usize> {
    source: S,
    probe: Option<T>,
    config: SensorConfig,
    model: ElectricalModel,
    temperature_samples: SampleCount,
    _topology: PhantomData<G>,
}

/// Four-pole probe over current, probe 3 and probe 4 channels
pub type FourPoleSensor<S, T = NoProbe> = Sensor<S, FourPole, T, 3>;

/// Two-pole probe over one divider channel
pub type TwoPoleSensor<S, T = NoProbe> = Sensor<S, TwoPole, T, 1>;

impl<S, G, const CH: usize> Sensor<S, G, NoProbe, CH>
where
    S: ExcitationSource<CH>,
    G: Topology<CH>,
{
    /// Validate `config` against `source` and take ownership of both
    pub fn new(source: S, config: SensorConfig) -> MeasurementResult<Self> {
        config.validate()?;
        if source.adc().full_scale() != config.adc.full_scale() {
            return Err(MeasurementError::InvalidConfig {
                reason: "excitation source resolution differs from sensor ADC config",
            });
        }
        let model = ElectricalModel::from_config(&config)?;
        let temperature_samples = SampleCount::new(THERMISTOR_IN_SITU_SAMPLES)?;
        Ok(Self {
            source,
            probe: None,
            config,
            model,
            temperature_samples,
            _topology: PhantomData,
        })
    }
}

impl<S, G, T, const CH: usize> Sensor<S, G, T, CH>
where
    S: ExcitationSource<CH>,
    G: Topology<CH>,
    T: TemperatureProbe,
{
    /// Attach a temperature probe, read after every excitation run
    pub fn with_probe<P: TemperatureProbe>(self, probe: P) -> Sensor<S, G, P, CH> {
        Sensor {
            source: self.source,
            probe: Some(probe),
            config: self.config,
            model: self.model,
            temperature_samples: self.temperature_samples,
            _topology: PhantomData,
        }
    }

    /// Samples per temperature reading (400 unless changed)
    pub fn with_temperature_samples(mut self, samples: SampleCount) -> Self {
        self.temperature_samples = samples;
        self
    }

    /// Configuration the sensor was validated with
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Defaults for this probe family
    pub fn default_params(&self) -> MeasureParams {
        G::default_params()
    }

    /// Hand back the excitation source and probe
    pub fn release(self) -> (S, Option<T>) {
        (self.source, self.probe)
    }

    /// Run one full measurement cycle
    pub fn measure(&mut self, params: &MeasureParams) -> MeasurementResult<Measurement<CH>> {
        let batches = self.source.acquire(params.samples, &params.timing)?;

        let forward = G::phase_resistance(&self.model, Polarity::Forward, &batches.forward)?;
        let reverse = G::phase_resistance(&self.model, Polarity::Reverse, &batches.reverse)?;
        let forward_counts = batches.forward.mean_counts()?;
        let reverse_counts = batches.reverse.mean_counts()?;

        let temperature = match self.probe.as_mut() {
            Some(probe) => Some(probe.read_temperature(self.temperature_samples)?),
            None => None,
        };

        let conductivity = G::cell_resistance(&forward, &reverse)
            .ok_or(MeasurementError::domain("conductivity", "cell resistance untrusted"))
            .and_then(|ohms| self.config.calibration.conductivity(ohms));

        // A reading dominated by rail sentinels is reported but never compensated with
        let samples = self.temperature_samples;
        let celsius = temperature.map(|t| {
            if t.is_suspect(samples) {
                diag_warn!("{} temperature out of range, skipping derived quantities", G::NAME);
                Err(MeasurementError::domain("temperature", "thermistor reading out of range"))
            } else {
                Ok(t.celsius)
            }
        });
        let salinity = celsius.map(|t| {
            t.and_then(|t| conductivity.and_then(|k| seawater::salinity(t, k.value)))
        });
        let k25 = celsius.map(|t| t.and_then(|t| conductivity.and_then(|k| seawater::k25(k.value, t))));
        let tds = k25.map(|k25| k25.map(seawater::total_dissolved_solids));

        if let Some(Err(err)) = salinity {
            diag_debug!("{} salinity unavailable: {}", G::NAME, err);
        }

        Ok(Measurement {
            forward,
            reverse,
            forward_counts,
            reverse_counts,
            temperature,
            conductivity,
            salinity,
            k25,
            tds,
            elapsed_us: batches.elapsed_us,
        })
    }

    /// Measure with this family's default parameters
    pub fn measure_default(&mut self) -> MeasurementResult<Measurement<CH>> {
        self.measure(&G::default_params())
    }
}
