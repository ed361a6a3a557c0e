//! Electrical-to-physical conversion
//!
//! Turns raw counts into current, voltage and resistance, one sample at a
//! time, then reduces each polarity to a single resistance.
//!
//! ## Four-pole cell
//!
//! ```text
//!   forward pin ──[cell: e1 ─ e3 ─ e4 ─ e2]──●── R_sense ── reverse pin
//!                            │    │          │
//!                          probe3 probe4   current
//! ```
//!
//! With `c` the current-sense count, `p3`/`p4` the inner electrode counts,
//! `FS` full scale and `V` the reference:
//!
//! | Polarity | Current | Voltage |
//! |----------|---------|---------|
//! | forward  | `c/FS · V / R_sense` | `(p3 − p4)/FS · V` |
//! | reverse  | `(V − c/FS · V) / R_sense` | `(p4 − p3)/FS · V` |
//!
//! and `R = voltage / current`. In reverse the sense resistor hangs from the
//! driven rail, so the current is set by the drop from `V` instead of the
//! rise from ground.
//!
//! ## Two-pole cell
//!
//! A plain divider between the cell and a series resistor `R`, read at one
//! node. Reduced counts convert as
//! `r1 = R·(2·c1/FS − 1)/(1 − c1/FS)` (forward) and `r2 = R·(FS/c2 − 2)`
//! (reverse). These are a different circuit from the four-pole sense
//! resistor and are kept separate.
//!
//! ## Faulted samples
//!
//! A sample whose current is zero, whose counts sit on either rail, or whose
//! quotient is not finite has no meaningful resistance. It is replaced with
//! [`INVALID_RESISTANCE_OHMS`] and counted. The sentinel is far below any
//! real resistance, so it sorts into the quarter the reducer drops: up to
//! `floor(n/4)` faults per phase leave the trimmed mean untouched.
//!
//! This is a tradeoff. Beyond that budget the sentinel would leak into the
//! average, so the phase is marked untrusted, its resistance is replaced
//! with the sentinel, and calibration is skipped for it.

use crate::config::{AdcConfig, SensorConfig};
use crate::constants::adc::MAX_SAMPLES;
use crate::errors::{MeasurementError, MeasurementResult};
use crate::excitation::{PhaseSamples, CURRENT_CHANNEL, PROBE3_CHANNEL, PROBE4_CHANNEL};
use crate::reducer::{trimmed_mean, trimmed_mean_in_place, TrimWindow};
use crate::traits::Validatable;

/// Resistance substituted for a faulted sample or an untrusted phase (Ω)
pub const INVALID_RESISTANCE_OHMS: f32 = -999_999.0;

/// Which polarity output was high when the sample was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// First output high, current flows forward through the cell
    Forward,
    /// Second output high
    Reverse,
}

impl Polarity {
    /// Lower-case name used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
        }
    }
}

/// Why a sample has no resistance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFault {
    /// Current computes to exactly zero
    ZeroCurrent,
    /// A count sits on the 0 or full-scale rail
    Saturated,
    /// The quotient is NaN or infinite
    NonFinite,
}

/// Current, voltage and resistance of one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedSample {
    /// Loop current through the sense resistor (A)
    pub current_amps: f32,
    /// Potential between the inner electrodes (V)
    pub voltage: f32,
    /// `voltage / current_amps` (Ω)
    pub resistance_ohms: f32,
}

/// Reduced resistance of one polarity phase
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseResistance {
    /// Trimmed-mean resistance, or [`INVALID_RESISTANCE_OHMS`] when untrusted
    pub ohms: f32,
    /// Samples replaced with the sentinel
    pub faulted_samples: usize,
    /// True when the faults all fell into the trimmed-away quarter
    pub trusted: bool,
}

impl PhaseResistance {
    /// The resistance, if it can be used
    pub fn value(&self) -> Option<f32> {
        self.trusted.then_some(self.ohms)
    }

    fn untrusted(faulted_samples: usize) -> Self {
        Self {
            ohms: INVALID_RESISTANCE_OHMS,
            faulted_samples,
            trusted: false,
        }
    }
}

/// Scale factors shared by every conversion on one probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectricalModel {
    full_scale: u16,
    v_ref: f32,
    sense_resistance_ohms: f32,
}

impl ElectricalModel {
    /// Fails when the ADC is invalid or the resistor is not positive
    pub fn new(adc: &AdcConfig, sense_resistance_ohms: f32) -> MeasurementResult<Self> {
        adc.validate()?;
        if !sense_resistance_ohms.is_valid() || sense_resistance_ohms <= 0.0 {
            return Err(MeasurementError::InvalidConfig {
                reason: "sense resistance must be positive",
            });
        }
        Ok(Self {
            full_scale: adc.full_scale(),
            v_ref: adc.v_ref,
            sense_resistance_ohms,
        })
    }

    /// Model for a probe's stored configuration
    pub fn from_config(config: &SensorConfig) -> MeasurementResult<Self> {
        Self::new(&config.adc, config.sense_resistance_ohms)
    }

    /// Largest count after resolution scaling
    pub fn full_scale(&self) -> u16 {
        self.full_scale
    }

    fn volts(&self, count: f32) -> f32 {
        count / self.full_scale as f32 * self.v_ref
    }

    fn on_rail(&self, count: u16) -> bool {
        count == 0 || count >= self.full_scale
    }

    /// Current through the cell (A)
    pub fn current_amps(&self, polarity: Polarity, current_count: u16) -> f32 {
        let sense = self.volts(current_count as f32);
        match polarity {
            Polarity::Forward => sense / self.sense_resistance_ohms,
            Polarity::Reverse => (self.v_ref - sense) / self.sense_resistance_ohms,
        }
    }

    /// Voltage across the inner electrodes, signed so a healthy cell is positive (V)
    pub fn electrode_voltage(&self, polarity: Polarity, probe3: u16, probe4: u16) -> f32 {
        let difference = match polarity {
            Polarity::Forward => probe3 as f32 - probe4 as f32,
            Polarity::Reverse => probe4 as f32 - probe3 as f32,
        };
        self.volts(difference)
    }

    /// Convert one four-pole sample
    pub fn four_pole_sample(
        &self,
        polarity: Polarity,
        current_count: u16,
        probe3: u16,
        probe4: u16,
    ) -> Result<DerivedSample, SampleFault> {
        let current_amps = self.current_amps(polarity, current_count);
        if current_amps == 0.0 {
            return Err(SampleFault::ZeroCurrent);
        }
        if self.on_rail(current_count) || self.on_rail(probe3) || self.on_rail(probe4) {
            return Err(SampleFault::Saturated);
        }

        let voltage = self.electrode_voltage(polarity, probe3, probe4);
        let resistance_ohms = voltage / current_amps;
        if !resistance_ohms.is_valid() {
            return Err(SampleFault::NonFinite);
        }
        Ok(DerivedSample {
            current_amps,
            voltage,
            resistance_ohms,
        })
    }

    /// Reduce one four-pole polarity phase to a resistance
    pub fn four_pole_phase(
        &self,
        polarity: Polarity,
        phase: &PhaseSamples<3>,
    ) -> MeasurementResult<PhaseResistance> {
        let current = phase.channel(CURRENT_CHANNEL);
        let probe3 = phase.channel(PROBE3_CHANNEL);
        let probe4 = phase.channel(PROBE4_CHANNEL);

        let mut resistances: heapless::Vec<f32, MAX_SAMPLES> = heapless::Vec::new();
        let mut faulted = 0;
        for ((&c, &p3), &p4) in current.iter().zip(probe3).zip(probe4) {
            let ohms = match self.four_pole_sample(polarity, c, p3, p4) {
                Ok(sample) => sample.resistance_ohms,
                Err(_) => {
                    faulted += 1;
                    INVALID_RESISTANCE_OHMS
                }
            };
            // Capacity matches the batches this was read from
            let _ = resistances.push(ohms);
        }

        let window = TrimWindow::for_len(resistances.len())?;
        if faulted > 0 {
            diag_warn!(
                "{} polarity: {} of {} samples faulted (budget {})",
                polarity.label(),
                faulted,
                resistances.len(),
                window.lower
            );
        }
        if faulted > window.lower {
            diag_warn!("{} polarity resistance untrusted", polarity.label());
            return Ok(PhaseResistance::untrusted(faulted));
        }

        let ohms = trimmed_mean_in_place(&mut resistances)?;
        Ok(PhaseResistance {
            ohms,
            faulted_samples: faulted,
            trusted: true,
        })
    }

    /// Two-pole forward resistance from the reduced divider count
    ///
    /// `None` on either rail, or below half scale where the divider would
    /// imply a negative cell.
    pub fn two_pole_forward(&self, mean_count: f32) -> Option<f32> {
        let ratio = mean_count / self.full_scale as f32;
        if !ratio.is_valid() || ratio <= 0.0 || ratio >= 1.0 {
            return None;
        }
        let ohms = self.sense_resistance_ohms * (2.0 * ratio - 1.0) / (1.0 - ratio);
        (ohms.is_valid() && ohms >= 0.0).then_some(ohms)
    }

    /// Two-pole reverse resistance from the reduced divider count
    ///
    /// `None` on either rail, or above half scale.
    pub fn two_pole_reverse(&self, mean_count: f32) -> Option<f32> {
        if !mean_count.is_valid() || mean_count <= 0.0 || mean_count >= self.full_scale as f32 {
            return None;
        }
        let ohms = self.sense_resistance_ohms * (self.full_scale as f32 / mean_count - 2.0);
        (ohms.is_valid() && ohms >= 0.0).then_some(ohms)
    }

    /// Reduce one two-pole polarity phase to a resistance
    ///
    /// Counts are reduced first and converted once, so a sample on either
    /// rail is harmless unless it survives the trim.
    pub fn two_pole_phase(
        &self,
        polarity: Polarity,
        phase: &PhaseSamples<1>,
    ) -> MeasurementResult<PhaseResistance> {
        let counts = phase.channel(0);
        let window = TrimWindow::for_len(counts.len())?;
        let faulted = counts.iter().filter(|&&c| self.on_rail(c)).count();

        if faulted > 0 {
            diag_warn!(
                "{} polarity: {} of {} samples on the rail (budget {})",
                polarity.label(),
                faulted,
                counts.len(),
                window.lower
            );
        }

        let mean = trimmed_mean(counts)?;
        let ohms = match polarity {
            Polarity::Forward => self.two_pole_forward(mean),
            Polarity::Reverse => self.two_pole_reverse(mean),
        };
        match ohms {
            Some(ohms) if faulted <= window.lower => Ok(PhaseResistance {
                ohms,
                faulted_samples: faulted,
                trusted: true,
            }),
            _ => {
                diag_warn!("{} polarity resistance untrusted", polarity.label());
                Ok(PhaseResistance::untrusted(faulted))
            }
        }
    }
}
