//! Calibration Session Example
//!
//! Records a calibration file the way a technician does at the bench: one
//! trial per standard solution, each line holding the known conductivity
//! next to the measured counts and resistances.
//!
//! By default the standards are scripted and the probe is simulated. Pass
//! `--interactive` to be prompted on the terminal instead.
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_calibration_session
//! cargo run --example 02_calibration_session -- --interactive
//! ```

use std::cell::Cell;
use std::rc::Rc;

use ctdlog_core::config::{AdcConfig, ExcitationTiming, MeasureParams, SampleCount, SensorConfig};
use ctdlog_core::excitation::{ExcitationSource, PolarityBatches};
use ctdlog_core::recorder::{
    CalibrationRecorder, FixedReferences, PromptSource, RecorderError, ReferenceValueSource,
};
use ctdlog_core::{CalibrationModel, MeasurementResult, TwoPoleSensor};
use embedded_hal::delay::DelayNs;

const FULL_SCALE: f32 = 4095.0;
const SERIES_OHMS: f32 = 1000.0;
/// Cell constant of the simulated two-pole probe (1/cm)
const CELL_CONSTANT: f32 = 1.0;

/// Two-pole probe sitting in whichever standard the rig selected
struct SimulatedProbe {
    /// Conductivity of the current standard (mS/cm)
    conductivity: Rc<Cell<f32>>,
}

impl SimulatedProbe {
    fn cell_ohms(&self) -> f32 {
        1000.0 * CELL_CONSTANT / self.conductivity.get()
    }
}

impl ExcitationSource<1> for SimulatedProbe {
    fn acquire(
        &mut self,
        samples: SampleCount,
        _timing: &ExcitationTiming,
    ) -> MeasurementResult<PolarityBatches<1>> {
        let r = self.cell_ohms();
        // Divider node with the cell between the node and the driven side
        let forward = FULL_SCALE * (SERIES_OHMS + r) / (2.0 * SERIES_OHMS + r);
        let reverse = FULL_SCALE * SERIES_OHMS / (2.0 * SERIES_OHMS + r);

        let mut batches = PolarityBatches::new();
        for _ in 0..samples.get() {
            batches.forward.push([forward as u16])?;
            batches.reverse.push([reverse as u16])?;
        }
        Ok(batches)
    }

    fn adc(&self) -> AdcConfig {
        AdcConfig::twelve_bit()
    }
}

/// Scripted standards that also move the simulated probe into each one
struct Rig {
    references: FixedReferences,
    standards: Vec<f32>,
    probe: Rc<Cell<f32>>,
}

impl ReferenceValueSource for Rig {
    fn reference_value(&mut self, trial: usize) -> Result<f32, RecorderError> {
        self.references.reference_value(trial)
    }

    fn await_ready(&mut self, trial: usize) -> Result<(), RecorderError> {
        let value = self.standards.get(trial).copied().ok_or(RecorderError::Exhausted { trial })?;
        self.probe.set(value);
        println!("  trial {}: probe in {} mS/cm standard", trial + 1, value);
        Ok(())
    }

    fn reference_temperature(&mut self, trial: usize) -> Result<Option<f32>, RecorderError> {
        self.references.reference_temperature(trial)
    }
}

struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }
}

fn main() -> Result<(), RecorderError> {
    println!("ctdlog calibration session\n");

    let interactive = std::env::args().any(|a| a == "--interactive");
    let standards = vec![1.413, 12.88, 58.67];

    let current = Rc::new(Cell::new(standards[0]));
    let probe = SimulatedProbe { conductivity: current.clone() };
    let config = SensorConfig::two_pole_12bit(CalibrationModel::uncalibrated_power_law());
    let mut sensor = TwoPoleSensor::new(probe, config)?;

    let path = std::env::temp_dir().join("ctdlog_calibration.csv");
    let recorder = CalibrationRecorder::new(&path, standards.len());
    let params = MeasureParams::two_pole();

    let records = if interactive {
        let mut prompt = PromptSource::stdio().asking_temperature();
        recorder.run(&mut sensor, &params, &mut prompt, &mut StdDelay)?
    } else {
        let mut rig = Rig {
            references: FixedReferences::new(standards.clone()).at_temperature(25.0),
            standards,
            probe: current,
        };
        recorder.run(&mut sensor, &params, &mut rig, &mut StdDelay)?
    };

    println!("\n{} trials written to {}", records.len(), recorder.path().display());
    print!("{}", std::fs::read_to_string(recorder.path())?);

    Ok(())
}
