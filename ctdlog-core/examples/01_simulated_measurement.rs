//! Simulated Measurement Example
//!
//! Runs the full measurement cycle against a simulated four-pole cell and
//! thermistor, then prints the datalog line the logger would append.
//!
//! ## What You'll Learn
//!
//! - Wiring an `ExcitationSequencer` from pins, ADC channels and a delay
//! - Attaching a thermistor so salinity, k25 and TDS are derived
//! - Reading per-quantity results without losing the resistance
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_simulated_measurement
//! ```

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use ctdlog_core::config::{AdcConfig, SensorConfig};
use ctdlog_core::datalog::{DatalogRecord, LogTimestamp, DATALOG_HEADER};
use ctdlog_core::excitation::{ExcitationSequencer, FourPoleChannels};
use ctdlog_core::thermistor::{Thermistor, ThermistorConfig};
use ctdlog_core::time::SystemClock;
use ctdlog_core::{AdcChannel, CalibrationModel, FourPoleSensor, MeasurementError};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

const FULL_SCALE: f32 = 4095.0;
const SENSE_OHMS: f32 = 250.0;
/// Resistance between the inner electrodes of the simulated cell
const CELL_OHMS: f32 = 24.0;
/// Outer electrode path, in series with the inner gap
const OUTER_OHMS: f32 = 60.0;

/// Which output is currently driven, shared by the pins and the ADC
#[derive(Debug, Clone, Copy, PartialEq)]
enum Drive {
    Idle,
    Forward,
    Reverse,
}

#[derive(Clone)]
struct Board {
    drive: Rc<Cell<Drive>>,
    thermistor_powered: Rc<Cell<bool>>,
    noise: Rc<Cell<u32>>,
}

impl Board {
    fn new() -> Self {
        Self {
            drive: Rc::new(Cell::new(Drive::Idle)),
            thermistor_powered: Rc::new(Cell::new(false)),
            noise: Rc::new(Cell::new(0x1234_5678)),
        }
    }

    /// A few counts of deterministic jitter
    fn jitter(&self) -> f32 {
        let x = self.noise.get().wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.noise.set(x);
        ((x >> 24) % 5) as f32 - 2.0
    }

    fn loop_current_fraction(&self) -> f32 {
        SENSE_OHMS / (SENSE_OHMS + CELL_OHMS + OUTER_OHMS)
    }

    fn count(&self, node: Node) -> u16 {
        let sense = self.loop_current_fraction() * FULL_SCALE;
        let gap = sense * CELL_OHMS / SENSE_OHMS;
        let base = 1500.0;
        let ideal = match (self.drive.get(), node) {
            (Drive::Idle, _) => 0.0,
            (Drive::Forward, Node::Current) => sense,
            (Drive::Forward, Node::Probe3) => base + gap,
            (Drive::Forward, Node::Probe4) => base,
            (Drive::Reverse, Node::Current) => FULL_SCALE - sense,
            (Drive::Reverse, Node::Probe3) => base,
            (Drive::Reverse, Node::Probe4) => base + gap,
            (_, Node::Thermistor) => 0.0,
        };
        let value = match node {
            // 10 kΩ against the 20 kΩ divider: 25 °C
            Node::Thermistor if self.thermistor_powered.get() => FULL_SCALE / 3.0,
            _ => ideal,
        };
        (value + self.jitter()).clamp(0.0, FULL_SCALE) as u16
    }
}

#[derive(Clone, Copy)]
enum Node {
    Current,
    Probe3,
    Probe4,
    Thermistor,
}

struct PolarityPin {
    board: Board,
    polarity: Drive,
}

impl ErrorType for PolarityPin {
    type Error = Infallible;
}

impl OutputPin for PolarityPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        if self.board.drive.get() == self.polarity {
            self.board.drive.set(Drive::Idle);
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.board.drive.set(self.polarity);
        Ok(())
    }
}

struct PowerPin(Board);

impl ErrorType for PowerPin {
    type Error = Infallible;
}

impl OutputPin for PowerPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.thermistor_powered.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.thermistor_powered.set(true);
        Ok(())
    }
}

struct GroundPin;

impl ErrorType for GroundPin {
    type Error = Infallible;
}

impl OutputPin for GroundPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

struct SimAdc {
    board: Board,
    node: Node,
}

impl AdcChannel for SimAdc {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u16, Infallible> {
        Ok(self.board.count(self.node))
    }
}

/// `std::thread::sleep` behind the embedded-hal delay trait
struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }
}

fn main() -> Result<(), MeasurementError> {
    println!("ctdlog simulated measurement\n");

    let board = Board::new();
    let adc = |node| SimAdc { board: board.clone(), node };

    let sequencer = ExcitationSequencer::new(
        PolarityPin { board: board.clone(), polarity: Drive::Forward },
        PolarityPin { board: board.clone(), polarity: Drive::Reverse },
        FourPoleChannels {
            current: adc(Node::Current),
            probe3: adc(Node::Probe3),
            probe4: adc(Node::Probe4),
        },
        StdDelay,
        SystemClock::new(),
        AdcConfig::twelve_bit(),
    )?;

    let thermistor = Thermistor::new(
        adc(Node::Thermistor),
        Some(PowerPin(board.clone())),
        Some(GroundPin),
        StdDelay,
        SystemClock::new(),
        ThermistorConfig::default(),
    )?;

    // Seawater-range probe: k = 1 / (0.0008 · R)
    let config = SensorConfig::four_pole_12bit(CalibrationModel::linear(0.0008, 0.0));
    let mut sensor = FourPoleSensor::new(sequencer, config)?.with_probe(thermistor);

    let m = sensor.measure_default()?;

    println!("R1          {:>10.3} Ω (faulted samples: {})", m.resistance1(), m.forward.faulted_samples);
    println!("R2          {:>10.3} Ω (faulted samples: {})", m.resistance2(), m.reverse.faulted_samples);
    if let Some(t) = m.temperature_c() {
        println!("Temperature {:>10.2} °C", t);
    }
    match m.conductivity {
        Ok(k) => println!("Conductivity{:>10.3} mS/cm", k.value),
        Err(e) => println!("Conductivity unavailable: {e}"),
    }
    for (name, value) in [("Salinity", m.salinity), ("k25", m.k25), ("TDS", m.tds)] {
        match value {
            Some(Ok(v)) => println!("{:<12}{:>10.3}", name, v),
            Some(Err(e)) => println!("{:<12}unavailable: {e}", name),
            None => println!("{:<12}no temperature", name),
        }
    }
    if let Some(us) = m.elapsed_us {
        println!("Excitation  {:>10} µs", us);
    }

    let timestamp = LogTimestamp {
        year: 2024,
        month: 7,
        day: 30,
        hour: 14,
        minute: 5,
        second: 0,
    };
    let line = DatalogRecord::from_measurement(timestamp, &m, None).format_line()?;
    println!("\n{}{}", DATALOG_HEADER, line);

    Ok(())
}
