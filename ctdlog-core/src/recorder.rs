//! Calibration session recorder (requires `std`)
//!
//! Pairs a known reference conductivity with one full measurement and
//! appends the result to a CSV file, one line per trial:
//!
//! ```text
//! EC_from_standard,Count1,Computed R1,Count2,Computed R2,Temperature\r\n
//! 1413,2048,12.207031,2047,12.207031,24.96\r\n
//! ```
//!
//! The file is opened, appended and closed for every record, so a crash
//! mid-session loses at most the trial in progress.
//!
//! Reference values come from a [`ReferenceValueSource`]: an operator at a
//! terminal ([`PromptSource`]) or a scripted list for unattended rigs
//! ([`FixedReferences`]).

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use embedded_hal::delay::DelayNs;
use thiserror_no_std::Error;

use crate::config::MeasureParams;
use crate::constants::timing::CALIBRATION_TRIAL_PAUSE_MS;
use crate::datalog::MISSING_VALUE;
use crate::errors::MeasurementError;
use crate::excitation::ExcitationSource;
use crate::sensor::{Sensor, Topology};
use crate::traits::TemperatureProbe;

/// Header line of a calibration file
pub const CALIBRATION_HEADER: &str =
    "EC_from_standard,Count1,Computed R1,Count2,Computed R2,Temperature\r\n";

/// Errors raised during a calibration session
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Calibration file could not be written, or the prompt stream failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operator typed something that is not a number
    #[error("Not a number: {input:?}")]
    InvalidInput {
        /// The rejected line, trimmed
        input: String,
    },

    /// Input stream ended before the session finished
    #[error("Input closed")]
    InputClosed,

    /// Reference source has no value for this trial
    #[error("No reference value for trial {trial}")]
    Exhausted {
        /// Zero-based trial index
        trial: usize,
    },

    /// The measurement itself failed
    #[error("Measurement failed: {0}")]
    Measurement(#[from] MeasurementError),
}

/// Supplies the known value of the standard used in each trial
pub trait ReferenceValueSource {
    /// Conductivity of the standard solution
    fn reference_value(&mut self, trial: usize) -> Result<f32, RecorderError>;

    /// Block until the probe is in the solution
    fn await_ready(&mut self, trial: usize) -> Result<(), RecorderError>;

    /// Temperature of the standard, if known (°C)
    fn reference_temperature(&mut self, _trial: usize) -> Result<Option<f32>, RecorderError> {
        Ok(None)
    }
}

/// Interactive source reading from a terminal
pub struct PromptSource<R, W> {
    input: R,
    output: W,
    ask_temperature: bool,
}

impl PromptSource<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on stdout, read from stdin
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptSource<R, W> {
    /// Prompts on `output`, reads answers line by line from `input`
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            ask_temperature: false,
        }
    }

    /// Also ask for the temperature of each standard
    pub fn asking_temperature(mut self) -> Self {
        self.ask_temperature = true;
        self
    }

    fn ask(&mut self, prompt: &str) -> Result<String, RecorderError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(RecorderError::InputClosed);
        }
        Ok(line.trim().to_owned())
    }

    fn ask_number(&mut self, prompt: &str) -> Result<f32, RecorderError> {
        let answer = self.ask(prompt)?;
        answer
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(RecorderError::InvalidInput { input: answer })
    }
}

impl<R: BufRead, W: Write> ReferenceValueSource for PromptSource<R, W> {
    fn reference_value(&mut self, _trial: usize) -> Result<f32, RecorderError> {
        self.ask_number("Enter conductivity for standard calibration fluid: ")
    }

    fn await_ready(&mut self, _trial: usize) -> Result<(), RecorderError> {
        self.ask("Now place probe in fluid and press enter when ready")?;
        Ok(())
    }

    fn reference_temperature(&mut self, _trial: usize) -> Result<Option<f32>, RecorderError> {
        if !self.ask_temperature {
            return Ok(None);
        }
        self.ask_number("Enter temperature of standard calibration fluid: ").map(Some)
    }
}

/// Scripted references for an automated rig
#[derive(Debug, Clone, Default)]
pub struct FixedReferences {
    values: Vec<f32>,
    temperature: Option<f32>,
}

impl FixedReferences {
    /// One reference value per trial, in order
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, temperature: None }
    }

    /// Bath temperature reported for every trial
    pub fn at_temperature(mut self, celsius: f32) -> Self {
        self.temperature = Some(celsius);
        self
    }
}

impl ReferenceValueSource for FixedReferences {
    fn reference_value(&mut self, trial: usize) -> Result<f32, RecorderError> {
        self.values
            .get(trial)
            .copied()
            .ok_or(RecorderError::Exhausted { trial })
    }

    fn await_ready(&mut self, _trial: usize) -> Result<(), RecorderError> {
        Ok(())
    }

    fn reference_temperature(&mut self, _trial: usize) -> Result<Option<f32>, RecorderError> {
        Ok(self.temperature)
    }
}

/// One line of a calibration file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationRecord {
    /// Known conductivity of the standard
    pub reference: f32,
    /// Mean forward count on the current-sense or divider channel
    pub count1: f32,
    /// Forward resistance (Ω)
    pub r1: f32,
    /// Mean reverse count on the current-sense or divider channel
    pub count2: f32,
    /// Reverse resistance (Ω)
    pub r2: f32,
    /// Measured temperature, else the bath temperature if one was given
    pub temperature_c: Option<f32>,
}

impl CalibrationRecord {
    /// CRLF-terminated CSV line
    pub fn to_csv_line(&self) -> String {
        let temperature = match self.temperature_c {
            Some(t) => t.to_string(),
            None => MISSING_VALUE.to_string(),
        };
        format!(
            "{},{},{},{},{},{}\r\n",
            self.reference, self.count1, self.r1, self.count2, self.r2, temperature
        )
    }
}

/// Writes a calibration session to one file
#[derive(Debug, Clone)]
pub struct CalibrationRecorder {
    path: PathBuf,
    trials: usize,
    pause_ms: u32,
}

impl CalibrationRecorder {
    /// Session of `trials` standards written to `path`
    pub fn new(path: impl AsRef<Path>, trials: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            trials,
            pause_ms: CALIBRATION_TRIAL_PAUSE_MS,
        }
    }

    /// Pause between trials (500 ms unless changed)
    pub fn pause_between_trials(mut self, pause_ms: u32) -> Self {
        self.pause_ms = pause_ms;
        self
    }

    /// Output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create or truncate the file and write the header
    pub fn start(&self) -> Result<(), RecorderError> {
        let mut file = File::create(&self.path)?;
        file.write_all(CALIBRATION_HEADER.as_bytes())?;
        Ok(())
    }

    /// Append one record, opening and closing the file
    pub fn append(&self, record: &CalibrationRecord) -> Result<(), RecorderError> {
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        file.write_all(record.to_csv_line().as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Ask for the reference, measure once and append the record
    pub fn record_trial<S, G, T, V, const CH: usize>(
        &self,
        sensor: &mut Sensor<S, G, T, CH>,
        params: &MeasureParams,
        source: &mut V,
        trial: usize,
    ) -> Result<CalibrationRecord, RecorderError>
    where
        S: ExcitationSource<CH>,
        G: Topology<CH>,
        T: TemperatureProbe,
        V: ReferenceValueSource + ?Sized,
    {
        let reference = source.reference_value(trial)?;
        let reference_temperature = source.reference_temperature(trial)?;
        source.await_ready(trial)?;

        let measurement = sensor.measure(params)?;
        let (count1, count2) = measurement.current_counts();
        let record = CalibrationRecord {
            reference,
            count1,
            r1: measurement.resistance1(),
            count2,
            r2: measurement.resistance2(),
            temperature_c: measurement.temperature_c().or(reference_temperature),
        };

        self.append(&record)?;
        log::info!(
            "calibration trial {}: reference {} R1 {} R2 {}",
            trial + 1,
            record.reference,
            record.r1,
            record.r2
        );
        Ok(record)
    }

    /// Run the whole session: header, then every trial with a pause in between
    pub fn run<S, G, T, V, D, const CH: usize>(
        &self,
        sensor: &mut Sensor<S, G, T, CH>,
        params: &MeasureParams,
        source: &mut V,
        delay: &mut D,
    ) -> Result<Vec<CalibrationRecord>, RecorderError>
    where
        S: ExcitationSource<CH>,
        G: Topology<CH>,
        T: TemperatureProbe,
        V: ReferenceValueSource + ?Sized,
        D: DelayNs,
    {
        self.start()?;
        let mut records = Vec::with_capacity(self.trials);
        for trial in 0..self.trials {
            records.push(self.record_trial(sensor, params, source, trial)?);
            delay.delay_ms(self.pause_ms);
        }
        Ok(records)
    }
}
