//! Datalog line format
//!
//! The logging loop appends one line per wake-up:
//!
//! ```text
//! 2024/7/30,14:5:0,12.21,12.21,18.42,2048.00,2148.00,2048.00,2047.00,2048.00,2148.00,1013.3\r\n
//! └─ date ─┘└time┘ └R1┘  └R2┘  └ T ┘ └──── mean counts, forward then reverse ─────┘ └ P ┘
//! ```
//!
//! Date and time fields are not zero-padded. Any value the logger could not
//! obtain is written as `-999` so the column count never changes.
//!
//! Lines are built without allocation into a [`DatalogLine`].

use core::fmt::Write;

use heapless::String;

use crate::errors::{MeasurementError, MeasurementResult};
use crate::sensor::Measurement;
use crate::traits::Validatable;

/// Marker written for a missing value
pub const MISSING_VALUE: i32 = -999;

/// Capacity of one formatted line (bytes)
pub const DATALOG_LINE_CAPACITY: usize = 256;

/// One formatted, CRLF-terminated line
pub type DatalogLine = String<DATALOG_LINE_CAPACITY>;

/// Column names, CRLF-terminated
pub const DATALOG_HEADER: &str = "YY/MM/DD,Hour:Min:Sec,R1,R2,Temperature,\
Count1,Probe3Count1,Probe4Count1,Count2,Probe3Count2,Probe4Count2,Pressure\r\n";

/// Wall-clock time from the logger's RTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogTimestamp {
    /// Four-digit year
    pub year: u16,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    /// 0-23
    pub hour: u8,
    /// 0-59
    pub minute: u8,
    /// 0-59
    pub second: u8,
}

/// Values written for one logging interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatalogRecord {
    /// When the interval was logged
    pub timestamp: LogTimestamp,
    /// Forward resistance (Ω)
    pub r1: Option<f32>,
    /// Reverse resistance (Ω)
    pub r2: Option<f32>,
    /// Thermistor temperature (°C)
    pub temperature_c: Option<f32>,
    /// Forward current, probe 3, probe 4, then the same in reverse
    pub counts: [Option<f32>; 6],
    /// Absolute pressure from an external sensor (mbar)
    pub pressure_mbar: Option<f32>,
}

impl DatalogRecord {
    /// Record for an interval where the conductivity measurement failed
    pub fn missing(timestamp: LogTimestamp, pressure_mbar: Option<f32>) -> Self {
        Self {
            timestamp,
            r1: None,
            r2: None,
            temperature_c: None,
            counts: [None; 6],
            pressure_mbar,
        }
    }

    /// Record from a completed measurement
    ///
    /// Untrusted resistances are written as missing. A two-pole measurement
    /// fills the first count of each polarity and leaves the rest missing.
    pub fn from_measurement<const CH: usize>(
        timestamp: LogTimestamp,
        measurement: &Measurement<CH>,
        pressure_mbar: Option<f32>,
    ) -> Self {
        let mut counts = [None; 6];
        for (slot, &count) in counts[..3].iter_mut().zip(measurement.forward_counts.iter()) {
            *slot = Some(count);
        }
        for (slot, &count) in counts[3..].iter_mut().zip(measurement.reverse_counts.iter()) {
            *slot = Some(count);
        }

        Self {
            timestamp,
            r1: measurement.forward.value(),
            r2: measurement.reverse.value(),
            temperature_c: measurement.temperature_c(),
            counts,
            pressure_mbar,
        }
    }

    /// Format as one CRLF-terminated line
    pub fn format_line(&self) -> MeasurementResult<DatalogLine> {
        let mut line = DatalogLine::new();
        self.write_to(&mut line)
            .map_err(|_| MeasurementError::domain("datalog line", "exceeds line buffer"))?;
        Ok(line)
    }

    fn write_to(&self, out: &mut impl Write) -> core::fmt::Result {
        let t = &self.timestamp;
        write!(out, "{}/{}/{},{}:{}:{},", t.year, t.month, t.day, t.hour, t.minute, t.second)?;
        write_field(out, self.r1, 2)?;
        out.write_char(',')?;
        write_field(out, self.r2, 2)?;
        out.write_char(',')?;
        write_field(out, self.temperature_c, 2)?;
        for count in self.counts {
            out.write_char(',')?;
            write_field(out, count, 2)?;
        }
        out.write_char(',')?;
        write_field(out, self.pressure_mbar, 1)?;
        out.write_str("\r\n")
    }
}

fn write_field(out: &mut impl Write, value: Option<f32>, decimals: usize) -> core::fmt::Result {
    match value {
        Some(v) if v.is_valid() => write!(out, "{:.*}", decimals, v),
        _ => write!(out, "{}", MISSING_VALUE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp() -> LogTimestamp {
        LogTimestamp {
            year: 2024,
            month: 7,
            day: 30,
            hour: 14,
            minute: 5,
            second: 0,
        }
    }

    #[test]
    fn complete_record() {
        let record = DatalogRecord {
            timestamp: timestamp(),
            r1: Some(12.207),
            r2: Some(12.2),
            temperature_c: Some(18.421),
            counts: [Some(2048.0), Some(2148.0), Some(2048.0), Some(2047.0), Some(2048.0), Some(2148.0)],
            pressure_mbar: Some(1013.3),
        };
        assert_eq!(
            record.format_line().unwrap().as_str(),
            "2024/7/30,14:5:0,12.21,12.20,18.42,2048.00,2148.00,2048.00,2047.00,2048.00,2148.00,1013.3\r\n"
        );
    }

    #[test]
    fn missing_values_keep_columns() {
        let line = DatalogRecord::missing(timestamp(), None).format_line().unwrap();
        assert_eq!(
            line.as_str(),
            "2024/7/30,14:5:0,-999,-999,-999,-999,-999,-999,-999,-999,-999,-999\r\n"
        );
        assert_eq!(line.split(',').count(), DATALOG_HEADER.split(',').count());
    }

    #[test]
    fn non_finite_written_as_missing() {
        let mut record = DatalogRecord::missing(timestamp(), Some(f32::NAN));
        record.r1 = Some(f32::INFINITY);
        let line = record.format_line().unwrap();
        assert!(line.starts_with("2024/7/30,14:5:0,-999,"));
        assert!(line.ends_with(",-999\r\n"));
    }

    #[test]
    fn header_is_crlf_terminated() {
        assert!(DATALOG_HEADER.ends_with("\r\n"));
        assert!(DATALOG_HEADER.starts_with("YY/MM/DD,Hour:Min:Sec,R1,R2,Temperature,Count1,"));
    }
}
