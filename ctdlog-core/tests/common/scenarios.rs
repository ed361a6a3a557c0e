//! Fixed raw-count scenarios shared by several test files

/// Samples per polarity in the four-pole scenarios
pub const N: usize = 12;

/// Sense resistor, reference and full scale used by the golden scenario
pub const SENSE_OHMS: f64 = 250.0;
pub const V_REF: f64 = 3.3;
pub const FULL_SCALE: f64 = 4095.0;

/// Four-pole reference input: 2048 on the current node, a 100-count drop
/// between the inner electrodes, mirrored in reverse polarity
pub struct GoldenFourPole {
    pub imeas1: [u16; N],
    pub p3meas1: [u16; N],
    pub p4meas1: [u16; N],
    pub imeas2: [u16; N],
    pub p3meas2: [u16; N],
    pub p4meas2: [u16; N],
}

impl GoldenFourPole {
    pub fn new() -> Self {
        Self {
            imeas1: [2048; N],
            p3meas1: [2148; N],
            p4meas1: [2048; N],
            imeas2: [2047; N],
            p3meas2: [2048; N],
            p4meas2: [2148; N],
        }
    }

    pub fn forward(&self) -> [&[u16]; 3] {
        [&self.imeas1, &self.p3meas1, &self.p4meas1]
    }

    pub fn reverse(&self) -> [&[u16]; 3] {
        [&self.imeas2, &self.p3meas2, &self.p4meas2]
    }

    /// Forward resistance evaluated in double precision
    pub fn expected_r1(&self) -> f64 {
        let current = 2048.0 / FULL_SCALE * V_REF / SENSE_OHMS;
        let voltage = (2148.0 - 2048.0) / FULL_SCALE * V_REF;
        voltage / current
    }

    /// Reverse resistance evaluated in double precision
    pub fn expected_r2(&self) -> f64 {
        let current = (V_REF - 2047.0 / FULL_SCALE * V_REF) / SENSE_OHMS;
        let voltage = (2148.0 - 2048.0) / FULL_SCALE * V_REF;
        voltage / current
    }
}

/// Interleave per-sample words for one ADC channel as the sequencer reads
/// them: forward sample 0, reverse sample 0, forward sample 1, ...
pub fn interleave(forward: &[u16], reverse: &[u16]) -> Vec<u16> {
    forward
        .iter()
        .zip(reverse)
        .flat_map(|(&f, &r)| [f, r])
        .collect()
}
