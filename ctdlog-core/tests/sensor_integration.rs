//! Integration tests for the full measurement pipeline
//!
//! Tests the data flow from raw batches through conversion, trimming and
//! calibration, both with a synthetic source and with the real sequencer
//! driving recording pins.

mod common;

use ctdlog_core::config::{AdcConfig, MeasureParams, SampleCount, SensorConfig};
use ctdlog_core::datalog::DatalogRecord;
use ctdlog_core::excitation::{ExcitationSequencer, FourPoleChannels, SingleChannel};
use ctdlog_core::thermistor::{Thermistor, ThermistorConfig};
use ctdlog_core::{
    CalibrationModel, FourPoleSensor, MeasurementError, TwoPoleSensor, INVALID_RESISTANCE_OHMS,
};

use common::scenarios::{interleave, GoldenFourPole, N};
use common::{assert_close, FakeDelay, RecordingPin, ScriptedAdc, SharedClock, SyntheticSource, Trace};

fn golden_sensor() -> FourPoleSensor<SyntheticSource<3>> {
    let golden = GoldenFourPole::new();
    let source = SyntheticSource::four_pole(golden.forward(), golden.reverse());
    let config = SensorConfig::four_pole_12bit(CalibrationModel::linear(1.0, 0.0));
    FourPoleSensor::new(source, config).unwrap()
}

#[test]
fn test_golden_four_pole_resistance() {
    let golden = GoldenFourPole::new();
    let mut sensor = golden_sensor();

    let m = sensor.measure(&MeasureParams::four_pole()).unwrap();

    assert!(m.forward.trusted);
    assert!(m.reverse.trusted);
    assert_eq!(m.forward.faulted_samples, 0);
    assert_close(m.resistance1(), golden.expected_r1(), 1e-5);
    assert_close(m.resistance2(), golden.expected_r2(), 1e-5);
    // 100 counts across the electrodes over 2048 on the sense node
    assert_close(m.resistance1(), 100.0 / 2048.0 * 250.0, 1e-5);

    assert_eq!(m.forward_counts, [2048.0, 2148.0, 2048.0]);
    assert_eq!(m.reverse_counts, [2047.0, 2048.0, 2148.0]);
}

#[test]
fn test_golden_is_bit_reproducible() {
    let first = golden_sensor().measure(&MeasureParams::four_pole()).unwrap();
    let second = golden_sensor().measure(&MeasureParams::four_pole()).unwrap();
    let mut reused = golden_sensor();
    reused.measure(&MeasureParams::four_pole()).unwrap();
    let third = reused.measure(&MeasureParams::four_pole()).unwrap();

    for m in [second, third] {
        assert_eq!(m.resistance1().to_bits(), first.resistance1().to_bits());
        assert_eq!(m.resistance2().to_bits(), first.resistance2().to_bits());
        assert_eq!(m.conductivity, first.conductivity);
    }
}

#[test]
fn test_sequencer_matches_synthetic_source() {
    let golden = GoldenFourPole::new();
    let trace = Trace::new();
    let clock = SharedClock::new();
    let sequencer = ExcitationSequencer::new(
        RecordingPin::new("forward", &trace),
        RecordingPin::new("reverse", &trace),
        FourPoleChannels {
            current: ScriptedAdc::new("current", &trace, interleave(&golden.imeas1, &golden.imeas2)),
            probe3: ScriptedAdc::new("probe3", &trace, interleave(&golden.p3meas1, &golden.p3meas2)),
            probe4: ScriptedAdc::new("probe4", &trace, interleave(&golden.p4meas1, &golden.p4meas2)),
        },
        FakeDelay::new(clock.clone(), trace.clone()),
        clock,
        AdcConfig::twelve_bit(),
    )
    .unwrap();
    let config = SensorConfig::four_pole_12bit(CalibrationModel::linear(1.0, 0.0));
    let mut hardware = FourPoleSensor::new(sequencer, config).unwrap();

    let from_pins = hardware.measure(&MeasureParams::four_pole()).unwrap();
    let synthetic = golden_sensor().measure(&MeasureParams::four_pole()).unwrap();

    assert_eq!(from_pins.resistance1().to_bits(), synthetic.resistance1().to_bits());
    assert_eq!(from_pins.resistance2().to_bits(), synthetic.resistance2().to_bits());
    // Defaults switch immediately, so the fake clock never moved
    assert_eq!(from_pins.elapsed_us, None);
    assert_eq!(trace.final_levels(), vec![("forward", false), ("reverse", false)]);
}

#[test]
fn test_switching_transients_are_trimmed() {
    let golden = GoldenFourPole::new();
    let mut p3 = golden.p3meas1;
    // Two spikes and one zero-current sample in the forward phase
    p3[2] = 4000;
    p3[7] = 100;
    let mut current = golden.imeas1;
    current[9] = 0;

    let source = SyntheticSource::four_pole([&current, &p3, &golden.p4meas1], golden.reverse());
    let config = SensorConfig::four_pole_12bit(CalibrationModel::linear(1.0, 0.0));
    let mut sensor = FourPoleSensor::new(source, config).unwrap();

    let m = sensor.measure_default().unwrap();
    assert!(m.forward.trusted);
    assert_eq!(m.forward.faulted_samples, 1);
    assert_close(m.resistance1(), golden.expected_r1(), 1e-5);
}

#[test]
fn test_persistent_fault_is_not_averaged() {
    let golden = GoldenFourPole::new();
    let mut current = golden.imeas1;
    for c in current.iter_mut().take(N / 4 + 1) {
        *c = 0;
    }

    let source = SyntheticSource::four_pole([&current, &golden.p3meas1, &golden.p4meas1], golden.reverse());
    let config = SensorConfig::four_pole_12bit(CalibrationModel::linear(1.0, 0.0));
    let mut sensor = FourPoleSensor::new(source, config).unwrap();

    let m = sensor.measure_default().unwrap();
    assert!(!m.forward.trusted);
    assert_eq!(m.resistance1(), INVALID_RESISTANCE_OHMS);
    assert!(m.reverse.trusted);
    assert!(matches!(
        m.conductivity,
        Err(MeasurementError::DomainViolation { quantity: "conductivity", .. })
    ));
}

#[test]
fn test_two_pole_sensor_on_sequencer() {
    let trace = Trace::new();
    let clock = SharedClock::new();
    // Forward reads 3/4 FS, reverse 1/3 FS
    let sequencer = ExcitationSequencer::new(
        RecordingPin::new("p1", &trace),
        RecordingPin::new("p2", &trace),
        SingleChannel {
            adc: ScriptedAdc::new("divider", &trace, vec![3071, 1365]),
        },
        FakeDelay::new(clock.clone(), trace.clone()),
        clock,
        AdcConfig::twelve_bit(),
    )
    .unwrap();
    let config = SensorConfig::two_pole_12bit(CalibrationModel::uncalibrated_power_law());
    let mut sensor = TwoPoleSensor::new(sequencer, config).unwrap();

    let m = sensor.measure_default().unwrap();
    assert_close(m.resistance1(), 1000.0 * (2.0 * 3071.0 / 4095.0 - 1.0) / (1.0 - 3071.0 / 4095.0), 1e-4);
    assert_close(m.resistance2(), 1000.0, 1e-4);
    assert_eq!(m.current_counts(), (3071.0, 1365.0));
    // 100 cycles of 4 × 100 µs
    assert_eq!(m.elapsed_us, Some(40_000));

    let k = m.conductivity.unwrap();
    assert!(!k.calibrated);
    // 10^1 · (1000 − 1)^1
    assert_close(k.value, 9990.0, 1e-4);
}

#[test]
fn test_thermistor_probe_feeds_salinity() {
    let trace = Trace::new();
    let clock = SharedClock::new();
    let thermistor = Thermistor::new(
        ScriptedAdc::constant("thermistor", &trace, 1365),
        Some(RecordingPin::new("therm_power", &trace)),
        Some(RecordingPin::new("therm_ground", &trace)),
        FakeDelay::new(clock.clone(), trace.clone()),
        clock,
        ThermistorConfig::default(),
    )
    .unwrap();

    let golden = GoldenFourPole::new();
    let source = SyntheticSource::four_pole(golden.forward(), golden.reverse());
    // k = 1/(0.002 · 12.207) ≈ 40.96 mS/cm, a seawater-like value
    let config = SensorConfig::four_pole_12bit(CalibrationModel::linear(0.002, 0.0));
    let mut sensor = FourPoleSensor::new(source, config)
        .unwrap()
        .with_probe(thermistor)
        .with_temperature_samples(SampleCount::new(40).unwrap());

    let m = sensor.measure_default().unwrap();
    let t = m.temperature_c().unwrap();
    assert!((t - 25.0).abs() < 0.05);

    let k = m.conductivity.unwrap().value;
    let salinity = m.salinity.unwrap().unwrap();
    assert!(salinity > 20.0 && salinity < 40.0, "salinity {salinity}");
    assert_close(m.tds.unwrap().unwrap(), 0.65 * m.k25.unwrap().unwrap() as f64, 1e-6);
    assert!(k > 40.0 && k < 42.0);

    let (_, probe) = sensor.release();
    let (adc, ..) = probe.unwrap().release();
    assert_eq!(adc.reads(), 40);
}

#[test]
fn test_open_thermistor_keeps_reading_but_not_salinity() {
    let trace = Trace::new();
    let clock = SharedClock::new();
    // Open divider: the node sits at full scale on every read
    let thermistor = Thermistor::new(
        ScriptedAdc::constant("thermistor", &trace, 4095),
        Some(RecordingPin::new("therm_power", &trace)),
        Some(RecordingPin::new("therm_ground", &trace)),
        FakeDelay::new(clock.clone(), trace.clone()),
        clock,
        ThermistorConfig::default(),
    )
    .unwrap();

    let golden = GoldenFourPole::new();
    let source = SyntheticSource::four_pole(golden.forward(), golden.reverse());
    let config = SensorConfig::four_pole_12bit(CalibrationModel::linear(0.002, 0.0));
    let mut sensor = FourPoleSensor::new(source, config)
        .unwrap()
        .with_probe(thermistor)
        .with_temperature_samples(SampleCount::new(16).unwrap());

    let m = sensor.measure_default().unwrap();
    let reading = m.temperature.unwrap();
    assert_eq!(reading.celsius, -55.0);
    assert_eq!(reading.out_of_range_samples, 16);

    assert!(m.conductivity.is_ok());
    for derived in [m.salinity, m.k25, m.tds] {
        assert!(matches!(
            derived,
            Some(Err(MeasurementError::DomainViolation { quantity: "temperature", .. }))
        ));
    }
}

#[test]
fn test_datalog_line_from_measurement() {
    let mut sensor = golden_sensor();
    let m = sensor.measure_default().unwrap();
    let timestamp = ctdlog_core::datalog::LogTimestamp {
        year: 2024,
        month: 7,
        day: 30,
        hour: 6,
        minute: 0,
        second: 15,
    };

    let line = DatalogRecord::from_measurement(timestamp, &m, Some(1013.3))
        .format_line()
        .unwrap();
    assert_eq!(
        line.as_str(),
        "2024/7/30,6:0:15,12.21,12.21,-999,2048.00,2148.00,2048.00,2047.00,2048.00,2148.00,1013.3\r\n"
    );
}

#[test]
fn test_configuration_errors_before_any_pin_moves() {
    assert!(MeasureParams::new(0, Default::default()).is_err());

    let trace = Trace::new();
    let clock = SharedClock::new();
    let bad_adc = AdcConfig {
        resolution_bits: 12,
        native_bits: 8,
        v_ref: 3.3,
    };
    let result = ExcitationSequencer::new(
        RecordingPin::new("forward", &trace),
        RecordingPin::new("reverse", &trace),
        SingleChannel {
            adc: ScriptedAdc::constant("divider", &trace, 0),
        },
        FakeDelay::new(clock.clone(), trace.clone()),
        clock,
        bad_adc,
    );
    assert!(matches!(result, Err(MeasurementError::InvalidConfig { .. })));
    assert!(trace.events().is_empty());
}
