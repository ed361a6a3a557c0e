//! Hardware and probe traits
//!
//! Digital outputs and delays come from `embedded-hal` 1.0. It has no ADC
//! trait, so one-shot conversions are modelled here in the same non-blocking
//! style as the `nb`-based HAL drivers: `read` may return `WouldBlock` while
//! the conversion is in progress and the core spins on it.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::config::SampleCount;
use crate::errors::{MeasurementError, MeasurementResult};
use crate::thermistor::ThermistorReading;

/// One-shot ADC channel
///
/// Returns the raw converter word. Scaling to the configured resolution (for
/// APIs that left-justify to 16 bits) is done by
/// [`AdcConfig::normalize`](crate::config::AdcConfig::normalize).
pub trait AdcChannel {
    /// Driver error type
    type Error: core::fmt::Debug;

    /// Start or poll a conversion
    fn read(&mut self) -> nb::Result<u16, Self::Error>;
}

impl<T: AdcChannel + ?Sized> AdcChannel for &mut T {
    type Error = T::Error;

    fn read(&mut self) -> nb::Result<u16, Self::Error> {
        (**self).read()
    }
}

/// Block until the channel produces a word
pub(crate) fn read_blocking<A: AdcChannel>(adc: &mut A, device: &'static str) -> MeasurementResult<u16> {
    nb::block!(adc.read()).map_err(|_| MeasurementError::Peripheral { device })
}

/// Drive a pin, mapping the HAL error into the core's error type
pub(crate) fn drive<P: OutputPin>(pin: &mut P, high: bool, device: &'static str) -> MeasurementResult<()> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|_| MeasurementError::Peripheral { device })
}

/// Temperature source that can be attached to a conductivity sensor
pub trait TemperatureProbe {
    /// Take `samples` readings and reduce them to one temperature
    fn read_temperature(&mut self, samples: SampleCount) -> MeasurementResult<ThermistorReading>;
}

impl<T: TemperatureProbe + ?Sized> TemperatureProbe for &mut T {
    fn read_temperature(&mut self, samples: SampleCount) -> MeasurementResult<ThermistorReading> {
        (**self).read_temperature(samples)
    }
}

/// Placeholder for sensors built without a temperature probe
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl TemperatureProbe for NoProbe {
    fn read_temperature(&mut self, _samples: SampleCount) -> MeasurementResult<ThermistorReading> {
        Err(MeasurementError::InvalidConfig {
            reason: "no temperature probe attached",
        })
    }
}

/// Placeholder for an optional pin that is hard-wired instead
///
/// Thermistor dividers may be powered from the 3.3 V rail and grounded
/// directly; use `None::<NoPin>` for those.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Trait for values that can be checked for numeric validity
pub trait Validatable {
    /// Check if the value is a usable number (not NaN, infinite)
    fn is_valid(&self) -> bool;
}

impl Validatable for f32 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

impl Validatable for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown {
        busy: u8,
        value: u16,
    }

    impl AdcChannel for Countdown {
        type Error = ();

        fn read(&mut self) -> nb::Result<u16, ()> {
            if self.busy > 0 {
                self.busy -= 1;
                Err(nb::Error::WouldBlock)
            } else {
                Ok(self.value)
            }
        }
    }

    struct Broken;

    impl AdcChannel for Broken {
        type Error = ();

        fn read(&mut self) -> nb::Result<u16, ()> {
            Err(nb::Error::Other(()))
        }
    }

    #[test]
    fn blocking_read_waits_for_conversion() {
        let mut adc = Countdown { busy: 3, value: 2048 };
        assert_eq!(read_blocking(&mut adc, "adc"), Ok(2048));
    }

    #[test]
    fn driver_error_maps_to_peripheral() {
        let mut adc = Broken;
        assert_eq!(
            read_blocking(&mut adc, "current sense"),
            Err(MeasurementError::Peripheral { device: "current sense" })
        );
    }

    #[test]
    fn missing_probe_is_a_configuration_error() {
        let samples = SampleCount::new(4).unwrap();
        let err = NoProbe.read_temperature(samples).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn validatable_floats() {
        assert!(5.0f32.is_valid());
        assert!(!f32::NAN.is_valid());
        assert!(!f32::INFINITY.is_valid());
    }
}
