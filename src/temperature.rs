use crate::{Address, Error, Family, OneWire, Resolution, Scratchpad, Thermometers};
use embedded_hal::delay::DelayNs;
use log::warn;

/// Reported for devices that can't be read. Far outside the -55..125 °C
/// range of the sensors.
pub const DEVICE_DISCONNECTED_C: f32 = -127.0;

/// [`DEVICE_DISCONNECTED_C`] in Fahrenheit
pub const DEVICE_DISCONNECTED_F: f32 = -196.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    UnsupportedFamily(u8),
    /// The configuration register holds none of the four resolutions
    UnknownResolution(u8),
    /// DS18S20 reported a count per °C of zero
    InvalidCountPerDegree,
}

/// Converts the temperature word of a scratchpad to °C.
///
/// The scratchpad must already have passed its CRC check.
pub fn decode(family: Family, scratchpad: &Scratchpad) -> Result<f32, DecodeError> {
    let raw = scratchpad.temperature_raw();

    match family {
        Family::Ds18b20 | Family::Ds1822 => match scratchpad.resolution() {
            // the undefined low bits are shifted out at lower resolutions
            Some(Resolution::Bits12) => Ok(f32::from(raw) * 0.0625),
            Some(Resolution::Bits11) => Ok(f32::from(raw >> 1) * 0.125),
            Some(Resolution::Bits10) => Ok(f32::from(raw >> 2) * 0.25),
            Some(Resolution::Bits9) => Ok(f32::from(raw >> 3) * 0.5),
            None => Err(DecodeError::UnknownResolution(scratchpad.configuration())),
        },
        Family::Ds18s20 => {
            // T = T_read - 0.25 + (COUNT_PER_C - COUNT_REMAIN) / COUNT_PER_C
            let count_per_degree = scratchpad.count_per_degree();
            if count_per_degree == 0 {
                return Err(DecodeError::InvalidCountPerDegree);
            }
            let count_per_degree = f32::from(count_per_degree);
            let count_remain = f32::from(scratchpad.count_remain());
            Ok(f32::from(raw >> 1) - 0.25 + (count_per_degree - count_remain) / count_per_degree)
        }
        Family::Unknown(code) => Err(DecodeError::UnsupportedFamily(code)),
    }
}

pub fn to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

pub fn to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) / 1.8
}

impl Thermometers {
    /// Last converted temperature of a device in °C, `None` if the device is
    /// disconnected or its reading can't be decoded
    pub fn try_temperature_c<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<Option<f32>, Error<B::Error>> {
        let Some(scratchpad) = self.valid_scratchpad(bus, delay, address)? else {
            return Ok(None);
        };
        self.conversion_consumed();

        match decode(address.family(), &scratchpad) {
            Ok(celsius) => Ok(Some(celsius)),
            Err(error) => {
                warn!("{}: can't decode temperature: {:?}", address, error);
                Ok(None)
            }
        }
    }

    /// Last converted temperature of a device in °C or [`DEVICE_DISCONNECTED_C`]
    pub fn temperature_c<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<f32, Error<B::Error>> {
        Ok(self
            .try_temperature_c(bus, delay, address)?
            .unwrap_or(DEVICE_DISCONNECTED_C))
    }

    /// Last converted temperature of a device in °F or [`DEVICE_DISCONNECTED_F`]
    pub fn temperature_f<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<f32, Error<B::Error>> {
        Ok(self
            .try_temperature_c(bus, delay, address)?
            .map_or(DEVICE_DISCONNECTED_F, to_fahrenheit))
    }

    /// Temperature of the `index`-th device of the enumeration, slow: the
    /// address is looked up with a fresh search first
    pub fn temperature_c_by_index<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        index: usize,
    ) -> Result<f32, Error<B::Error>> {
        match self.address(bus, delay, index)? {
            Some(address) => self.temperature_c(bus, delay, &address),
            None => Ok(DEVICE_DISCONNECTED_C),
        }
    }

    pub fn temperature_f_by_index<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        index: usize,
    ) -> Result<f32, Error<B::Error>> {
        match self.address(bus, delay, index)? {
            Some(address) => self.temperature_f(bus, delay, &address),
            None => Ok(DEVICE_DISCONNECTED_F),
        }
    }
}
