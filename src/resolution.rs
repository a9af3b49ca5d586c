use crate::{Address, Error, OneWire, Thermometers};
use embedded_hal::delay::DelayNs;
use log::{debug, trace};

/// Conversion resolution, the discriminant is the configuration register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Resolution {
    #[default]
    Bits9 = 0b0001_1111,
    Bits10 = 0b0011_1111,
    Bits11 = 0b0101_1111,
    Bits12 = 0b0111_1111,
}

impl Resolution {
    pub const MIN_BITS: u8 = 9;
    pub const MAX_BITS: u8 = 12;

    pub fn bits(&self) -> u8 {
        match self {
            Resolution::Bits9 => 9,
            Resolution::Bits10 => 10,
            Resolution::Bits11 => 11,
            Resolution::Bits12 => 12,
        }
    }

    pub fn config_byte(&self) -> u8 {
        *self as _
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            9 => Some(Resolution::Bits9),
            10 => Some(Resolution::Bits10),
            11 => Some(Resolution::Bits11),
            12 => Some(Resolution::Bits12),
            _ => None,
        }
    }

    /// Any bit count, constrained to 9..=12
    pub fn clamped(bits: u8) -> Self {
        match bits.clamp(Self::MIN_BITS, Self::MAX_BITS) {
            9 => Resolution::Bits9,
            10 => Resolution::Bits10,
            11 => Resolution::Bits11,
            _ => Resolution::Bits12,
        }
    }

    pub fn from_config(config: u8) -> Option<Self> {
        match config {
            0x1F => Some(Resolution::Bits9),
            0x3F => Some(Resolution::Bits10),
            0x5F => Some(Resolution::Bits11),
            0x7F => Some(Resolution::Bits12),
            _ => None,
        }
    }

    /// Worst case conversion time in milliseconds
    pub fn time_ms(&self) -> u32 {
        match self {
            Resolution::Bits9 => 94,
            Resolution::Bits10 => 188,
            Resolution::Bits11 => 375,
            Resolution::Bits12 => 750,
        }
    }

    /// Worst case conversion time for a possibly unknown resolution, unknown
    /// ones get the 12 bit time
    pub fn time_ms_for(resolution: Option<Resolution>) -> u32 {
        resolution.unwrap_or(Resolution::Bits12).time_ms()
    }
}

impl Thermometers {
    /// The global resolution: the finest resolution seen by `begin` or the
    /// last one applied with [`set_resolution`](Self::set_resolution)
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Sets every enumerated device to `bits`, constrained to 9..=12
    pub fn set_resolution<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        bits: u8,
    ) -> Result<(), Error<B::Error>> {
        let resolution = Resolution::clamped(bits);
        self.resolution = resolution;
        debug!("setting all devices to {} bits", resolution.bits());

        // invalid addresses hold a search slot too
        bus.reset_search();
        while let Some(address) = bus.search_next(delay)? {
            if address.is_valid() {
                self.set_device_resolution(bus, delay, &address, resolution)?;
            }
        }
        Ok(())
    }

    /// Returns `false` if the device is not connected. DS18S20 devices are
    /// accepted without a write, their resolution is fixed.
    pub fn set_device_resolution<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
        resolution: Resolution,
    ) -> Result<bool, Error<B::Error>> {
        let Some(mut scratchpad) = self.valid_scratchpad(bus, delay, address)? else {
            return Ok(false);
        };

        if !address.family().has_fixed_resolution() {
            trace!("{}: resolution {} bits", address, resolution.bits());
            scratchpad.set_resolution(resolution);
            self.write_scratchpad(bus, delay, address, &scratchpad)?;
        }
        Ok(true)
    }

    /// `None` if the device is disconnected or its configuration register
    /// holds no known resolution
    pub fn device_resolution<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<Option<Resolution>, Error<B::Error>> {
        if address.family().has_fixed_resolution() {
            return Ok(Some(Resolution::Bits9));
        }

        Ok(self
            .valid_scratchpad(bus, delay, address)?
            .and_then(|scratchpad| scratchpad.resolution()))
    }
}
