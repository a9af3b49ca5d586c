use crate::{compute_partial_crc8, Address, Error, FunctionCommand, OneWire, Resolution, Thermometers};
use byteorder::{ByteOrder, LittleEndian};
use core::ops::{Deref, DerefMut};
use embedded_hal::delay::DelayNs;
use log::{trace, warn};

/// Settle time after copying the scratchpad to EEPROM on parasite power
const PARASITE_COPY_DELAY_MS: u32 = 10;

/// The 9 byte register file of a thermometer.
///
/// | Byte | Content |
/// |------|---------|
/// | 0, 1 | temperature, little endian |
/// | 2    | high alarm threshold (TH) |
/// | 3    | low alarm threshold (TL) |
/// | 4    | configuration (DS18B20, DS1822), reserved on DS18S20 |
/// | 5    | reserved |
/// | 6    | count remain (DS18S20) |
/// | 7    | count per °C (DS18S20) |
/// | 8    | CRC8 over bytes 0-7 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Scratchpad {
    raw: [u8; Self::BYTES],
}

impl From<[u8; Scratchpad::BYTES]> for Scratchpad {
    fn from(raw: [u8; Scratchpad::BYTES]) -> Self {
        Scratchpad { raw }
    }
}

impl Deref for Scratchpad {
    type Target = [u8; Self::BYTES];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl DerefMut for Scratchpad {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.raw
    }
}

impl Scratchpad {
    pub const BYTES: usize = 9;

    pub const TEMP_LSB: usize = 0;
    pub const TEMP_MSB: usize = 1;
    pub const HIGH_ALARM_TEMP: usize = 2;
    pub const LOW_ALARM_TEMP: usize = 3;
    pub const CONFIGURATION: usize = 4;
    pub const INTERNAL_BYTE: usize = 5;
    pub const COUNT_REMAIN: usize = 6;
    pub const COUNT_PER_C: usize = 7;
    pub const CRC: usize = 8;

    /// Raw temperature word as sent by the device
    pub fn temperature_raw(&self) -> i16 {
        LittleEndian::read_i16(&self.raw[Self::TEMP_LSB..=Self::TEMP_MSB])
    }

    pub fn high_alarm(&self) -> i8 {
        self.raw[Self::HIGH_ALARM_TEMP] as i8
    }

    pub fn set_high_alarm(&mut self, celsius: i8) {
        self.raw[Self::HIGH_ALARM_TEMP] = celsius as u8;
    }

    pub fn low_alarm(&self) -> i8 {
        self.raw[Self::LOW_ALARM_TEMP] as i8
    }

    pub fn set_low_alarm(&mut self, celsius: i8) {
        self.raw[Self::LOW_ALARM_TEMP] = celsius as u8;
    }

    pub fn configuration(&self) -> u8 {
        self.raw[Self::CONFIGURATION]
    }

    pub fn resolution(&self) -> Option<Resolution> {
        Resolution::from_config(self.configuration())
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.raw[Self::CONFIGURATION] = resolution.config_byte();
    }

    pub fn count_remain(&self) -> u8 {
        self.raw[Self::COUNT_REMAIN]
    }

    pub fn count_per_degree(&self) -> u8 {
        self.raw[Self::COUNT_PER_C]
    }

    pub fn crc8(&self) -> u8 {
        self.raw[Self::CRC]
    }

    /// Only a valid scratchpad may be interpreted
    pub fn is_valid(&self) -> bool {
        compute_partial_crc8(0, &self.raw[..Self::CRC]) == self.crc8()
    }
}

impl Thermometers {
    /// Reads all 9 bytes without judging them, see [`is_connected`](Self::is_connected)
    pub fn read_scratchpad<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<Scratchpad, Error<B::Error>> {
        let mut scratchpad = Scratchpad::default();

        bus.reset(delay)?;
        bus.select(delay, address)?;
        bus.write_command(delay, FunctionCommand::ReadScratchpad, false)?;
        let read = bus.read_bytes(delay, &mut scratchpad[..]);
        // release the bus even if the transfer broke off
        bus.reset(delay)?;
        read?;

        trace!("{}: scratchpad {:02x?}", address, &scratchpad[..]);
        Ok(scratchpad)
    }

    /// Writes TH, TL and, except on DS18S20, the configuration register,
    /// then copies them to EEPROM
    pub fn write_scratchpad<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
        scratchpad: &Scratchpad,
    ) -> Result<(), Error<B::Error>> {
        bus.reset(delay)?;
        bus.select(delay, address)?;
        bus.write_command(delay, FunctionCommand::WriteScratchpad, false)?;
        bus.write_byte(delay, scratchpad[Scratchpad::HIGH_ALARM_TEMP], false)?;
        bus.write_byte(delay, scratchpad[Scratchpad::LOW_ALARM_TEMP], false)?;
        if !address.family().has_fixed_resolution() {
            bus.write_byte(delay, scratchpad[Scratchpad::CONFIGURATION], false)?;
        }

        bus.reset(delay)?;
        bus.select(delay, address)?;
        bus.write_command(delay, FunctionCommand::CopyScratchpad, self.parasite)?;
        if self.parasite {
            delay.delay_ms(PARASITE_COPY_DELAY_MS);
        }
        bus.reset(delay)?;
        Ok(())
    }

    /// Reloads TH, TL and configuration from EEPROM into the scratchpad
    pub fn recall_eeprom<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<(), Error<B::Error>> {
        bus.reset(delay)?;
        bus.select(delay, address)?;
        bus.write_command(delay, FunctionCommand::RecallE2, false)?;
        bus.reset(delay)?;
        Ok(())
    }

    /// The scratchpad, if it passed the CRC check
    pub(crate) fn valid_scratchpad<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<Option<Scratchpad>, Error<B::Error>> {
        let scratchpad = self.read_scratchpad(bus, delay, address)?;
        if scratchpad.is_valid() {
            Ok(Some(scratchpad))
        } else {
            warn!("{}: scratchpad crc mismatch, treating as disconnected", address);
            Ok(None)
        }
    }

    /// A device is connected iff its scratchpad passes the CRC check
    pub fn is_connected<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<bool, Error<B::Error>> {
        Ok(self.valid_scratchpad(bus, delay, address)?.is_some())
    }

    /// Like [`is_connected`](Self::is_connected), also handing out the
    /// scratchpad that was read
    pub fn is_connected_scratchpad<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<(bool, Scratchpad), Error<B::Error>> {
        let scratchpad = self.read_scratchpad(bus, delay, address)?;
        Ok((scratchpad.is_valid(), scratchpad))
    }

    /// `true` if the device runs on parasite power: it pulls the read slot
    /// low after Read Power Supply
    pub fn read_power_supply<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<bool, Error<B::Error>> {
        bus.reset(delay)?;
        bus.select(delay, address)?;
        bus.write_command(delay, FunctionCommand::ReadPowerSupply, false)?;
        let externally_powered = bus.read_bit(delay);
        bus.reset(delay)?;
        Ok(!externally_powered?)
    }
}
