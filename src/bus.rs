use crate::{check_crc16, compute_crc16, compute_partial_crc8, Address, Error, OpCode};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// A 1-Wire bus master.
///
/// This is everything the thermometer layer needs from the transport: reset
/// with presence detection, addressing, bit and byte transfers and the plain
/// ROM search. Only one transaction (reset, addressing, command, data) is in
/// flight at a time; implementations don't have to guard against interleaving.
pub trait OneWire {
    type Error: Debug;

    /// Issues a reset pulse, `Ok(true)` if at least one device answered with
    /// a presence pulse
    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<Self::Error>>;

    /// Addresses the single device with the given ROM code (Match ROM)
    fn select(&mut self, delay: &mut impl DelayNs, addr: &Address)
        -> Result<(), Error<Self::Error>>;

    /// Addresses all devices on the bus at once (Skip ROM)
    fn skip(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<Self::Error>>;

    /// Writes one byte LSB first. With `hold_power` the line is kept strongly
    /// driven high afterwards to feed parasite powered devices.
    fn write_byte(
        &mut self,
        delay: &mut impl DelayNs,
        byte: u8,
        hold_power: bool,
    ) -> Result<(), Error<Self::Error>>;

    fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, Error<Self::Error>>;

    fn write_bit(&mut self, delay: &mut impl DelayNs, bit: bool)
        -> Result<(), Error<Self::Error>>;

    fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<Self::Error>>;

    /// Restarts the plain device enumeration from the first device
    fn reset_search(&mut self);

    /// Next device of the plain (Search ROM) enumeration, `None` once every
    /// device has been reported. The order is the same on every full pass as
    /// long as the devices on the bus don't change.
    fn search_next(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, Error<Self::Error>>;

    fn write_command(
        &mut self,
        delay: &mut impl DelayNs,
        cmd: impl OpCode,
        hold_power: bool,
    ) -> Result<(), Error<Self::Error>> {
        self.write_byte(delay, cmd.op_code(), hold_power)
    }

    fn read_bytes(
        &mut self,
        delay: &mut impl DelayNs,
        dst: &mut [u8],
    ) -> Result<(), Error<Self::Error>> {
        for d in dst {
            *d = self.read_byte(delay)?;
        }
        Ok(())
    }

    fn crc8(&self, data: &[u8]) -> u8 {
        compute_partial_crc8(0, data)
    }

    fn crc16(&self, data: &[u8], seed: u16) -> u16 {
        compute_crc16(seed, data)
    }

    fn check_crc16(&self, data: &[u8], inverted_crc: &[u8; 2]) -> bool {
        check_crc16(data, inverted_crc)
    }
}
