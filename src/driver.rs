use crate::{Address, Command, DeviceSearch, Error, IoWire, OneWire};
use embedded_hal::delay::DelayNs;

/// Bit-banged 1-Wire master on top of an [`IoWire`].
///
/// Timings follow the standard speed recommendations of the Maxim
/// application notes. Time critical sections are not protected against
/// interrupts, that is left to the caller.
pub struct Driver<W: IoWire> {
    io_wire: W,
    search: DeviceSearch,
}

impl<W: IoWire> Driver<W> {
    pub fn new(io_wire: W) -> Self {
        Driver {
            io_wire,
            search: DeviceSearch::new(),
        }
    }

    /// Gives the pins back
    pub fn release(self) -> W {
        self.io_wire
    }

    /// Next device of a Search ROM (`0xF0`) or conditional search (`0xEC`)
    /// with a caller owned cursor, independent of the enumeration behind
    /// [`OneWire::search_next`]
    pub fn search_with(
        &mut self,
        search: &mut DeviceSearch,
        delay: &mut impl DelayNs,
        cmd: Command,
    ) -> Result<Option<Address>, Error<W::Error>> {
        search.next(self, delay, cmd)
    }

    fn ensure_wire_high(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<W::Error>> {
        for _ in 0..125 {
            if self.io_wire.is_high()? {
                return Ok(());
            }
            delay.delay_us(2);
        }
        Err(Error::WireFault)
    }
}

impl<W: IoWire> OneWire for Driver<W> {
    type Error = W::Error;

    /// Returns `Err(WireFault)` if the line stays low for 250µs before the
    /// reset pulse (shorted wire)
    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<Self::Error>> {
        self.io_wire.set_strong_pullup(false)?;
        self.io_wire.set_high()?;

        self.ensure_wire_high(delay)?;
        self.io_wire.set_low()?;
        delay.delay_us(480);
        self.io_wire.set_high()?;

        let mut presence = false;
        for _ in 0..7 {
            delay.delay_us(10);
            presence |= self.io_wire.is_low()?;
        }
        delay.delay_us(410);
        Ok(presence)
    }

    fn select(&mut self, delay: &mut impl DelayNs, addr: &Address) -> Result<(), Error<Self::Error>> {
        self.write_command(delay, Command::MatchRom, false)?;
        for byte in addr.iter() {
            self.write_byte(delay, *byte, false)?;
        }
        Ok(())
    }

    fn skip(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<Self::Error>> {
        self.write_command(delay, Command::SkipRom, false)
    }

    fn write_byte(
        &mut self,
        delay: &mut impl DelayNs,
        byte: u8,
        hold_power: bool,
    ) -> Result<(), Error<Self::Error>> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(delay, (byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        if hold_power {
            // released by the next reset
            self.io_wire.set_strong_pullup(true)?;
        }
        Ok(())
    }

    fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, Error<Self::Error>> {
        let mut byte = 0_u8;
        for _ in 0..8 {
            byte >>= 1;
            if self.read_bit(delay)? {
                byte |= 0x80;
            }
        }
        Ok(byte)
    }

    fn write_bit(&mut self, delay: &mut impl DelayNs, bit: bool) -> Result<(), Error<Self::Error>> {
        self.io_wire.set_low()?;
        delay.delay_us(if bit { 10 } else { 65 });
        self.io_wire.set_high()?;
        delay.delay_us(if bit { 55 } else { 5 });
        Ok(())
    }

    fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<Self::Error>> {
        self.io_wire.set_low()?;
        delay.delay_us(3);
        self.io_wire.set_high()?;
        delay.delay_us(10);
        let bit = self.io_wire.is_high()?;
        delay.delay_us(53);
        Ok(bit)
    }

    fn reset_search(&mut self) {
        self.search = DeviceSearch::new();
    }

    fn search_next(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, Error<Self::Error>> {
        let mut search = core::mem::take(&mut self.search);
        let found = search.next(self, delay, Command::SearchRom);
        self.search = search;
        found
    }
}
