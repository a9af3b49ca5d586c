use crate::{decode, Address, Command, Error, OneWire, Thermometers};
use embedded_hal::delay::DelayNs;
use log::{debug, trace, warn};

/// Lowest alarm threshold the sensors accept
pub const ALARM_TEMP_MIN: i8 = -55;
/// Highest alarm threshold the sensors accept
pub const ALARM_TEMP_MAX: i8 = 125;

/// State of the conditional (alarm) search.
///
/// Independent of the plain search cursor kept by the bus: both walk the ROM
/// tree, but with different commands and therefore different devices.
#[derive(Debug, Clone)]
pub struct AlarmSearch {
    address: [u8; Address::BYTES as usize],
    /// Bit of the last branch where the 0 path was taken, -1 before the first pass
    last_discrepancy: i8,
    exhausted: bool,
}

impl Default for AlarmSearch {
    fn default() -> Self {
        AlarmSearch {
            address: [0; Address::BYTES as usize],
            last_discrepancy: -1,
            exhausted: false,
        }
    }
}

impl AlarmSearch {
    pub fn new() -> AlarmSearch {
        AlarmSearch::default()
    }

    pub fn reset(&mut self) {
        *self = AlarmSearch::default();
    }

    /// Every alarmed device of this pass has been reported
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn is_bit_set(&self, bit: u8) -> bool {
        self.address[usize::from(bit / 8)] & (0x01 << (bit % 8)) != 0x00
    }

    fn write_bit(&mut self, bit: u8, value: bool) {
        let mask = 0x01 << (bit % 8);
        if value {
            self.address[usize::from(bit / 8)] |= mask;
        } else {
            self.address[usize::from(bit / 8)] &= !mask;
        }
    }

    /// Finds the next device in alarm state.
    ///
    /// `None` when the pass is over, nobody answers the reset or the bus
    /// returned nonsense in the middle of a pass. In the latter case the
    /// pass can only be retried after a [`reset`](Self::reset). The address
    /// is not CRC checked.
    pub fn next<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, Error<B::Error>> {
        if self.exhausted {
            return Ok(None);
        }
        if !bus.reset(delay)? {
            return Ok(None);
        }

        bus.write_command(delay, Command::SearchRomAlarmed, false)?;

        let mut last_zero: i8 = -1;
        let mut done = true;

        for i in 0..Address::BITS {
            let bit = bus.read_bit(delay)?;
            let complement = bus.read_bit(delay)?;
            let position = i as i8;

            if bit && complement {
                warn!("alarm search: no response at bit {}", i);
                return Ok(None);
            }

            let direction = if !bit && !complement {
                if position == self.last_discrepancy {
                    // took the 0 branch here last time, now the 1 branch
                    self.last_discrepancy = last_zero;
                    true
                } else if position < self.last_discrepancy {
                    // follow the previous path, its 0 branches are still open
                    let previous = self.is_bit_set(i);
                    if !previous {
                        done = false;
                        last_zero = position;
                    }
                    previous
                } else {
                    // new branch, 0 first
                    self.last_discrepancy = position;
                    done = false;
                    false
                }
            } else {
                bit
            };

            self.write_bit(i, direction);
            bus.write_bit(delay, direction)?;
        }

        if done {
            self.exhausted = true;
        }
        let address = Address::from(self.address);
        trace!("alarm search found {}", address);
        Ok(Some(address))
    }
}

impl Thermometers {
    pub fn reset_alarm_search(&mut self) {
        self.alarm_search.reset();
    }

    /// Next device in alarm state of the current pass, see [`AlarmSearch::next`]
    pub fn alarm_search<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, Error<B::Error>> {
        self.alarm_search.next(bus, delay)
    }

    /// `true` if any device on the bus reports an alarm
    pub fn has_any_alarm<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<bool, Error<B::Error>> {
        self.reset_alarm_search();
        Ok(self.alarm_search(bus, delay)?.is_some())
    }

    /// Evaluates the alarm condition from the device's scratchpad: the
    /// integer part of the temperature at or beyond one of the thresholds.
    /// Unreachable devices have no alarm.
    pub fn has_alarm<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<bool, Error<B::Error>> {
        let Some(scratchpad) = self.valid_scratchpad(bus, delay, address)? else {
            return Ok(false);
        };
        let Ok(celsius) = decode(address.family(), &scratchpad) else {
            return Ok(false);
        };

        // thresholds only have whole degrees, the fraction is truncated
        let celsius = celsius as i8;
        Ok(celsius <= scratchpad.low_alarm() || celsius >= scratchpad.high_alarm())
    }

    /// Calls `handler` for every device in alarm state with a valid address
    pub fn process_alarms<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        mut handler: impl FnMut(&Address),
    ) -> Result<(), Error<B::Error>> {
        self.reset_alarm_search();

        while let Some(address) = self.alarm_search(bus, delay)? {
            if address.is_valid() {
                debug!("{} is in alarm state", address);
                handler(&address);
            } else {
                warn!("alarm search returned invalid address {}", address);
            }
        }
        Ok(())
    }

    /// Sets TH, clamped to the sensor range. `false` if the device is
    /// disconnected.
    pub fn set_high_alarm_temp<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
        celsius: i8,
    ) -> Result<bool, Error<B::Error>> {
        let Some(mut scratchpad) = self.valid_scratchpad(bus, delay, address)? else {
            return Ok(false);
        };
        scratchpad.set_high_alarm(celsius.clamp(ALARM_TEMP_MIN, ALARM_TEMP_MAX));
        self.write_scratchpad(bus, delay, address, &scratchpad)?;
        Ok(true)
    }

    /// Sets TL, clamped to the sensor range. `false` if the device is
    /// disconnected.
    pub fn set_low_alarm_temp<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
        celsius: i8,
    ) -> Result<bool, Error<B::Error>> {
        let Some(mut scratchpad) = self.valid_scratchpad(bus, delay, address)? else {
            return Ok(false);
        };
        scratchpad.set_low_alarm(celsius.clamp(ALARM_TEMP_MIN, ALARM_TEMP_MAX));
        self.write_scratchpad(bus, delay, address, &scratchpad)?;
        Ok(true)
    }

    pub fn high_alarm_temp<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<Option<i8>, Error<B::Error>> {
        Ok(self
            .valid_scratchpad(bus, delay, address)?
            .map(|scratchpad| scratchpad.high_alarm()))
    }

    pub fn low_alarm_temp<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        address: &Address,
    ) -> Result<Option<i8>, Error<B::Error>> {
        Ok(self
            .valid_scratchpad(bus, delay, address)?
            .map(|scratchpad| scratchpad.low_alarm()))
    }
}
