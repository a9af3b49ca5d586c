use crate::{Address, Command, Error, OneWire};
use embedded_hal::delay::DelayNs;
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum SearchState {
    #[default]
    Initialized,
    DeviceFound,
    End,
}

/// Cursor of a ROM search over the device tree.
///
/// Remembers the path of the last device found and the branches where the
/// 0 path was taken, so that each call continues with the next device.
#[derive(Debug, Clone, Default)]
pub struct DeviceSearch {
    address: [u8; Address::BYTES as usize],
    discrepancies: [u8; Address::BYTES as usize],
    state: SearchState,
}

impl DeviceSearch {
    pub fn new() -> DeviceSearch {
        DeviceSearch::default()
    }

    pub fn is_finished(&self) -> bool {
        self.state == SearchState::End
    }

    fn is_bit_set(array: &[u8], bit: u8) -> bool {
        array[usize::from(bit / 8)] & (0x01 << (bit % 8)) != 0x00
    }

    fn write_bit(array: &mut [u8], bit: u8, value: bool) {
        let mask = 0x01 << (bit % 8);
        if value {
            array[usize::from(bit / 8)] |= mask;
        } else {
            array[usize::from(bit / 8)] &= !mask;
        }
    }

    fn is_bit_set_in_address(&self, bit: u8) -> bool {
        Self::is_bit_set(&self.address, bit)
    }

    fn write_bit_in_address(&mut self, bit: u8, value: bool) {
        Self::write_bit(&mut self.address, bit, value);
    }

    fn write_bit_in_discrepancies(&mut self, bit: u8, value: bool) {
        Self::write_bit(&mut self.discrepancies, bit, value);
    }

    /// Highest branch where the 0 path was taken and the 1 path is pending
    pub fn last_discrepancy(&self) -> Option<u8> {
        (0..Address::BITS)
            .rev()
            .find(|bit| Self::is_bit_set(&self.discrepancies, *bit))
    }

    /// Runs one pass of the search with `cmd` (Search ROM or Search Alarm)
    pub fn next<B: OneWire>(
        &mut self,
        wire: &mut B,
        delay: &mut impl DelayNs,
        cmd: Command,
    ) -> Result<Option<Address>, Error<B::Error>> {
        if self.state == SearchState::End {
            return Ok(None);
        }

        let last_discrepancy = self.last_discrepancy();
        if last_discrepancy.is_none() && self.state == SearchState::DeviceFound {
            // the previous pass took no 0 branch: it was the last device
            self.state = SearchState::End;
            return Ok(None);
        }

        if !wire.reset(delay)? {
            return Ok(None);
        }
        wire.write_command(delay, cmd, false)?;

        let mut discrepancy_found = false;
        for i in 0..Address::BITS {
            let bit = wire.read_bit(delay)?;
            let complement = wire.read_bit(delay)?;
            if bit && complement {
                trace!("search: no response at bit {}", i);
                return Ok(None);
            }

            let direction = match last_discrepancy {
                // walk the previous path
                Some(last) if i < last => self.is_bit_set_in_address(i),
                // the 0 path was walked last time, now the 1 path
                Some(last) if i == last => {
                    self.write_bit_in_discrepancies(i, false);
                    true
                }
                _ => {
                    if !bit && !complement {
                        // new branch, 0 path first
                        discrepancy_found = true;
                        self.write_bit_in_discrepancies(i, true);
                        false
                    } else {
                        bit
                    }
                }
            };

            self.write_bit_in_address(i, direction);
            wire.write_bit(delay, direction)?;
        }

        self.state = if !discrepancy_found && self.last_discrepancy().is_none() {
            SearchState::End
        } else {
            SearchState::DeviceFound
        };
        Ok(Some(Address::from(self.address)))
    }
}
