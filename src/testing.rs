//! Simulated bus and clock for the unit tests

use crate::{compute_partial_crc8, Address, Clock, Error, Family, OneWire, Scratchpad};
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use std::vec::Vec;

/// One observable bus transaction step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Reset,
    Select(Address),
    Skip,
    WriteByte(u8, bool),
    ReadByte,
    WriteBit(bool),
    ReadBit,
}

/// A thermometer on the simulated bus
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub address: Address,
    pub scratchpad: [u8; Scratchpad::BYTES],
    /// TH, TL and configuration
    pub eeprom: [u8; 3],
    /// Number of Write Scratchpad commands received
    pub writes: usize,
    pub parasite: bool,
    pub alarmed: bool,
    pub connected: bool,
    busy_polls: u32,
    busy_remaining: u32,
    converts_to: Option<u16>,
    corrupt_byte: Option<usize>,
}

impl SimDevice {
    /// Power-on state: 85 °C, TH 75, TL 70, 12 bits
    pub fn new(address: Address) -> Self {
        let scratchpad = match address.family() {
            Family::Ds18s20 => [0xAA, 0x00, 0x4B, 0x46, 0xFF, 0xFF, 0x0C, 0x10, 0x00],
            _ => [0x50, 0x05, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0x00],
        };
        let mut device = SimDevice {
            address,
            scratchpad,
            eeprom: [scratchpad[2], scratchpad[3], scratchpad[4]],
            writes: 0,
            parasite: false,
            alarmed: false,
            connected: true,
            busy_polls: 0,
            busy_remaining: 0,
            converts_to: None,
            corrupt_byte: None,
        };
        device.update_crc();
        device
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    pub fn parasite(mut self) -> Self {
        self.parasite = true;
        self
    }

    pub fn alarmed(mut self) -> Self {
        self.alarmed = true;
        self
    }

    pub fn with_config(mut self, config: u8) -> Self {
        self.scratchpad[Scratchpad::CONFIGURATION] = config;
        self.eeprom[2] = config;
        self.update_crc();
        self
    }

    pub fn with_raw_temperature(mut self, raw: u16) -> Self {
        self.set_raw_temperature(raw);
        self
    }

    pub fn with_count_remain(mut self, count: u8) -> Self {
        self.scratchpad[Scratchpad::COUNT_REMAIN] = count;
        self.update_crc();
        self
    }

    /// Temperature word latched by the next conversion
    pub fn converting_to(mut self, raw: u16) -> Self {
        self.converts_to = Some(raw);
        self
    }

    /// Conversions stay in progress for this many read slots
    pub fn busy_for(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    /// Flips a bit of this scratchpad byte on every read
    pub fn corrupting_byte(mut self, index: usize) -> Self {
        self.corrupt_byte = Some(index);
        self
    }

    fn set_raw_temperature(&mut self, raw: u16) {
        let [lsb, msb] = raw.to_le_bytes();
        self.scratchpad[Scratchpad::TEMP_LSB] = lsb;
        self.scratchpad[Scratchpad::TEMP_MSB] = msb;
        self.update_crc();
    }

    fn update_crc(&mut self) {
        self.scratchpad[Scratchpad::CRC] =
            compute_partial_crc8(0, &self.scratchpad[..Scratchpad::CRC]);
    }

    /// Bytes accepted by Write Scratchpad
    fn writable(&self) -> usize {
        if self.address.family().has_fixed_resolution() {
            2
        } else {
            3
        }
    }

    fn address_bit(&self, bit: u8) -> bool {
        self.address[usize::from(bit / 8)] & (0x01 << (bit % 8)) != 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Phase {
    #[default]
    Idle,
    Addressed,
    ReadScratchpad(usize),
    WriteScratchpad(usize),
    Converting,
    PowerSupply,
    Search {
        bit: u8,
        complement: bool,
    },
    Done,
}

/// Byte level model of a bus with DS18x20 devices. The ROM searches are
/// modelled bit by bit with wired-AND semantics, `search_next` takes a
/// shortcut through the roster.
#[derive(Debug, Default)]
pub struct SimBus {
    devices: Vec<SimDevice>,
    roster: Option<Vec<Address>>,
    cursor: usize,
    phase: Phase,
    targets: Vec<usize>,
    search_reads: usize,
    silence_after: Option<usize>,
    log: Vec<Op>,
}

impl SimBus {
    pub fn new(devices: impl IntoIterator<Item = SimDevice>) -> Self {
        SimBus {
            devices: devices.into_iter().collect(),
            ..SimBus::default()
        }
    }

    /// Replaces what the plain search reports, in this order
    pub fn set_roster(&mut self, addresses: impl IntoIterator<Item = Address>) {
        self.roster = Some(addresses.into_iter().collect());
    }

    /// Every device stops answering ROM searches after this many read slots
    pub fn silence_after_search_bits(&mut self, reads: usize) {
        self.silence_after = Some(reads);
    }

    pub fn device(&self, address: &Address) -> &SimDevice {
        self.devices
            .iter()
            .find(|device| device.address == *address)
            .expect("no such device")
    }

    pub fn device_mut(&mut self, address: &Address) -> &mut SimDevice {
        self.devices
            .iter_mut()
            .find(|device| device.address == *address)
            .expect("no such device")
    }

    pub fn log(&self) -> &[Op] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    fn roster(&self) -> Vec<Address> {
        match &self.roster {
            Some(roster) => roster.clone(),
            None => self
                .devices
                .iter()
                .filter(|device| device.connected)
                .map(|device| device.address)
                .collect(),
        }
    }

    fn function(&mut self, code: u8) {
        self.phase = match code {
            0xBE => Phase::ReadScratchpad(0),
            0x4E => {
                for &index in &self.targets {
                    self.devices[index].writes += 1;
                }
                Phase::WriteScratchpad(0)
            }
            0x48 => {
                for &index in &self.targets {
                    let device = &mut self.devices[index];
                    let writable = device.writable();
                    device.eeprom[..writable].copy_from_slice(&device.scratchpad[2..2 + writable]);
                }
                Phase::Done
            }
            0xB8 => {
                for &index in &self.targets {
                    let device = &mut self.devices[index];
                    let writable = device.writable();
                    device.scratchpad[2..2 + writable].copy_from_slice(&device.eeprom[..writable]);
                    device.update_crc();
                }
                Phase::Done
            }
            0x44 => {
                for &index in &self.targets {
                    let device = &mut self.devices[index];
                    if let Some(raw) = device.converts_to {
                        device.set_raw_temperature(raw);
                    }
                    device.busy_remaining = device.busy_polls;
                }
                Phase::Converting
            }
            0xB4 => Phase::PowerSupply,
            _ => Phase::Done,
        };
    }

    fn search_slot(&mut self, bit: u8, complement: bool) -> bool {
        self.search_reads += 1;
        if matches!(self.silence_after, Some(after) if self.search_reads > after) {
            return true;
        }
        // wired-AND, an idle line reads 1
        self.targets
            .iter()
            .all(|&index| self.devices[index].address_bit(bit) != complement)
    }
}

impl OneWire for SimBus {
    type Error = Infallible;

    fn reset(&mut self, _delay: &mut impl DelayNs) -> Result<bool, Error<Self::Error>> {
        self.log.push(Op::Reset);
        self.phase = Phase::Idle;
        self.targets.clear();
        Ok(self.devices.iter().any(|device| device.connected))
    }

    fn select(
        &mut self,
        _delay: &mut impl DelayNs,
        addr: &Address,
    ) -> Result<(), Error<Self::Error>> {
        self.log.push(Op::Select(*addr));
        self.targets = (0..self.devices.len())
            .filter(|&index| self.devices[index].connected && self.devices[index].address == *addr)
            .collect();
        self.phase = Phase::Addressed;
        Ok(())
    }

    fn skip(&mut self, _delay: &mut impl DelayNs) -> Result<(), Error<Self::Error>> {
        self.log.push(Op::Skip);
        self.targets = (0..self.devices.len())
            .filter(|&index| self.devices[index].connected)
            .collect();
        self.phase = Phase::Addressed;
        Ok(())
    }

    fn write_byte(
        &mut self,
        _delay: &mut impl DelayNs,
        byte: u8,
        hold_power: bool,
    ) -> Result<(), Error<Self::Error>> {
        self.log.push(Op::WriteByte(byte, hold_power));
        match self.phase {
            Phase::Idle if byte == 0xF0 || byte == 0xEC => {
                let alarmed_only = byte == 0xEC;
                self.targets = (0..self.devices.len())
                    .filter(|&index| {
                        let device = &self.devices[index];
                        device.connected && (device.alarmed || !alarmed_only)
                    })
                    .collect();
                self.search_reads = 0;
                self.phase = Phase::Search {
                    bit: 0,
                    complement: false,
                };
            }
            Phase::Addressed => self.function(byte),
            Phase::WriteScratchpad(position) => {
                for &index in &self.targets {
                    let device = &mut self.devices[index];
                    if position < device.writable() {
                        device.scratchpad[2 + position] = byte;
                        device.update_crc();
                    }
                }
                self.phase = Phase::WriteScratchpad(position + 1);
            }
            _ => {}
        }
        Ok(())
    }

    fn read_byte(&mut self, _delay: &mut impl DelayNs) -> Result<u8, Error<Self::Error>> {
        self.log.push(Op::ReadByte);
        let Phase::ReadScratchpad(position) = self.phase else {
            return Ok(0xFF);
        };
        self.phase = Phase::ReadScratchpad(position + 1);
        if position >= Scratchpad::BYTES {
            return Ok(0xFF);
        }

        Ok(self.targets.iter().fold(0xFF, |line, &index| {
            let device = &self.devices[index];
            let mut byte = device.scratchpad[position];
            if device.corrupt_byte == Some(position) {
                byte ^= 0x01;
            }
            line & byte
        }))
    }

    fn write_bit(&mut self, _delay: &mut impl DelayNs, bit: bool) -> Result<(), Error<Self::Error>> {
        self.log.push(Op::WriteBit(bit));
        if let Phase::Search { bit: position, .. } = self.phase {
            let devices = &self.devices;
            self.targets
                .retain(|&index| devices[index].address_bit(position) == bit);
            self.phase = Phase::Search {
                bit: position + 1,
                complement: false,
            };
        }
        Ok(())
    }

    fn read_bit(&mut self, _delay: &mut impl DelayNs) -> Result<bool, Error<Self::Error>> {
        self.log.push(Op::ReadBit);
        match self.phase {
            Phase::Converting => {
                let mut done = true;
                for &index in &self.targets {
                    let device = &mut self.devices[index];
                    if device.busy_remaining > 0 {
                        device.busy_remaining -= 1;
                        done = false;
                    }
                }
                Ok(done)
            }
            Phase::PowerSupply => Ok(self
                .targets
                .iter()
                .all(|&index| !self.devices[index].parasite)),
            Phase::Search { bit, complement } => {
                self.phase = Phase::Search {
                    bit,
                    complement: !complement,
                };
                Ok(self.search_slot(bit, complement))
            }
            _ => Ok(true),
        }
    }

    fn reset_search(&mut self) {
        self.cursor = 0;
    }

    fn search_next(
        &mut self,
        _delay: &mut impl DelayNs,
    ) -> Result<Option<Address>, Error<Self::Error>> {
        let found = self.roster().get(self.cursor).copied();
        if found.is_some() {
            self.cursor += 1;
        }
        Ok(found)
    }
}

/// Virtual time, advanced only by the delays
#[derive(Debug, Default)]
pub struct TestClock {
    now_ns: u64,
    /// Every millisecond delay, in order
    pub waits_ms: Vec<u32>,
}

impl DelayNs for TestClock {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.push(ms);
        self.now_ns += u64::from(ms) * 1_000_000;
    }
}

impl Clock for TestClock {
    fn now_millis(&self) -> u32 {
        (self.now_ns / 1_000_000) as u32
    }
}
