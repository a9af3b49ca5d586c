#![no_std]
#![doc = include_str!("../README.md")]

#[cfg(test)]
extern crate std;

mod address;
#[cfg(feature = "alarms")]
mod alarm;
mod bus;
mod clock;
mod command;
mod config;
mod conversion;
mod driver;
mod family;
mod iowire;
mod resolution;
mod result;
mod scratchpad;
mod search;
mod temperature;
#[cfg(test)]
mod testing;
mod thermometers;

pub use address::{Address, AddressError};
#[cfg(feature = "alarms")]
pub use alarm::{AlarmSearch, ALARM_TEMP_MAX, ALARM_TEMP_MIN};
pub use bus::OneWire;
pub use clock::Clock;
pub use command::{Command, FunctionCommand, OpCode};
pub use config::Config;
pub use conversion::{ConversionState, MAX_CONVERSION_TIME_MS};
pub use driver::Driver;
pub use family::Family;
pub use iowire::{Inverted, IoWire};
pub use resolution::Resolution;
pub use result::Error;
pub use scratchpad::Scratchpad;
pub use search::DeviceSearch;
pub use temperature::{
    decode, to_celsius, to_fahrenheit, DecodeError, DEVICE_DISCONNECTED_C, DEVICE_DISCONNECTED_F,
};
pub use thermometers::Thermometers;

/// Dallas/Maxim CRC8 (polynomial x^8 + x^5 + x^4 + 1), continuing from `crc`
pub fn compute_partial_crc8(crc: u8, data: &[u8]) -> u8 {
    let mut crc = crc;
    for byte in data.iter() {
        let mut byte = *byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0x00 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

/// Dallas/Maxim CRC16 (polynomial x^16 + x^15 + x^2 + 1), continuing from `crc`.
///
/// Devices transmit the bitwise inverse of this value, least significant byte
/// first, see [`check_crc16`].
pub fn compute_crc16(crc: u16, data: &[u8]) -> u16 {
    const ODD_PARITY: [u8; 16] = [0, 1, 1, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0, 1, 1, 0];

    let mut crc = crc;
    for byte in data.iter() {
        let mut cdata = (u16::from(*byte) ^ crc) & 0xFF;
        crc >>= 8;

        if ODD_PARITY[usize::from(cdata & 0x0F)] ^ ODD_PARITY[usize::from(cdata >> 4)] != 0 {
            crc ^= 0xC001;
        }

        cdata <<= 6;
        crc ^= cdata;
        cdata <<= 1;
        crc ^= cdata;
    }
    crc
}

/// Checks `data` against the two inverted CRC16 bytes received from a device
pub fn check_crc16(data: &[u8], inverted_crc: &[u8; 2]) -> bool {
    let crc = !compute_crc16(0, data);
    crc.to_le_bytes() == *inverted_crc
}
