use crate::{compute_partial_crc8, Family};
use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    ops::{Deref, DerefMut},
    str::FromStr,
};

/// 64-bit ROM code of a 1-Wire device: family code, 48-bit serial, CRC8
#[derive(Debug, Clone, Copy, PartialOrd, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Address {
    raw: [u8; Self::BYTES as usize],
}

impl Default for Address {
    fn default() -> Self {
        Self::from([0; Self::BYTES as usize])
    }
}

impl From<[u8; Self::BYTES as usize]> for Address {
    fn from(raw: [u8; Self::BYTES as usize]) -> Self {
        Address { raw }
    }
}

impl From<Address> for [u8; Address::BYTES as usize] {
    fn from(addr: Address) -> [u8; Address::BYTES as usize] {
        addr.raw
    }
}

impl Deref for Address {
    type Target = [u8; Self::BYTES as usize];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl DerefMut for Address {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.raw
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.deref() as _
    }
}

impl AsMut<[u8]> for Address {
    fn as_mut(&mut self) -> &mut [u8] {
        self.deref_mut() as _
    }
}

impl Address {
    /// The length of device address in bytes
    pub const BYTES: u8 = 8;

    /// The length of device address in bits
    pub const BITS: u8 = Self::BYTES * 8;

    /// Builds an address from family code and serial, appending the CRC8
    pub fn new(family_code: u8, serial: [u8; 6]) -> Self {
        let mut raw = [0u8; Self::BYTES as usize];
        raw[0] = family_code;
        raw[1..7].copy_from_slice(&serial);
        raw[7] = compute_partial_crc8(0, &raw[..7]);
        Self::from(raw)
    }

    pub fn family_code(&self) -> u8 {
        self[0]
    }

    pub fn family(&self) -> Family {
        Family::from(self.family_code())
    }

    pub fn serial(&self) -> &[u8] {
        &self[1..7]
    }

    pub fn crc8(&self) -> u8 {
        self[7]
    }

    /// `true` iff the CRC8 over the first seven bytes matches the eighth
    pub fn is_valid(&self) -> bool {
        compute_partial_crc8(0, &self[..7]) == self.crc8()
    }
}

/// Error type
#[derive(Debug, PartialEq)]
pub enum AddressError {
    NotEnough,
    Invalid,
}

fn hex_to_u8(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut addr = Address::default();
        let mut chars = s.chars().filter(|c| !c.is_whitespace() && *c != ':');

        for i in 0..Self::BYTES as usize {
            match (chars.next(), chars.next()) {
                (Some(h), Some(l)) => match (hex_to_u8(h), hex_to_u8(l)) {
                    (Some(h), Some(l)) => {
                        addr[i] = (h << 4) | l;
                    }
                    _ => return Err(AddressError::Invalid),
                },
                _ => return Err(AddressError::NotEnough),
            }
        }

        Ok(addr)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5], self[6], self[7],
        )
    }
}

#[cfg(test)]
mod test {
    use super::{Address, AddressError};
    use crate::Family;
    use std::string::ToString;

    #[test]
    fn parse_address() {
        let addr: Address = "02 1c b8 01 00 00 00 a2".parse().unwrap();

        assert_eq!(
            addr,
            Address::from([0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00, 0xa2])
        );
    }

    #[test]
    fn parse_address_colon_separated() {
        let addr: Address = "28:ff:4b:2e:64:16:03:a5".parse().unwrap();

        assert_eq!(
            addr,
            Address::from([0x28, 0xff, 0x4b, 0x2e, 0x64, 0x16, 0x03, 0xa5])
        );
    }

    #[test]
    fn parse_address_errors() {
        assert_eq!(
            "28 ff 4b".parse::<Address>(),
            Err(AddressError::NotEnough)
        );
        assert_eq!(
            "28 ff 4b 2e 64 16 03 zz".parse::<Address>(),
            Err(AddressError::Invalid)
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        let addr = Address::new(0x28, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        let printed = addr.to_string();
        assert_eq!(printed.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn known_rom_code_is_valid() {
        // family 0x02, serial 00000001B81C, crc 0xA2
        let addr = Address::from([0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00, 0xa2]);
        assert!(addr.is_valid());
    }

    #[test]
    fn new_appends_matching_crc() {
        let addr = Address::new(0x02, [0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(addr.crc8(), 0xa2);
        assert!(addr.is_valid());
        assert_eq!(addr.serial(), &[0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn any_single_bit_flip_invalidates() {
        let addr = Address::new(0x28, [0xde, 0xad, 0xbe, 0xef, 0x00, 0x42]);
        for bit in 0..Address::BITS {
            let mut corrupted = addr;
            corrupted[usize::from(bit / 8)] ^= 1 << (bit % 8);
            assert!(!corrupted.is_valid(), "flip of bit {} went unnoticed", bit);
        }
    }

    #[test]
    fn all_zero_address_is_trivially_valid() {
        // crc8 of zeros is zero, callers that care must reject family 0 themselves
        assert!(Address::default().is_valid());
    }

    #[test]
    fn family_lookup() {
        assert_eq!(Address::new(0x10, [0; 6]).family(), Family::Ds18s20);
        assert_eq!(Address::new(0x28, [0; 6]).family(), Family::Ds18b20);
        assert_eq!(Address::new(0x22, [0; 6]).family(), Family::Ds1822);
        assert_eq!(Address::new(0x42, [0; 6]).family(), Family::Unknown(0x42));
    }
}
