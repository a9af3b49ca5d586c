/// Thermometer model, discriminated by the family code in byte 0 of the address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// DS18S20 (and the older DS1820): fixed 9 bit conversion, extended via count-remain
    Ds18s20,
    Ds18b20,
    Ds1822,
    Unknown(u8),
}

impl Family {
    pub const DS18S20: u8 = 0x10;
    pub const DS18B20: u8 = 0x28;
    pub const DS1822: u8 = 0x22;

    pub fn code(&self) -> u8 {
        match self {
            Family::Ds18s20 => Self::DS18S20,
            Family::Ds18b20 => Self::DS18B20,
            Family::Ds1822 => Self::DS1822,
            Family::Unknown(code) => *code,
        }
    }

    /// The configuration register is absent and the resolution can't be changed
    pub fn has_fixed_resolution(&self) -> bool {
        matches!(self, Family::Ds18s20)
    }
}

impl From<u8> for Family {
    fn from(code: u8) -> Self {
        match code {
            Self::DS18S20 => Family::Ds18s20,
            Self::DS18B20 => Family::Ds18b20,
            Self::DS1822 => Family::Ds1822,
            other => Family::Unknown(other),
        }
    }
}
