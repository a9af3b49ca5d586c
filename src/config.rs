use crate::Resolution;

/// Start-up settings of [`Thermometers`](crate::Thermometers)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Block in the request calls until the conversion is done
    pub wait_for_conversion: bool,
    /// While blocking, ask the devices whether they are done instead of
    /// always waiting the worst case time. Ignored on parasite powered buses.
    pub check_for_conversion: bool,
    /// Initial global resolution, raised by `begin` to the finest resolution found
    pub resolution: Resolution,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wait_for_conversion: true,
            check_for_conversion: true,
            resolution: Resolution::Bits9,
        }
    }
}

impl Config {
    pub fn with_wait_for_conversion(mut self, wait: bool) -> Self {
        self.wait_for_conversion = wait;
        self
    }

    pub fn with_check_for_conversion(mut self, check: bool) -> Self {
        self.check_for_conversion = check;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }
}
