#[cfg(feature = "alarms")]
use crate::AlarmSearch;
use crate::{Address, Config, ConversionState, Error, OneWire, Resolution};
use embedded_hal::delay::DelayNs;
use log::{debug, warn};

/// Registry of the thermometers on one bus.
///
/// Holds no reference to the bus: every operation borrows the bus and a
/// delay (or [`Clock`](crate::Clock)) for its duration, so one value per bus
/// is enough and several buses need several values.
#[derive(Debug, Clone)]
pub struct Thermometers {
    pub(crate) devices: usize,
    pub(crate) parasite: bool,
    pub(crate) resolution: Resolution,
    pub(crate) wait_for_conversion: bool,
    pub(crate) check_for_conversion: bool,
    pub(crate) conversion: ConversionState,
    #[cfg(feature = "alarms")]
    pub(crate) alarm_search: AlarmSearch,
}

impl Default for Thermometers {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Thermometers {
    pub fn new(config: Config) -> Self {
        Thermometers {
            devices: 0,
            parasite: false,
            resolution: config.resolution,
            wait_for_conversion: config.wait_for_conversion,
            check_for_conversion: config.check_for_conversion,
            conversion: ConversionState::Idle,
            #[cfg(feature = "alarms")]
            alarm_search: AlarmSearch::new(),
        }
    }

    /// Enumerates the bus: counts the devices with a valid address, detects
    /// parasite power and raises the global resolution to the finest one
    /// found. Can be called again after devices were added or removed.
    pub fn begin<B: OneWire>(
        &mut self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<B::Error>> {
        bus.reset_search();
        self.devices = 0;

        while let Some(address) = bus.search_next(delay)? {
            if !address.is_valid() {
                warn!("skipping device with invalid address {}", address);
                continue;
            }

            if !self.parasite && self.read_power_supply(bus, delay, &address)? {
                debug!("{} runs on parasite power", address);
                self.parasite = true;
            }

            if let Some(resolution) = self.device_resolution(bus, delay, &address)? {
                self.resolution = self.resolution.max(resolution);
            }

            debug!("found {} ({:?})", address, address.family());
            self.devices += 1;
        }

        debug!(
            "{} devices, parasite power: {}, resolution: {} bits",
            self.devices,
            self.parasite,
            self.resolution.bits()
        );
        Ok(())
    }

    /// Number of devices with a valid address found by the last `begin`
    pub fn device_count(&self) -> usize {
        self.devices
    }

    /// Address of the `index`-th device of a fresh enumeration.
    ///
    /// Positions count every device the search reports, also the ones with
    /// an invalid address; those yield `None` when they are hit.
    pub fn address<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
        index: usize,
    ) -> Result<Option<Address>, Error<B::Error>> {
        bus.reset_search();

        let mut depth = 0;
        while let Some(address) = bus.search_next(delay)? {
            if depth == index {
                return Ok(Some(address).filter(Address::is_valid));
            }
            depth += 1;
        }
        Ok(None)
    }

    /// `true` once any device reported parasite power. Never resets.
    pub fn is_parasite_power_mode(&self) -> bool {
        self.parasite
    }

    pub fn wait_for_conversion(&self) -> bool {
        self.wait_for_conversion
    }

    pub fn set_wait_for_conversion(&mut self, wait: bool) {
        self.wait_for_conversion = wait;
    }

    pub fn check_for_conversion(&self) -> bool {
        self.check_for_conversion
    }

    pub fn set_check_for_conversion(&mut self, check: bool) {
        self.check_for_conversion = check;
    }
}
