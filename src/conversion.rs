use crate::{Address, Clock, Error, FunctionCommand, OneWire, Resolution, Thermometers};
use embedded_hal::delay::DelayNs;
use log::{trace, warn};

/// Upper bound for polling a conversion, the 12 bit worst case
pub const MAX_CONVERSION_TIME_MS: u32 = 750;

const POLL_INTERVAL_MS: u32 = 1;

/// Where the last conversion cycle stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionState {
    #[default]
    Idle,
    /// Convert command sent, nobody waits for it (asynchronous mode)
    Requested,
    /// Blocking for the fixed worst case time
    Waiting,
    /// Blocking while reading the ready bit
    Polling,
    /// Conversion finished or the wait is over
    Ready,
}

impl Thermometers {
    pub fn conversion_state(&self) -> ConversionState {
        self.conversion
    }

    /// Starts a conversion on every device. In synchronous mode this blocks
    /// until the conversion at the global resolution is done.
    pub fn request_temperatures<B: OneWire>(
        &mut self,
        bus: &mut B,
        clock: &mut impl Clock,
    ) -> Result<(), Error<B::Error>> {
        bus.reset(clock)?;
        bus.skip(clock)?;
        bus.write_command(clock, FunctionCommand::Convert, self.parasite)?;
        self.conversion = ConversionState::Requested;

        if !self.wait_for_conversion {
            return Ok(());
        }

        if self.can_poll() {
            self.poll_until_converted(bus, clock)?;
        } else {
            self.wait_worst_case(clock, self.resolution.time_ms());
        }
        self.conversion = ConversionState::Ready;
        Ok(())
    }

    /// Starts a conversion on one device, `false` if the device is
    /// disconnected. In synchronous mode the wait is based on the device's
    /// own resolution, not the global one.
    pub fn request_temperatures_by_address<B: OneWire>(
        &mut self,
        bus: &mut B,
        clock: &mut impl Clock,
        address: &Address,
    ) -> Result<bool, Error<B::Error>> {
        bus.reset(clock)?;
        bus.select(clock, address)?;
        bus.write_command(clock, FunctionCommand::Convert, self.parasite)?;
        self.conversion = ConversionState::Requested;

        // read slots only report progress right after the convert command
        let polling = self.wait_for_conversion && self.can_poll();
        if polling {
            self.poll_until_converted(bus, clock)?;
        }

        if !self.is_connected(bus, clock, address)? {
            self.conversion = ConversionState::Idle;
            return Ok(false);
        }

        if !self.wait_for_conversion {
            return Ok(true);
        }

        if !polling {
            let resolution = self.device_resolution(bus, clock, address)?;
            self.wait_worst_case(clock, Resolution::time_ms_for(resolution));
        }
        self.conversion = ConversionState::Ready;
        Ok(true)
    }

    /// Like [`request_temperatures_by_address`](Self::request_temperatures_by_address),
    /// `false` if there is no valid device at `index`
    pub fn request_temperatures_by_index<B: OneWire>(
        &mut self,
        bus: &mut B,
        clock: &mut impl Clock,
        index: usize,
    ) -> Result<bool, Error<B::Error>> {
        match self.address(bus, clock, index)? {
            Some(address) => self.request_temperatures_by_address(bus, clock, &address),
            None => Ok(false),
        }
    }

    /// Reads one time slot. Externally powered devices hold the line low
    /// while converting. Only meaningful directly after a convert command.
    pub fn is_conversion_complete<B: OneWire>(
        &self,
        bus: &mut B,
        delay: &mut impl DelayNs,
    ) -> Result<bool, Error<B::Error>> {
        bus.read_bit(delay)
    }

    /// Parasite powered devices can't answer read slots while the line is
    /// held high for them
    fn can_poll(&self) -> bool {
        self.check_for_conversion && !self.parasite
    }

    /// `Ok(false)` on timeout; the caller carries on and reads whatever the
    /// device has
    fn poll_until_converted<B: OneWire>(
        &mut self,
        bus: &mut B,
        clock: &mut impl Clock,
    ) -> Result<bool, Error<B::Error>> {
        self.conversion = ConversionState::Polling;
        let start = clock.now_millis();

        loop {
            if self.is_conversion_complete(bus, clock)? {
                trace!("conversion done after {} ms", clock.millis_since(start));
                return Ok(true);
            }
            if clock.millis_since(start) >= MAX_CONVERSION_TIME_MS {
                warn!("conversion not done after {} ms, reading anyway", MAX_CONVERSION_TIME_MS);
                return Ok(false);
            }
            clock.delay_ms(POLL_INTERVAL_MS);
        }
    }

    fn wait_worst_case(&mut self, clock: &mut impl Clock, ms: u32) {
        self.conversion = ConversionState::Waiting;
        trace!("waiting {} ms for conversion", ms);
        clock.delay_ms(ms);
    }

    pub(crate) fn conversion_consumed(&mut self) {
        if self.conversion == ConversionState::Ready {
            self.conversion = ConversionState::Idle;
        }
    }
}
