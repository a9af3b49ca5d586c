use embedded_hal::delay::DelayNs;

/// Monotonic millisecond counter plus blocking delays.
///
/// The counter is expected to wrap at `u32::MAX`; elapsed times are computed
/// with wrapping arithmetic.
pub trait Clock: DelayNs {
    fn now_millis(&self) -> u32;

    fn millis_since(&self, start: u32) -> u32 {
        self.now_millis().wrapping_sub(start)
    }
}
