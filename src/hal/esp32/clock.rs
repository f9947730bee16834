//! ESP32 clock implementation using the ESP-IDF high resolution timer.

use crate::traits::Clock;

/// Milliseconds since boot from `esp_timer_get_time()`.
///
/// The timer is 64-bit microseconds and does not wrap within the lifetime of
/// the device; elapsed-time math still goes through wrapping subtraction.
///
/// # Example
///
/// ```ignore
/// use garage_doors::hal::esp32::Esp32Clock;
/// use garage_doors::traits::{elapsed_ms, Clock};
///
/// let clock = Esp32Clock::new();
/// let start = clock.now_ms();
/// // ... tick ...
/// let elapsed = elapsed_ms(clock.now_ms(), start);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new ESP32 clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Plain read of the system timer
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
