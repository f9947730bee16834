//! Opener relay output on a GPIO pin.
//!
//! # Wiring
//!
//! - Relay IN1 → GPIO2 (door 1)
//! - Relay IN2 → GPIO3 (door 2)
//! - Relay COM/NO → in parallel with the opener's wall button
//!
//! Many cheap relay modules switch on a low input; construct those with
//! [`Esp32Relay::active_low`].

use esp_idf_hal::gpio::{Level, Output, OutputPin, PinDriver};
use esp_idf_hal::peripheral::Peripheral;
use log::error;

use crate::traits::RelayOutput;

/// Relay driven by a push-pull GPIO.
///
/// Build both doors' relays from `downgrade_output()` pins so they share the
/// `Esp32Relay<'_, AnyOutputPin>` type.
///
/// # Example
///
/// ```ignore
/// use garage_doors::hal::esp32::Esp32Relay;
/// use garage_doors::traits::RelayOutput;
///
/// let peripherals = Peripherals::take()?;
/// let mut relay = Esp32Relay::new(peripherals.pins.gpio2.downgrade_output())?;
/// relay.energize();
/// ```
pub struct Esp32Relay<'d, P: OutputPin> {
    pin: PinDriver<'d, P, Output>,
    active_level: Level,
    active: bool,
}

impl<'d, P: OutputPin> Esp32Relay<'d, P> {
    /// Relay that closes on a high output. Starts released.
    pub fn new(pin: impl Peripheral<P = P> + 'd) -> Result<Self, esp_idf_hal::sys::EspError> {
        Self::with_active_level(pin, Level::High)
    }

    /// Relay that closes on a low output. Starts released.
    pub fn active_low(pin: impl Peripheral<P = P> + 'd) -> Result<Self, esp_idf_hal::sys::EspError> {
        Self::with_active_level(pin, Level::Low)
    }

    fn with_active_level(
        pin: impl Peripheral<P = P> + 'd,
        active_level: Level,
    ) -> Result<Self, esp_idf_hal::sys::EspError> {
        let mut pin = PinDriver::output(pin)?;
        pin.set_level(!active_level)?;
        Ok(Self {
            pin,
            active_level,
            active: false,
        })
    }
}

impl<P: OutputPin> RelayOutput for Esp32Relay<'_, P> {
    fn set_active(&mut self, active: bool) {
        let level = if active {
            self.active_level
        } else {
            !self.active_level
        };
        match self.pin.set_level(level) {
            Ok(()) => self.active = active,
            Err(e) => error!("relay write failed: {:?}", e),
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
