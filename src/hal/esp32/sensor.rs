//! Reed switch door sensor on a GPIO input.
//!
//! # Wiring
//!
//! - Reed switch door 1 → GPIO4 and GND
//! - Reed switch door 2 → GPIO5 and GND
//!
//! The internal pull-up holds the pin high until the magnet on the door
//! closes the switch, so a low level means the door is at the closed stop.

use esp_idf_hal::gpio::{Input, InputPin, OutputPin, PinDriver, Pull};
use esp_idf_hal::peripheral::Peripheral;

use crate::traits::{DoorSensor, SensorReading};

/// Door position contact read from a GPIO.
///
/// Both doors use `downgrade()`d pins, giving `Esp32DoorSensor<'_, AnyIOPin>`.
///
/// # Example
///
/// ```ignore
/// use garage_doors::hal::esp32::Esp32DoorSensor;
/// use garage_doors::traits::DoorSensor;
///
/// let peripherals = Peripherals::take()?;
/// let mut sensor = Esp32DoorSensor::new(peripherals.pins.gpio4.downgrade())?;
/// println!("door 1: {}", sensor.read().as_str());
/// ```
pub struct Esp32DoorSensor<'d, P: InputPin + OutputPin> {
    pin: PinDriver<'d, P, Input>,
}

impl<'d, P: InputPin + OutputPin> Esp32DoorSensor<'d, P> {
    /// Configure `pin` as an input with the internal pull-up enabled.
    pub fn new(pin: impl Peripheral<P = P> + 'd) -> Result<Self, esp_idf_hal::sys::EspError> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;
        Ok(Self { pin })
    }
}

impl<P: InputPin + OutputPin> DoorSensor for Esp32DoorSensor<'_, P> {
    fn read(&mut self) -> SensorReading {
        SensorReading::from_level(self.pin.is_low())
    }
}
