//! ESP32 hardware abstraction layer for the garage door controller.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 SuperMini
//! - **Relays**: 2-channel relay module, contacts wired across each opener's
//!   wall button
//! - **Sensors**: one reed switch per door at the closed position, switching
//!   to ground
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments.

mod clock;
mod relay;
mod sensor;

pub use clock::Esp32Clock;
pub use relay::Esp32Relay;
pub use sensor::Esp32DoorSensor;

use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin};

/// Opener relay on a downgraded pin; one type for both doors.
pub type DoorRelay<'d> = Esp32Relay<'d, AnyOutputPin>;

/// Reed switch on a downgraded pin; one type for both doors.
pub type DoorContact<'d> = Esp32DoorSensor<'d, AnyIOPin>;

#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Wifi;

#[cfg(feature = "esp32-mqtt")]
mod mqtt;
#[cfg(feature = "esp32-mqtt")]
pub use mqtt::{Esp32Mqtt, Esp32MqttError};

#[cfg(feature = "esp32-mqtt")]
mod storage;
#[cfg(feature = "esp32-mqtt")]
pub use storage::NvsSettingsStore;

/// Pin assignments for the SuperMini ESP32-C3.
pub mod pins {
    // =========================================================================
    // Relay Outputs
    // =========================================================================

    /// Door 1 opener relay
    pub const RELAY_DOOR_1: i32 = 2;

    /// Door 2 opener relay
    pub const RELAY_DOOR_2: i32 = 3;

    // =========================================================================
    // Sensor Inputs (internal pull-up, low = closed)
    // =========================================================================

    /// Door 1 closed-position reed switch
    pub const SENSOR_DOOR_1: i32 = 4;

    /// Door 2 closed-position reed switch
    pub const SENSOR_DOOR_2: i32 = 5;
}
