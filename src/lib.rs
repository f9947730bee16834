//! # garage-doors
//!
//! A controller for two garage doors, driven over MQTT. Each door has an
//! opener relay wired across its wall button and one position contact at
//! the closed stop.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Traits for the door sensor, relay, and clock
//! - **Debounced state**: `opening`/`closing` are held for a time window
//!   while the contact still reads the old position
//! - **Bounded relay pulses**: the opener button is "pressed" for a fixed time
//! - **Publish throttling**: states go out on change, plus a shared heartbeat
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware and network abstractions
//! - `commands` - Door commands, the command interpreter, the command queue
//! - `relay` - Relay pulse timing
//! - `estimator` - Sensor reading vs. motion hypothesis reconciliation
//! - `door` - Per-door state and controller
//! - `garage` - Both doors, tick ordering, publish throttling
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//! - `config` - Device, MQTT, WiFi and timing configuration, persisted settings
//! - `messages` - MQTT topic layout and payload codecs
//! - `services` - Shared state and MQTT runners (requires `std`)
//!
//! ## Example
//!
//! ```rust
//! use garage_doors::{
//!     DoorCommand, DoorId, DoorState, GarageController, TimingConfig,
//!     hal::{MockRelay, MockSensor},
//!     traits::SensorReading,
//! };
//!
//! let mut garage = GarageController::new(
//!     [MockSensor::new(SensorReading::Closed), MockSensor::new(SensorReading::Closed)],
//!     [MockRelay::new(), MockRelay::new()],
//!     TimingConfig::default(),
//! );
//!
//! // A command arrives from the bus
//! garage.submit(DoorId::Door1, DoorCommand::Open);
//!
//! // Update in your main loop
//! let report = garage.tick(20);
//! assert_eq!(garage.state(DoorId::Door1), DoorState::Opening);
//! for (door, state) in report.publish.iter() {
//!     println!("{} -> {}", door, state);
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Door commands, the command interpreter, and the pending-command queue.
pub mod commands;
/// Per-door state, runtime bookkeeping, and the single-door controller.
pub mod door;
/// Sensor reading reconciliation against the motion hypothesis.
pub mod estimator;
/// Dual-door orchestration and publish throttling.
pub mod garage;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Relay pulse sequencing.
pub mod relay;
/// Core traits for hardware and network abstraction.
pub mod traits;

/// Shared configuration system for desktop and ESP32.
pub mod config;

/// MQTT topic layout and payload codecs.
pub mod messages;

/// Shared state and MQTT services (require `std`).
#[cfg(feature = "std")]
pub mod services;

// Re-exports for convenience
pub use commands::{interpret, CommandOutcome, CommandQueue, DoorCommand, QueuedCommand};
pub use door::{DoorController, DoorId, DoorRuntime, DoorState, DoorUpdate, DOOR_COUNT};
pub use estimator::{reconcile, reconcile_detailed, ReconcileKind, Reconciliation};
pub use garage::{GarageController, PublishThrottle, TickReport, COMMAND_QUEUE_CAPACITY};
pub use relay::{pulse_expired, RelayAction, RelayPulser};
pub use traits::{
    // Hardware
    Clock,
    DoorSensor,
    // Network
    MqttClient,
    MqttMessage,
    RelayOutput,
    SensorReading,
    SettingsStore,
};

// Config re-exports
pub use config::{
    Config, ConfigError, DeviceConfig, MqttConfig, TimingConfig, WifiConfig,
    CLOSING_TIME_WINDOW_MS, MAX_PUBLISH_INTERVAL_MS, OPENING_TIME_WINDOW_MS,
    RELAY_ACTIVATION_DURATION_MS,
};

#[cfg(feature = "serde-json-core")]
pub use config::{load_config, load_or_provision, save_config, StoredSettings};

pub use messages::{Inbound, InboundError, Topics};
