//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without a garage.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockSensor`] | [`DoorSensor`] | Settable contact reading, counts samples |
//! | [`MockRelay`] | [`RelayOutput`] | Tracks level and every write |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockMqtt`] | [`MqttClient`] | Captures pub/sub operations |
//! | [`MockSettingsStore`] | [`SettingsStore`] | In-memory settings blob |
//!
//! # Example
//!
//! ```rust
//! use garage_doors::{DoorCommand, DoorId, DoorState, GarageController, TimingConfig};
//! use garage_doors::hal::{MockRelay, MockSensor};
//! use garage_doors::traits::SensorReading;
//!
//! let mut garage = GarageController::new(
//!     [MockSensor::new(SensorReading::Closed), MockSensor::new(SensorReading::Open)],
//!     [MockRelay::new(), MockRelay::new()],
//!     TimingConfig::default(),
//! );
//!
//! garage.tick(0);
//! assert_eq!(garage.states(), [DoorState::Closed, DoorState::Open]);
//!
//! garage.apply_command(DoorId::Door2, DoorCommand::Close, 20);
//! assert_eq!(garage.door(DoorId::Door2).relay().activations, 1);
//! ```
//!
//! [`DoorSensor`]: crate::traits::DoorSensor
//! [`RelayOutput`]: crate::traits::RelayOutput
//! [`Clock`]: crate::traits::Clock
//! [`MqttClient`]: crate::traits::MqttClient
//! [`SettingsStore`]: crate::traits::SettingsStore

use core::cell::Cell;

use crate::traits::{
    Clock, DoorSensor, MqttClient, MqttMessage, RelayOutput, SensorReading, SettingsStore,
};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock door position sensor.
///
/// Returns whatever reading was last [`set`](Self::set).
///
/// # Example
///
/// ```rust
/// use garage_doors::hal::MockSensor;
/// use garage_doors::traits::{DoorSensor, SensorReading};
///
/// let mut sensor = MockSensor::new(SensorReading::Closed);
/// assert_eq!(sensor.read(), SensorReading::Closed);
///
/// sensor.set(SensorReading::Open);
/// assert_eq!(sensor.read(), SensorReading::Open);
/// assert_eq!(sensor.reads, 2);
/// ```
#[derive(Debug, Default)]
pub struct MockSensor {
    /// Reading returned by `read()`.
    pub reading: SensorReading,
    /// Number of times `read()` was called.
    pub reads: usize,
}

impl MockSensor {
    /// Creates a mock sensor reporting `reading`.
    pub fn new(reading: SensorReading) -> Self {
        Self { reading, reads: 0 }
    }

    /// Change the reading.
    pub fn set(&mut self, reading: SensorReading) {
        self.reading = reading;
    }
}

impl DoorSensor for MockSensor {
    fn read(&mut self) -> SensorReading {
        self.reads += 1;
        self.reading
    }
}

/// Mock relay output.
///
/// Records the current level and counts writes so tests can check that the
/// relay is energized exactly once per accepted command.
///
/// # Example
///
/// ```rust
/// use garage_doors::hal::MockRelay;
/// use garage_doors::traits::RelayOutput;
///
/// let mut relay = MockRelay::new();
/// relay.energize();
/// relay.release();
/// relay.release();
///
/// assert!(!relay.is_active());
/// assert_eq!(relay.writes, 3);
/// assert_eq!(relay.activations, 1);
/// ```
#[derive(Debug, Default)]
pub struct MockRelay {
    /// Current relay level.
    pub active: bool,
    /// Number of `set_active` calls.
    pub writes: usize,
    /// Number of `set_active(true)` calls.
    pub activations: usize,
}

impl MockRelay {
    /// Creates a released mock relay.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RelayOutput for MockRelay {
    fn set_active(&mut self, active: bool) {
        self.active = active;
        self.writes += 1;
        if active {
            self.activations += 1;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
/// Settable through a shared reference, so it can be moved into a
/// `SharedGarageState` and still be driven from the test.
///
/// # Example
///
/// ```rust
/// use garage_doors::hal::MockClock;
/// use garage_doors::traits::Clock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug)]
pub struct MockClock {
    current_ms: Cell<u64>,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self {
            current_ms: Cell::new(0),
        }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&self, ms: u64) {
        self.current_ms.set(ms);
    }

    /// Advances the clock by the given duration, wrapping like a hardware counter.
    pub fn advance(&self, ms: u64) {
        self.current_ms.set(self.current_ms.get().wrapping_add(ms));
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.get()
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

/// Mock MQTT client for testing.
///
/// Records all publish/subscribe operations and allows injecting
/// incoming messages for testing message handling.
///
/// # Example
///
/// ```rust
/// use garage_doors::hal::MockMqtt;
/// use garage_doors::traits::MqttClient;
///
/// let mut mqtt = MockMqtt::new();
///
/// // Queue incoming message
/// mqtt.queue_message("GarageDoors/garage_door_1/command", b"0".to_vec());
/// assert!(mqtt.try_recv().is_some());
///
/// mqtt.publish("GarageDoors/garage_door_1/state", b"opening", true).unwrap();
/// assert_eq!(mqtt.published_to("GarageDoors/garage_door_1/state").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Topics that have been subscribed to.
    pub subscriptions: Vec<String>,
    /// Queue of incoming messages to be returned by `try_recv()`.
    pub incoming: Vec<MqttMessage>,
    /// Whether the client is connected.
    pub connected: bool,
    /// Make every `publish` fail.
    pub fail_publish: bool,
}

impl MockMqtt {
    /// Creates a new mock MQTT client in connected state.
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Queue an incoming message
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push(MqttMessage::new(topic, payload));
    }

    /// Check if a topic was subscribed to
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }

    /// Get published messages for a topic
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, bool)> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .collect()
    }

    /// Payload of the most recent publish to `topic`.
    pub fn last_payload(&self, topic: &str) -> Option<&[u8]> {
        self.published
            .iter()
            .rev()
            .find(|(t, _, _)| t == topic)
            .map(|(_, payload, _)| payload.as_slice())
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ()> {
        if self.fail_publish || !self.connected {
            return Err(());
        }
        self.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ()> {
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        if self.incoming.is_empty() {
            None
        } else {
            Some(self.incoming.remove(0))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ============================================================================
// Storage Mocks
// ============================================================================

/// In-memory settings store.
///
/// # Example
///
/// ```rust
/// use garage_doors::hal::MockSettingsStore;
/// use garage_doors::traits::SettingsStore;
///
/// let mut store = MockSettingsStore::new();
/// let mut buf = [0u8; 16];
/// assert_eq!(store.load(&mut buf), Ok(None));
///
/// store.save(b"{}").unwrap();
/// assert_eq!(store.load(&mut buf), Ok(Some(2)));
/// ```
#[derive(Debug, Default)]
pub struct MockSettingsStore {
    /// Stored blob, if any.
    pub contents: Option<Vec<u8>>,
    /// Make every `save` fail.
    pub fail_writes: bool,
    /// Number of successful saves.
    pub saves: usize,
}

impl MockSettingsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `data`.
    pub fn with_contents(data: &[u8]) -> Self {
        Self {
            contents: Some(data.to_vec()),
            ..Default::default()
        }
    }
}

impl SettingsStore for MockSettingsStore {
    type Error = ();

    fn load(&mut self, buf: &mut [u8]) -> Result<Option<usize>, ()> {
        match &self.contents {
            None => Ok(None),
            Some(data) if data.len() > buf.len() => Err(()),
            Some(data) => {
                buf[..data.len()].copy_from_slice(data);
                Ok(Some(data.len()))
            }
        }
    }

    fn save(&mut self, data: &[u8]) -> Result<(), ()> {
        if self.fail_writes {
            return Err(());
        }
        self.contents = Some(data.to_vec());
        self.saves += 1;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
