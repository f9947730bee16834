//! Network abstraction traits for the MQTT message bus.
//!
//! The door controller is driven remotely over MQTT, usually from a home
//! automation system such as Home Assistant:
//!
//! ```text
//! GarageDoors/garage_door_1/command  - "0" opens, "1" closes
//! GarageDoors/garage_door_1/state    - open / closed / opening / closing
//! GarageDoors/garage_door_2/command
//! GarageDoors/garage_door_2/state
//! GarageDoors/reset                  - restart the device
//! ```
//!
//! See [`crate::messages`] for topic construction and payload codecs.

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

// ============================================================================
// MQTT Client Trait (Sync-First Design)
// ============================================================================

/// MQTT client trait for pub/sub messaging.
///
/// This trait uses a **sync-first design** that works on both ESP32 (blocking I/O)
/// and desktop test doubles.
///
/// # Implementation Notes
///
/// - `publish` and `subscribe` are synchronous (blocking on ESP32)
/// - `try_recv` is non-blocking for polling from the control loop
/// - The client should handle reconnection internally
///
/// # Example
///
/// ```rust,ignore
/// use garage_doors::traits::MqttClient;
///
/// fn announce<M: MqttClient>(client: &mut M) {
///     client.publish("GarageDoors/garage_door_1/state", b"closed", true).unwrap();
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error;

    /// Publish a message to a topic (blocking).
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `retain`: If true, broker keeps message for new subscribers
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Subscribe to a topic (blocking).
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Try to receive the next message (non-blocking).
    ///
    /// Returns `None` if no message is available. This should never block.
    fn try_recv(&mut self) -> Option<MqttMessage>;

    /// Check if connected to broker.
    fn is_connected(&self) -> bool;
}

/// An MQTT message received from a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Create a new MQTT message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}

// ============================================================================
// Settings Storage Trait
// ============================================================================

/// Non-volatile storage for the device settings document.
///
/// Stores one opaque blob (the JSON settings document). On ESP32 this is an
/// NVS key; tests use [`MockSettingsStore`](crate::hal::MockSettingsStore).
pub trait SettingsStore {
    /// Error type for storage operations.
    type Error;

    /// Read the stored blob into `buf`.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet, otherwise the
    /// number of bytes written into `buf`.
    fn load(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;

    /// Replace the stored blob.
    fn save(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}
