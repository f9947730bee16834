//! Trait definitions for hardware and network abstraction.
//!
//! This module defines the seams that let the door logic:
//! - Run on different hardware (ESP32, desktop mock)
//! - Use different MQTT client implementations
//! - Persist settings to different storage back-ends
//!
//! # Submodules
//!
//! - `hardware`: Door sensor, relay output, clock
//! - `network`: MQTT client and settings storage traits
//!
//! # Hardware Abstraction
//!
//! - [`DoorSensor`]: Binary open/closed contact
//! - [`RelayOutput`]: Momentary relay wired to the door opener
//! - [`Clock`]: Monotonic millisecond time source

pub mod hardware;
pub mod network;

pub use hardware::*;
pub use network::*;
