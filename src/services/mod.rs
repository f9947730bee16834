//! Services that connect the garage controller to the outside world.
//!
//! - `shared`: `SharedGarageState`, one controller behind a mutex with a
//!   single time base (any `std` build)
//! - `mqtt_runner`: sync, platform-agnostic runner over the
//!   [`MqttClient`](crate::traits::MqttClient) trait, used on ESP32
//! - `mqtt`: async `rumqttc` bridge for desktop hosts (`mqtt` feature)
//!
//! # Shared State Pattern
//!
//! The receive path and the tick loop share one controller:
//!
//! ```ignore
//! use std::sync::Arc;
//! use garage_doors::services::{MqttBridge, SharedGarageState};
//!
//! let state = Arc::new(SharedGarageState::new(controller));
//! let bridge = MqttBridge::new(Arc::clone(&state), runtime_config, timing);
//! ```

pub mod mqtt_runner;
pub mod shared;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use mqtt_runner::*;
pub use shared::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
