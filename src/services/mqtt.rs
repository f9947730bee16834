//! Async MQTT bridge for desktop hosts, built on `rumqttc` and `tokio`.
//!
//! **Subscribe Topics:**
//! - `<monitor>/garage_door_1/command`, `<monitor>/garage_door_2/command` - `0` open, `1` close
//! - `<monitor>/reset` - stop the bridge (any payload)
//!
//! **Publish Topics:**
//! - `<monitor>/garage_door_1/state`, `<monitor>/garage_door_2/state` - retained door state
//!
//! The bridge runs two tasks sharing one [`SharedGarageState`]: the event
//! loop, which queues decoded commands, and a tick task, which runs the
//! controller every `tick_interval_ms` and publishes whatever the tick marks
//! as due.
//!
//! ```ignore
//! let state = Arc::new(SharedGarageState::new(controller));
//! let bridge = MqttBridge::new(state, MqttRuntimeConfig::from_config(&config, 0x1a2b), config.timing);
//! bridge.run().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};

use crate::config::{Config, TimingConfig};
use crate::garage::TickReport;
use crate::messages::{state_payload, Inbound, InboundError, Topics};
use crate::traits::{DoorSensor, RelayOutput};

use super::shared::SharedGarageState;

// ============================================================================
// Configuration
// ============================================================================

/// Runtime MQTT client configuration for `rumqttc`.
///
/// Uses `String` for `rumqttc`; build it from the fixed-size
/// [`Config`] with [`MqttRuntimeConfig::from_config`].
#[derive(Debug, Clone)]
pub struct MqttRuntimeConfig {
    /// MQTT broker hostname
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// Client ID
    pub client_id: String,
    /// Topic root (the monitor name)
    pub monitor_name: String,
    /// Username (empty = no auth)
    pub username: String,
    /// Password
    pub password: String,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Delay before polling again after a connection error
    pub reconnect_delay_ms: u64,
}

impl Default for MqttRuntimeConfig {
    fn default() -> Self {
        Self::from_config(&Config::default(), 0)
    }
}

impl MqttRuntimeConfig {
    /// Create a config for the given broker address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create from the shared [`Config`]; `suffix` seeds a derived client ID.
    pub fn from_config(config: &Config, suffix: u16) -> Self {
        Self {
            host: config.mqtt.host.as_str().to_string(),
            port: config.mqtt.port,
            client_id: config.mqtt.client_id_for(&config.device, suffix).as_str().to_string(),
            monitor_name: config.device.monitor_name.as_str().to_string(),
            username: config.mqtt.username.as_str().to_string(),
            password: config.mqtt.password.as_str().to_string(),
            keep_alive_secs: config.mqtt.keep_alive_secs,
            reconnect_delay_ms: u64::from(config.mqtt.reconnect_delay_ms),
        }
    }

    /// Set the client ID
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set the topic root
    pub fn monitor_name(mut self, name: impl Into<String>) -> Self {
        self.monitor_name = name.into();
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs)));
        if !self.username.is_empty() {
            options.set_credentials(&self.username, &self.password);
        }
        options
    }
}

// ============================================================================
// Errors
// ============================================================================

/// MQTT-related errors
#[derive(Debug)]
pub enum MqttError {
    /// Failed to subscribe to topic
    Subscribe(String),
    /// Failed to publish message
    Publish(String),
}

impl core::fmt::Display for MqttError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Subscribe(e) => write!(f, "MQTT subscribe failed: {}", e),
            Self::Publish(e) => write!(f, "MQTT publish failed: {}", e),
        }
    }
}

impl std::error::Error for MqttError {}

// ============================================================================
// Bridge
// ============================================================================

/// Why [`MqttBridge::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeExit {
    /// A message arrived on the reset topic.
    ResetRequested,
}

/// Bridges MQTT to a shared garage controller.
pub struct MqttBridge<S: DoorSensor, R: RelayOutput> {
    state: Arc<SharedGarageState<S, R>>,
    config: MqttRuntimeConfig,
    topics: Topics,
    tick_interval: Duration,
}

impl<S, R> MqttBridge<S, R>
where
    S: DoorSensor + Send + 'static,
    R: RelayOutput + Send + 'static,
{
    /// Create a bridge over `state`.
    pub fn new(state: Arc<SharedGarageState<S, R>>, config: MqttRuntimeConfig, timing: TimingConfig) -> Self {
        let topics = Topics::new(&config.monitor_name);
        Self {
            state,
            config,
            topics,
            tick_interval: Duration::from_millis(u64::from(timing.tick_interval_ms.max(1))),
        }
    }

    /// Get a reference to the shared state.
    pub fn state(&self) -> Arc<SharedGarageState<S, R>> {
        Arc::clone(&self.state)
    }

    /// Topic layout in use.
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Run until a reset is requested.
    ///
    /// Connection errors are logged and retried after `reconnect_delay_ms`;
    /// subscriptions are renewed on every (re)connect.
    pub async fn run(self) -> BridgeExit {
        let (client, mut eventloop) = AsyncClient::new(self.config.options(), 10);

        info!(
            "mqtt: connecting to {}:{} as {}",
            self.config.host, self.config.port, self.config.client_id
        );

        let ticker = tokio::spawn(tick_loop(
            Arc::clone(&self.state),
            client.clone(),
            self.topics.clone(),
            self.tick_interval,
        ));

        let exit = loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("mqtt: connected");
                    if let Err(e) = subscribe_all(&client, &self.topics) {
                        warn!("{}", e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if let Some(exit) = self.handle_message(&publish.topic, &publish.payload) {
                        break exit;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("mqtt: connection error: {:?}", e);
                    tokio::time::sleep(Duration::from_millis(self.config.reconnect_delay_ms)).await;
                }
            }
        };

        ticker.abort();
        let _ = client.try_disconnect();
        exit
    }

    /// Decode one incoming message and queue its command.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) -> Option<BridgeExit> {
        match self.topics.decode(topic, payload) {
            Ok(Inbound::Command(door, cmd)) => {
                self.state.submit(door, cmd);
                None
            }
            Ok(Inbound::Reset) => {
                info!("mqtt: reset requested");
                Some(BridgeExit::ResetRequested)
            }
            Err(InboundError::UnknownTopic) => {
                debug!("mqtt: ignoring message on {}", topic);
                None
            }
            Err(e @ InboundError::MalformedPayload(_)) => {
                warn!("mqtt: {}: {:?}", e, payload);
                None
            }
        }
    }
}

fn subscribe_all(client: &AsyncClient, topics: &Topics) -> Result<(), MqttError> {
    for topic in topics.subscriptions() {
        client
            .try_subscribe(topic.as_str(), QoS::AtLeastOnce)
            .map_err(|e| MqttError::Subscribe(e.to_string()))?;
        info!("mqtt: subscribed to {}", topic);
    }
    Ok(())
}

/// Publish the door states a tick marked as due.
pub async fn publish_report(
    client: &AsyncClient,
    topics: &Topics,
    report: &TickReport,
) -> Result<usize, MqttError> {
    for (door, door_state) in report.publish.iter() {
        client
            .publish(
                topics.state(*door).as_str(),
                QoS::AtLeastOnce,
                true,
                state_payload(*door_state),
            )
            .await
            .map_err(|e| MqttError::Publish(e.to_string()))?;
    }
    Ok(report.publish.len())
}

async fn tick_loop<S, R>(
    state: Arc<SharedGarageState<S, R>>,
    client: AsyncClient,
    topics: Topics,
    period: Duration,
) where
    S: DoorSensor,
    R: RelayOutput,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let report = state.tick();
        if report.is_quiet() {
            continue;
        }
        if let Err(e) = publish_report(&client, &topics, &report).await {
            warn!("{}", e);
        }
    }
}
