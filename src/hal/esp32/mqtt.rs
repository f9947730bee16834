//! MQTT client for ESP32.
//!
//! Wraps the ESP-IDF MQTT client behind the [`MqttClient`] trait. The
//! ESP-IDF client reconnects on its own (every `reconnect_delay_ms`) and
//! incoming messages are forwarded from its event thread over a channel so
//! the control loop can poll them with `try_recv()`.
//!
//! # Example
//!
//! ```ignore
//! use garage_doors::hal::esp32::Esp32Mqtt;
//! use garage_doors::config::Config;
//! use garage_doors::traits::MqttClient;
//!
//! let config = Config::default();
//! let client_id = config.mqtt.client_id_for(&config.device, 0x1a2b);
//! let mut mqtt = Esp32Mqtt::new(&config.mqtt, &client_id)?;
//! mqtt.publish("GarageDoors/garage_door_1/state", b"closed", true)?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use log::{info, warn};

use crate::config::MqttConfig;
use crate::traits::{MqttClient, MqttMessage};

/// Error type for ESP32 MQTT operations.
#[derive(Debug)]
pub struct Esp32MqttError(pub String);

impl core::fmt::Display for Esp32MqttError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "MQTT error: {}", self.0)
    }
}

impl std::error::Error for Esp32MqttError {}

/// ESP-IDF backed MQTT client.
pub struct Esp32Mqtt {
    client: EspMqttClient<'static>,
    message_rx: Receiver<MqttMessage>,
    connected: Arc<AtomicBool>,
}

impl Esp32Mqtt {
    /// Create the client and start connecting to the broker.
    ///
    /// Subscriptions are made by the caller once connected; see
    /// `MqttServiceRunner::subscribe_topics`.
    pub fn new(config: &MqttConfig, client_id: &str) -> anyhow::Result<Self> {
        let broker_url = format!("mqtt://{}:{}", config.host.as_str(), config.port);

        let mqtt_config = MqttClientConfiguration {
            client_id: Some(client_id),
            keep_alive_interval: Some(Duration::from_secs(u64::from(config.keep_alive_secs))),
            reconnect_timeout: Some(Duration::from_millis(u64::from(config.reconnect_delay_ms))),
            username: config.has_auth().then(|| config.username.as_str()),
            password: config.has_auth().then(|| config.password.as_str()),
            ..Default::default()
        };

        let (message_tx, message_rx) = channel::<MqttMessage>();
        let connected = Arc::new(AtomicBool::new(false));

        let (client, mut connection) = EspMqttClient::new(&broker_url, &mqtt_config)?;

        let flag = connected.clone();
        thread::Builder::new()
            .stack_size(6 * 1024)
            .spawn(move || handle_mqtt_events(&mut connection, message_tx, &flag))?;

        info!("mqtt: connecting to {} as {}", broker_url, client_id);

        Ok(Self {
            client,
            message_rx,
            connected,
        })
    }
}

impl MqttClient for Esp32Mqtt {
    type Error = Esp32MqttError;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        let qos = if retain {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        self.client
            .publish(topic, qos, retain, payload)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        match self.message_rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.connected.store(false, Ordering::Relaxed);
                None
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

fn handle_mqtt_events(
    connection: &mut EspMqttConnection,
    message_tx: Sender<MqttMessage>,
    connected: &AtomicBool,
) {
    loop {
        match connection.next() {
            Err(e) => {
                warn!("mqtt: connection error: {:?}", e);
                connected.store(false, Ordering::Relaxed);
                thread::sleep(Duration::from_secs(1));
            }
            Ok(event) => match event.payload() {
                EventPayload::Connected(_) => {
                    info!("mqtt: connected");
                    connected.store(true, Ordering::Relaxed);
                }
                EventPayload::Disconnected => {
                    warn!("mqtt: disconnected");
                    connected.store(false, Ordering::Relaxed);
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => {
                    if message_tx
                        .send(MqttMessage::new(topic, data.to_vec()))
                        .is_err()
                    {
                        // Client dropped
                        return;
                    }
                }
                _ => {}
            },
        }
    }
}
