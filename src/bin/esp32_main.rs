//! ESP32-C3 SuperMini garage door controller.
//!
//! Main entry point for the physical controller. Every tick (20ms by
//! default) it:
//! - Drains MQTT commands into the controller queue (if enabled)
//! - Ticks both doors: commands, relay pulses, sensor reconciliation
//! - Publishes door states that changed or are due a heartbeat
//!
//! A message on `<monitor>/reset` restarts the chip.
//!
//! # Wiring
//!
//! | Function          | GPIO |
//! |-------------------|------|
//! | Door 1 relay      | 2    |
//! | Door 2 relay      | 3    |
//! | Door 1 reed switch| 4    |
//! | Door 2 reed switch| 5    |
//!
//! Reed switches close to ground when the door is down.
//!
//! # Build
//!
//! ```bash
//! # Doors only, no network
//! cargo build --release --features esp32 --bin esp32_main
//!
//! # With WiFi + MQTT
//! WIFI_SSID=... WIFI_PASSWORD=... MQTT_HOST=... \
//!   cargo build --release --features esp32-mqtt --bin esp32_main
//! ```

use std::thread;
use std::time::Duration;

use esp_idf_hal::gpio::{IOPin, OutputPin};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::log::EspLogger;
use garage_doors::hal::esp32::{DoorContact, DoorRelay, Esp32Clock, Esp32DoorSensor, Esp32Relay};
use garage_doors::services::SharedGarageState;
use garage_doors::{Config, GarageController};
use log::info;

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    info!("================================");
    info!("  garage-doors controller");
    info!("================================");

    // =========================================================================
    // Configuration
    // =========================================================================
    let defaults = Config::default()
        .with_wifi(
            garage_doors::WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_mqtt(
            garage_doors::MqttConfig::default()
                .with_host(option_env!("MQTT_HOST").unwrap_or("localhost")),
        );

    #[cfg(feature = "esp32-mqtt")]
    let nvs = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;

    #[cfg(feature = "esp32-mqtt")]
    let config = {
        use garage_doors::hal::esp32::NvsSettingsStore;

        match NvsSettingsStore::new(nvs.clone()) {
            Ok(mut store) => garage_doors::load_or_provision(&mut store, defaults),
            Err(e) => {
                log::warn!("settings: NVS unavailable ({:?}), using defaults", e);
                defaults
            }
        }
    };
    #[cfg(not(feature = "esp32-mqtt"))]
    let config = defaults;

    let tick_interval = Duration::from_millis(u64::from(config.timing.tick_interval_ms));

    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Doors (relays on GPIO2/3, reed switches on GPIO4/5)
    // =========================================================================
    // Downgraded so both doors share one driver type
    let relays: [DoorRelay<'_>; 2] = [
        Esp32Relay::new(peripherals.pins.gpio2.downgrade_output())?,
        Esp32Relay::new(peripherals.pins.gpio3.downgrade_output())?,
    ];
    let sensors: [DoorContact<'_>; 2] = [
        Esp32DoorSensor::new(peripherals.pins.gpio4.downgrade())?,
        Esp32DoorSensor::new(peripherals.pins.gpio5.downgrade())?,
    ];
    info!("doors: relays on GPIO2/3, sensors on GPIO4/5");

    let controller = GarageController::new(sensors, relays, config.timing);
    let state = std::sync::Arc::new(SharedGarageState::with_clock(controller, Esp32Clock::new()));

    // =========================================================================
    // WiFi + MQTT
    // =========================================================================
    #[cfg(feature = "esp32-mqtt")]
    let (mut wifi, mut runner) = {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use garage_doors::hal::esp32::{Esp32Mqtt, Esp32Wifi};
        use garage_doors::services::MqttServiceRunner;
        use garage_doors::Topics;

        let sysloop = EspSystemEventLoop::take()?;
        let wifi = Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &config.wifi)?;

        // SAFETY: esp_random has no preconditions once the RF subsystem is up.
        let suffix = unsafe { esp_idf_svc::sys::esp_random() } as u16;
        let client_id = config.mqtt.client_id_for(&config.device, suffix);
        info!(
            "mqtt: connecting to {}:{} as {}",
            config.mqtt.host, config.mqtt.port, client_id
        );

        let client = Esp32Mqtt::new(&config.mqtt, &client_id)?;
        let topics = Topics::new(&config.device.monitor_name);
        (wifi, MqttServiceRunner::new(state.clone(), client, topics))
    };

    #[cfg(feature = "esp32-mqtt")]
    let mut was_connected = false;

    info!("starting control loop ({}ms tick)", config.timing.tick_interval_ms);

    // =========================================================================
    // Main Control Loop
    // =========================================================================
    loop {
        #[cfg(feature = "esp32-mqtt")]
        {
            use garage_doors::traits::MqttClient;

            // The ESP-IDF client reconnects on its own but drops subscriptions
            let connected = runner.client().is_connected();

            // Reconnecting blocks, so only while no relay pulse can be running
            if !connected && !wifi.is_connected() {
                let idle = state.states().iter().all(|s| !s.is_moving());
                if idle {
                    match wifi.reconnect() {
                        Ok(()) => info!("wifi: reconnected, IP {:?}", wifi.ip_addr()),
                        Err(e) => log::warn!("wifi: reconnect failed: {:?}", e),
                    }
                }
            }

            if connected && !was_connected {
                info!("mqtt: connected, subscribing");
                if let Err(e) = runner.subscribe_topics() {
                    log::warn!("mqtt: subscribe failed: {}", e);
                }
            }
            was_connected = connected;

            let polled = runner.poll();
            if polled.reset_requested {
                info!("restarting on request");
                // SAFETY: esp_restart does not return.
                unsafe { esp_idf_svc::sys::esp_restart() };
            }
            runner.tick_and_publish();
        }

        #[cfg(not(feature = "esp32-mqtt"))]
        state.tick();

        thread::sleep(tick_interval);
    }
}
