//! Desktop MQTT bridge with simulated doors.
//!
//! Runs the full controller against mock hardware and a real broker, so the
//! topic layout and timing can be exercised from any MQTT client:
//!
//! ```sh
//! mosquitto_sub -t 'GarageDoors/#' -v
//! mosquitto_pub -t GarageDoors/garage_door_1/command -m 0
//! ```
//!
//! The simulated doors take `TRAVEL_MS` to reach their stop once the relay
//! fires. Door 2 is "jammed" and never leaves its closed contact, which shows
//! the opening window falling back to `closed`.
//!
//! # Usage
//!
//! ```sh
//! cargo run --example desktop_bridge --features mqtt
//! MQTT_HOST=192.168.1.10 cargo run --example desktop_bridge --features mqtt
//! RUST_LOG=garage_doors=debug cargo run --example desktop_bridge --features mqtt
//! ```

use std::sync::Arc;
use std::time::Duration;

use garage_doors::hal::{MockRelay, MockSensor};
use garage_doors::services::{BridgeExit, MqttBridge, MqttRuntimeConfig, SharedGarageState};
use garage_doors::traits::SensorReading;
use garage_doors::{Config, DoorId, DoorState, GarageController, MqttConfig};
use tracing_subscriber::EnvFilter;

/// Time for a simulated door to move between stops.
const TRAVEL_MS: u64 = 4_000;

#[tokio::main]
async fn main() {
    // The crate logs through `log`; the subscriber forwards those records
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=================================");
    println!("  garage-doors desktop bridge");
    println!("=================================");
    println!();

    let host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".into());
    let config = Config::default().with_mqtt(MqttConfig::default().with_host(&host));

    let controller = GarageController::new(
        [
            MockSensor::new(SensorReading::Closed),
            MockSensor::new(SensorReading::Closed),
        ],
        [MockRelay::new(), MockRelay::new()],
        config.timing,
    );
    let state = Arc::new(SharedGarageState::new(controller));

    let suffix = (std::process::id() & 0xffff) as u16;
    let runtime = MqttRuntimeConfig::from_config(&config, suffix);

    println!("Broker:   {}:{}", runtime.host, runtime.port);
    println!("Client:   {}", runtime.client_id);
    println!("Commands: {}/garage_door_N/command (0 = open, 1 = close)", runtime.monitor_name);
    println!("Reset:    {}/reset", runtime.monitor_name);
    println!();
    println!("Press Ctrl+C to stop.");
    println!();

    tokio::spawn(simulate_doors(Arc::clone(&state)));

    let bridge = MqttBridge::new(state, runtime, config.timing);
    tokio::select! {
        exit = bridge.run() => match exit {
            BridgeExit::ResetRequested => println!("Reset requested, exiting."),
        },
        _ = tokio::signal::ctrl_c() => println!("\nShutting down..."),
    }
}

/// Move door 1's contact once it has been travelling for `TRAVEL_MS`.
async fn simulate_doors(state: Arc<SharedGarageState<MockSensor, MockRelay>>) {
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    loop {
        interval.tick().await;
        let now = state.now_ms();
        state.with_controller(|garage| {
            let door = garage.door_mut(DoorId::Door1);
            if door.runtime().since_command(now) < TRAVEL_MS {
                return;
            }
            match door.state() {
                DoorState::Opening => door.sensor_mut().set(SensorReading::Open),
                DoorState::Closing => door.sensor_mut().set(SensorReading::Closed),
                _ => {}
            }
        });
    }
}
