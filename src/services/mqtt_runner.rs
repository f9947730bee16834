//! MQTT service runner for unified polling across platforms.
//!
//! Works with any implementation of the [`MqttClient`] trait: the ESP-IDF
//! client on the device, [`MockMqtt`](crate::hal::MockMqtt) in tests.
//!
//! # Example
//!
//! ```ignore
//! use garage_doors::messages::Topics;
//! use garage_doors::services::{MqttServiceRunner, SharedGarageState};
//!
//! let state = Arc::new(SharedGarageState::new(controller));
//! let mut runner = MqttServiceRunner::new(state, mqtt_client, Topics::new("GarageDoors"));
//! runner.subscribe_topics()?;
//!
//! // In main loop:
//! let polled = runner.poll();        // Queue incoming commands
//! runner.tick_and_publish();         // Tick and publish due states
//! if polled.reset_requested {
//!     restart();
//! }
//! ```

use core::fmt::Debug;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::garage::TickReport;
use crate::messages::{state_payload, Inbound, InboundError, Topics};
use crate::traits::{Clock, DoorSensor, MqttClient, RelayOutput};

use super::shared::{InstantClock, SharedGarageState};

/// What one [`MqttServiceRunner::poll`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Commands queued for the next tick.
    pub queued: usize,
    /// Messages discarded (unknown topic, bad payload, full queue).
    pub discarded: usize,
    /// A message on the reset topic arrived.
    pub reset_requested: bool,
}

/// Bridges an [`MqttClient`] to the shared garage controller.
///
/// `K` is the controller's time base; see [`SharedGarageState`].
pub struct MqttServiceRunner<S, R, C, K = InstantClock>
where
    S: DoorSensor,
    R: RelayOutput,
    C: MqttClient,
    K: Clock,
{
    state: Arc<SharedGarageState<S, R, K>>,
    client: C,
    topics: Topics,
}

impl<S, R, C, K> MqttServiceRunner<S, R, C, K>
where
    S: DoorSensor,
    R: RelayOutput,
    C: MqttClient,
    C::Error: Debug,
    K: Clock,
{
    /// Create a new MQTT service runner.
    pub fn new(state: Arc<SharedGarageState<S, R, K>>, client: C, topics: Topics) -> Self {
        Self {
            state,
            client,
            topics,
        }
    }

    /// Get a reference to the MQTT client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Get a mutable reference to the MQTT client.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Topic layout in use.
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Subscribe to both command topics and the reset topic.
    pub fn subscribe_topics(&mut self) -> Result<(), C::Error> {
        for topic in self.topics.subscriptions() {
            self.client.subscribe(&topic)?;
            info!("mqtt: subscribed to {}", topic);
        }
        Ok(())
    }

    /// Drain incoming messages, queueing decoded commands.
    pub fn poll(&mut self) -> PollSummary {
        let mut summary = PollSummary::default();
        while let Some(msg) = self.client.try_recv() {
            match self.topics.decode(&msg.topic, &msg.payload) {
                Ok(Inbound::Command(door, cmd)) => {
                    if self.state.submit(door, cmd) {
                        summary.queued += 1;
                    } else {
                        summary.discarded += 1;
                    }
                }
                Ok(Inbound::Reset) => {
                    info!("mqtt: reset requested");
                    summary.reset_requested = true;
                }
                Err(InboundError::UnknownTopic) => {
                    debug!("mqtt: ignoring message on {}", msg.topic);
                    summary.discarded += 1;
                }
                Err(e @ InboundError::MalformedPayload(_)) => {
                    warn!("mqtt: {}: {:?}", e, msg.payload);
                    summary.discarded += 1;
                }
            }
        }
        summary
    }

    /// Publish every state the report marks as due. Returns how many went out.
    ///
    /// Failures are logged and dropped; the next change or heartbeat
    /// republishes.
    pub fn publish_report(&mut self, report: &TickReport) -> usize {
        let mut sent = 0;
        for (door, door_state) in report.publish.iter() {
            let topic = self.topics.state(*door);
            match self.client.publish(&topic, state_payload(*door_state), true) {
                Ok(()) => {
                    debug!("mqtt: {} <- {}", topic, door_state);
                    sent += 1;
                }
                Err(e) => warn!("mqtt: publish to {} failed: {:?}", topic, e),
            }
        }
        sent
    }

    /// Tick the controller at the shared time base and publish the result.
    pub fn tick_and_publish(&mut self) -> TickReport {
        let report = self.state.tick();
        self.publish_report(&report);
        report
    }

    /// [`tick_and_publish`](Self::tick_and_publish) at an explicit time.
    pub fn tick_and_publish_at(&mut self, now_ms: u64) -> TickReport {
        let report = self.state.tick_at(now_ms);
        self.publish_report(&report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::hal::{MockClock, MockMqtt, MockRelay, MockSensor};
    use crate::traits::SensorReading;
    use crate::{DoorCommand, DoorId, DoorState, GarageController};

    type Runner = MqttServiceRunner<MockSensor, MockRelay, MockMqtt>;

    fn setup() -> (Arc<SharedGarageState<MockSensor, MockRelay>>, Runner) {
        let controller = GarageController::new(
            [
                MockSensor::new(SensorReading::Closed),
                MockSensor::new(SensorReading::Open),
            ],
            [MockRelay::new(), MockRelay::new()],
            TimingConfig::default(),
        );
        let state = Arc::new(SharedGarageState::new(controller));
        let runner = MqttServiceRunner::new(state.clone(), MockMqtt::new(), Topics::new("GarageDoors"));
        (state, runner)
    }

    #[test]
    fn subscribes_commands_and_reset() {
        let (_, mut runner) = setup();
        runner.subscribe_topics().unwrap();

        let client = runner.client();
        assert!(client.is_subscribed("GarageDoors/garage_door_1/command"));
        assert!(client.is_subscribed("GarageDoors/garage_door_2/command"));
        assert!(client.is_subscribed("GarageDoors/reset"));
        assert_eq!(client.subscriptions.len(), 3);
    }

    #[test]
    fn first_tick_publishes_retained_states() {
        let (_, mut runner) = setup();
        runner.tick_and_publish_at(0);

        let client = runner.client();
        let door1 = client.published_to("GarageDoors/garage_door_1/state");
        assert_eq!(door1.len(), 1);
        assert_eq!(door1[0].1, b"closed");
        assert!(door1[0].2, "state must be retained");
        assert_eq!(
            client.last_payload("GarageDoors/garage_door_2/state"),
            Some(&b"open"[..])
        );
    }

    #[test]
    fn command_round_trip() {
        let (state, mut runner) = setup();
        runner.tick_and_publish_at(0);

        runner
            .client_mut()
            .queue_message("GarageDoors/garage_door_1/command", b"0".to_vec());
        let summary = runner.poll();
        assert_eq!(summary.queued, 1);
        assert!(!summary.reset_requested);

        // Queued, not yet applied
        assert_eq!(state.states()[0], DoorState::Closed);

        runner.tick_and_publish_at(20);
        assert_eq!(state.states()[0], DoorState::Opening);
        assert_eq!(
            runner.client().last_payload("GarageDoors/garage_door_1/state"),
            Some(&b"opening"[..])
        );
    }

    #[test]
    fn malformed_and_foreign_messages_are_discarded() {
        let (state, mut runner) = setup();
        let mqtt = runner.client_mut();
        mqtt.queue_message("GarageDoors/garage_door_1/command", b"open".to_vec());
        mqtt.queue_message("GarageDoors/garage_door_2/command", b"10".to_vec());
        mqtt.queue_message("Other/garage_door_1/command", b"0".to_vec());
        mqtt.queue_message("GarageDoors/garage_door_1/state", b"0".to_vec());

        let summary = runner.poll();
        assert_eq!(summary.queued, 0);
        assert_eq!(summary.discarded, 4);

        runner.tick_and_publish_at(0);
        assert_eq!(state.states(), [DoorState::Closed, DoorState::Open]);
    }

    #[test]
    fn reset_is_surfaced() {
        let (_, mut runner) = setup();
        runner
            .client_mut()
            .queue_message("GarageDoors/reset", Vec::new());
        assert!(runner.poll().reset_requested);
        assert!(!runner.poll().reset_requested);
    }

    #[test]
    fn publish_failure_is_not_fatal() {
        let (state, mut runner) = setup();
        runner.client_mut().fail_publish = true;

        let report = runner.tick_and_publish_at(0);
        assert_eq!(report.publish.len(), 2);
        assert!(runner.client().published.is_empty());

        // Controller still ticks
        state.submit(DoorId::Door2, DoorCommand::Close);
        runner.tick_and_publish_at(20);
        assert_eq!(state.states()[1], DoorState::Closing);
    }

    #[test]
    fn heartbeat_follows_the_state_clock() {
        let controller = GarageController::new(
            [
                MockSensor::new(SensorReading::Closed),
                MockSensor::new(SensorReading::Closed),
            ],
            [MockRelay::new(), MockRelay::new()],
            TimingConfig::default(),
        );
        let state = Arc::new(SharedGarageState::with_clock(controller, MockClock::new()));
        let mut runner = MqttServiceRunner::new(state.clone(), MockMqtt::new(), Topics::new("GarageDoors"));

        runner.tick_and_publish();
        assert_eq!(runner.client().published.len(), 2);

        state.clock().set(100_000);
        assert!(runner.tick_and_publish().is_quiet());

        state.clock().advance(1);
        let report = runner.tick_and_publish();
        assert!(report.heartbeat);
        assert_eq!(runner.client().published.len(), 4);
    }
}
