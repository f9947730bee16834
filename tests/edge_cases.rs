//! Edge case tests: clock wraparound, malformed input, timing bounds.

use garage_doors::{
    hal::{MockMqtt, MockRelay, MockSensor},
    reconcile,
    services::{MqttServiceRunner, SharedGarageState},
    traits::{RelayOutput, SensorReading},
    DoorCommand, DoorId, DoorState, GarageController, Inbound, InboundError, TimingConfig, Topics,
};
use proptest::prelude::*;
use std::sync::Arc;

fn garage(door1: SensorReading, door2: SensorReading) -> GarageController<MockSensor, MockRelay> {
    GarageController::new(
        [MockSensor::new(door1), MockSensor::new(door2)],
        [MockRelay::new(), MockRelay::new()],
        TimingConfig::default(),
    )
}

// ============================================================================
// Clock Wraparound
// ============================================================================

#[test]
fn relay_pulse_across_clock_wrap() {
    let mut garage = garage(SensorReading::Closed, SensorReading::Closed);
    let start = u64::MAX - 500;

    garage.apply_command(DoorId::Door1, DoorCommand::Open, start);
    garage.tick(start);
    assert!(garage.door(DoorId::Door1).relay().is_active());

    garage.tick(start.wrapping_add(999));
    assert!(garage.door(DoorId::Door1).relay().is_active());

    garage.tick(start.wrapping_add(1_000));
    assert!(!garage.door(DoorId::Door1).relay().is_active());
}

#[test]
fn motion_window_across_clock_wrap() {
    let mut garage = garage(SensorReading::Open, SensorReading::Closed);
    let start = u64::MAX - 10_000;

    // Adopt the open contact before commanding
    garage.tick(start.wrapping_sub(20));
    assert_eq!(garage.state(DoorId::Door1), DoorState::Open);

    assert!(garage.apply_command(DoorId::Door1, DoorCommand::Close, start).is_accepted());
    garage.tick(start);
    assert_eq!(garage.state(DoorId::Door1), DoorState::Closing);

    garage.tick(start.wrapping_add(29_999));
    assert_eq!(garage.state(DoorId::Door1), DoorState::Closing);

    garage.tick(start.wrapping_add(30_000));
    assert_eq!(garage.state(DoorId::Door1), DoorState::Open);
}

#[test]
fn first_tick_at_late_clock_publishes_once() {
    let mut garage = garage(SensorReading::Closed, SensorReading::Closed);
    let report = garage.tick(5_000_000);
    assert_eq!(report.publish.len(), 2);
    assert!(report.heartbeat);

    assert!(garage.tick(5_000_020).is_quiet());
}

// ============================================================================
// Malformed Input
// ============================================================================

#[test]
fn command_payloads_must_be_exact() {
    let topics = Topics::new("GarageDoors");
    let topic = "GarageDoors/garage_door_1/command";

    for bad in [&b""[..], b" 0", b"0\n", b"00", b"2", b"open", b"true", b"\x00"] {
        assert_eq!(
            topics.decode(topic, bad),
            Err(InboundError::MalformedPayload(DoorId::Door1)),
            "payload {:?}",
            bad
        );
    }
    assert_eq!(
        topics.decode(topic, b"0"),
        Ok(Inbound::Command(DoorId::Door1, DoorCommand::Open))
    );
}

#[test]
fn near_miss_topics_are_unknown() {
    let topics = Topics::new("GarageDoors");
    for topic in [
        "GarageDoors/garage_door_3/command",
        "GarageDoors/garage_door_1/commands",
        "GarageDoors/garage_door_1",
        "GarageDoors/garage_door_1/command/extra",
        "garagedoors/garage_door_1/command",
        "GarageDoorsX/reset",
        "GarageDoors",
        "",
    ] {
        assert_eq!(
            topics.decode(topic, b"0"),
            Err(InboundError::UnknownTopic),
            "topic {:?}",
            topic
        );
    }
}

#[test]
fn reset_accepts_any_payload() {
    let topics = Topics::new("GarageDoors");
    assert_eq!(topics.decode("GarageDoors/reset", b""), Ok(Inbound::Reset));
    assert_eq!(topics.decode("GarageDoors/reset", b"now"), Ok(Inbound::Reset));
}

#[test]
fn command_flood_is_bounded() {
    let state = Arc::new(SharedGarageState::new(garage(
        SensorReading::Closed,
        SensorReading::Closed,
    )));
    let mut runner = MqttServiceRunner::new(Arc::clone(&state), MockMqtt::new(), Topics::new("GarageDoors"));

    for _ in 0..50 {
        runner
            .client_mut()
            .queue_message("GarageDoors/garage_door_2/command", b"0".to_vec());
    }
    let summary = runner.poll();
    assert_eq!(summary.queued, garage_doors::COMMAND_QUEUE_CAPACITY);
    assert_eq!(summary.discarded, 50 - garage_doors::COMMAND_QUEUE_CAPACITY);

    let report = runner.tick_and_publish_at(0);
    assert_eq!(report.accepted, 1);
    assert_eq!(state.states()[1], DoorState::Opening);
    state.with_controller(|c| assert_eq!(c.pending_commands(), 0));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// The relay is closed exactly for the pulse window after an accepted
    /// command, whatever the tick cadence and sensor noise.
    #[test]
    fn relay_active_only_inside_pulse(
        steps in prop::collection::vec((1u64..400, any::<bool>()), 1..40),
    ) {
        let mut garage = garage(SensorReading::Closed, SensorReading::Closed);
        garage.submit(DoorId::Door1, DoorCommand::Open);
        garage.tick(0);
        prop_assert!(garage.door(DoorId::Door1).relay().is_active());

        let mut now = 0u64;
        for (dt, open) in steps {
            now += dt;
            let reading = if open { SensorReading::Open } else { SensorReading::Closed };
            garage.door_mut(DoorId::Door1).sensor_mut().set(reading);
            garage.tick(now);
            prop_assert_eq!(garage.door(DoorId::Door1).relay().is_active(), now < 1_000);
        }
        prop_assert_eq!(garage.door(DoorId::Door1).relay().activations, 1);
    }

    /// Outside its window a moving state never survives a disagreeing reading.
    #[test]
    fn motion_never_outlives_window(since in 0u64..200_000, open in any::<bool>()) {
        let timing = TimingConfig::default();
        let reading = if open { SensorReading::Open } else { SensorReading::Closed };

        let opening = reconcile(DoorState::Opening, reading, since, &timing);
        if since >= u64::from(timing.opening_window_ms) {
            prop_assert!(!opening.is_moving());
        }
        let closing = reconcile(DoorState::Closing, reading, since, &timing);
        if since >= u64::from(timing.closing_window_ms) {
            prop_assert!(!closing.is_moving());
        }
    }

    /// Only the two exact one-byte payloads decode to commands.
    #[test]
    fn arbitrary_payloads_decode_strictly(payload in prop::collection::vec(any::<u8>(), 0..4)) {
        let decoded = DoorCommand::from_payload(&payload);
        match payload.as_slice() {
            b"0" => prop_assert_eq!(decoded, Some(DoorCommand::Open)),
            b"1" => prop_assert_eq!(decoded, Some(DoorCommand::Close)),
            _ => prop_assert_eq!(decoded, None),
        }
    }
}
