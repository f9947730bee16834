//! Dual-door orchestration and publish throttling.
//!
//! [`GarageController`] is the top-level controller. It owns both
//! [`DoorController`]s, a queue of commands received between ticks, and the
//! [`PublishThrottle`] that decides which door states go out on the bus.
//!
//! # Tick Order
//!
//! 1. Drain queued commands, so a command never interleaves with a tick
//! 2. Door 1 then door 2: relay pulse, sensor sample, reconciliation
//! 3. Publish decision for both doors
//! 4. Heartbeat timer reset, once, if it fired
//!
//! # Example
//!
//! ```rust
//! use garage_doors::{DoorCommand, DoorId, DoorState, GarageController, TimingConfig};
//! use garage_doors::hal::{MockRelay, MockSensor};
//! use garage_doors::traits::SensorReading;
//!
//! let mut garage = GarageController::new(
//!     [MockSensor::new(SensorReading::Closed), MockSensor::new(SensorReading::Closed)],
//!     [MockRelay::new(), MockRelay::new()],
//!     TimingConfig::default(),
//! );
//!
//! // First tick announces both doors
//! let report = garage.tick(0);
//! assert_eq!(report.publish.len(), 2);
//!
//! garage.submit(DoorId::Door2, DoorCommand::Open);
//! let report = garage.tick(20);
//! assert_eq!(garage.state(DoorId::Door2), DoorState::Opening);
//! assert_eq!(report.publish.as_slice(), &[(DoorId::Door2, DoorState::Opening)]);
//! ```

use heapless::Vec;
use log::{debug, info, warn};

use crate::commands::{CommandOutcome, CommandQueue, DoorCommand};
use crate::config::TimingConfig;
use crate::door::{DoorController, DoorId, DoorState, DoorUpdate, DOOR_COUNT};
use crate::traits::{elapsed_ms, DoorSensor, RelayOutput};

/// Commands that can wait for the next tick.
pub const COMMAND_QUEUE_CAPACITY: usize = 8;

// ============================================================================
// Publish Throttle
// ============================================================================

/// Shared heartbeat timer for both doors.
///
/// A door state is published when it differs from the last published value
/// for that door, or when the heartbeat is due. The heartbeat is global and
/// resets once per tick after both doors were considered, so both doors are
/// re-announced together.
///
/// The timer starts at 0 and only resets when a heartbeat fires; publishing
/// a changed state does not push the heartbeat back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublishThrottle {
    max_interval_ms: u64,
    last_heartbeat_ms: u64,
}

impl PublishThrottle {
    /// Throttle with the given heartbeat interval.
    pub fn new(max_interval_ms: u32) -> Self {
        Self {
            max_interval_ms: u64::from(max_interval_ms),
            last_heartbeat_ms: 0,
        }
    }

    /// True if strictly more than the interval has passed since the last heartbeat.
    pub fn heartbeat_due(&self, now_ms: u64) -> bool {
        elapsed_ms(now_ms, self.last_heartbeat_ms) > self.max_interval_ms
    }

    /// Restart the heartbeat interval at `now_ms`.
    pub fn mark_heartbeat(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = now_ms;
    }

    /// Clock reading of the last heartbeat.
    pub fn last_heartbeat_ms(&self) -> u64 {
        self.last_heartbeat_ms
    }

    /// Whether `state` must be published given what was last published.
    pub fn should_publish(last: Option<DoorState>, state: DoorState, heartbeat: bool) -> bool {
        heartbeat || last != Some(state)
    }
}

// ============================================================================
// Tick Report
// ============================================================================

/// Everything that happened during one [`GarageController::tick`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// Door states to hand to the publisher, in door order.
    pub publish: Vec<(DoorId, DoorState), DOOR_COUNT>,
    /// Whether this tick was a heartbeat.
    pub heartbeat: bool,
    /// Per-door reconciliation results, in door order.
    pub updates: [DoorUpdate; DOOR_COUNT],
    /// Commands accepted from the queue at the start of this tick.
    pub accepted: usize,
}

impl TickReport {
    /// True if nothing needs publishing.
    pub fn is_quiet(&self) -> bool {
        self.publish.is_empty()
    }
}

// ============================================================================
// Garage Controller
// ============================================================================

/// Controller for both doors.
///
/// Not thread-safe by itself. Asynchronous producers should go through
/// [`submit`](Self::submit) (or `SharedGarageState` in the services module)
/// so commands are applied at the start of the next tick.
pub struct GarageController<S: DoorSensor, R: RelayOutput> {
    doors: [DoorController<S, R>; DOOR_COUNT],
    queue: CommandQueue<COMMAND_QUEUE_CAPACITY>,
    throttle: PublishThrottle,
}

impl<S: DoorSensor, R: RelayOutput> GarageController<S, R> {
    /// Create a controller from per-door sensors and relays, in door order.
    pub fn new(sensors: [S; 2], relays: [R; 2], timing: TimingConfig) -> Self {
        let [sensor1, sensor2] = sensors;
        let [relay1, relay2] = relays;
        Self {
            doors: [
                DoorController::new(DoorId::Door1, sensor1, relay1, timing),
                DoorController::new(DoorId::Door2, sensor2, relay2, timing),
            ],
            queue: CommandQueue::new(),
            throttle: PublishThrottle::new(timing.max_publish_interval_ms),
        }
    }

    /// Queue a command for the next tick. Returns `false` if the queue is full.
    pub fn submit(&mut self, door: DoorId, cmd: DoorCommand) -> bool {
        let queued = self.queue.push(door, cmd);
        if queued {
            debug!("{}: {:?} queued", door, cmd);
        } else {
            warn!("{}: command queue full, dropping {:?}", door, cmd);
        }
        queued
    }

    /// Apply a command immediately. For single-writer callers only.
    pub fn apply_command(&mut self, door: DoorId, cmd: DoorCommand, now_ms: u64) -> CommandOutcome {
        self.doors[door.index()].apply_command(cmd, now_ms)
    }

    /// Number of commands waiting for the next tick.
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Run one evaluation tick at `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let mut accepted = 0;
        while let Some(queued) = self.queue.pop() {
            if self.apply_command(queued.door, queued.command, now_ms).is_accepted() {
                accepted += 1;
            }
        }

        let [door1, door2] = &mut self.doors;
        let updates = [door1.update(now_ms), door2.update(now_ms)];

        let heartbeat = self.throttle.heartbeat_due(now_ms);
        let mut publish = Vec::new();
        for door in self.doors.iter_mut() {
            let state = door.state();
            if PublishThrottle::should_publish(door.runtime().last_published, state, heartbeat)
                && publish.push((door.id(), state)).is_ok()
            {
                door.mark_published(state);
            }
        }
        if heartbeat {
            info!("heartbeat at {}ms", now_ms);
            self.throttle.mark_heartbeat(now_ms);
        }

        TickReport {
            publish,
            heartbeat,
            updates,
            accepted,
        }
    }

    /// Current state of one door.
    pub fn state(&self, door: DoorId) -> DoorState {
        self.doors[door.index()].state()
    }

    /// Current states of both doors, in door order.
    pub fn states(&self) -> [DoorState; DOOR_COUNT] {
        [self.doors[0].state(), self.doors[1].state()]
    }

    /// One door's controller.
    pub fn door(&self, door: DoorId) -> &DoorController<S, R> {
        &self.doors[door.index()]
    }

    /// Mutable access to one door's controller.
    pub fn door_mut(&mut self, door: DoorId) -> &mut DoorController<S, R> {
        &mut self.doors[door.index()]
    }

    /// The publish throttle.
    pub fn throttle(&self) -> &PublishThrottle {
        &self.throttle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockRelay, MockSensor};
    use crate::traits::SensorReading;

    type Garage = GarageController<MockSensor, MockRelay>;

    fn garage() -> Garage {
        GarageController::new(
            [
                MockSensor::new(SensorReading::Closed),
                MockSensor::new(SensorReading::Closed),
            ],
            [MockRelay::new(), MockRelay::new()],
            TimingConfig::default(),
        )
    }

    #[test]
    fn throttle_strictly_greater() {
        let throttle = PublishThrottle::new(100_000);
        assert!(!throttle.heartbeat_due(100_000));
        assert!(throttle.heartbeat_due(100_001));
    }

    #[test]
    fn should_publish_rules() {
        assert!(PublishThrottle::should_publish(None, DoorState::Closed, false));
        assert!(!PublishThrottle::should_publish(
            Some(DoorState::Closed),
            DoorState::Closed,
            false
        ));
        assert!(PublishThrottle::should_publish(
            Some(DoorState::Closed),
            DoorState::Opening,
            false
        ));
        assert!(PublishThrottle::should_publish(
            Some(DoorState::Closed),
            DoorState::Closed,
            true
        ));
    }

    #[test]
    fn first_tick_publishes_both() {
        let mut g = garage();
        let report = g.tick(0);
        assert!(!report.heartbeat);
        assert_eq!(
            report.publish.as_slice(),
            &[
                (DoorId::Door1, DoorState::Closed),
                (DoorId::Door2, DoorState::Closed)
            ]
        );

        let report = g.tick(20);
        assert!(report.is_quiet());
    }

    #[test]
    fn queued_command_applied_at_tick_start() {
        let mut g = garage();
        g.tick(0);

        assert!(g.submit(DoorId::Door1, DoorCommand::Open));
        // Nothing happens until the tick
        assert_eq!(g.state(DoorId::Door1), DoorState::Closed);
        assert_eq!(g.pending_commands(), 1);

        let report = g.tick(40);
        assert_eq!(report.accepted, 1);
        assert_eq!(g.pending_commands(), 0);
        assert_eq!(g.state(DoorId::Door1), DoorState::Opening);
        assert_eq!(g.door(DoorId::Door1).runtime().last_command_ms, 40);
        assert!(g.door(DoorId::Door1).relay().is_active());
        assert!(!g.door(DoorId::Door2).relay().is_active());
    }

    #[test]
    fn queue_overflow_drops_newest() {
        let mut g = garage();
        for _ in 0..COMMAND_QUEUE_CAPACITY {
            assert!(g.submit(DoorId::Door2, DoorCommand::Close));
        }
        assert!(!g.submit(DoorId::Door1, DoorCommand::Open));

        let report = g.tick(0);
        // Close on a closed door is ignored every time
        assert_eq!(report.accepted, 0);
        assert_eq!(g.states(), [DoorState::Closed, DoorState::Closed]);
    }

    #[test]
    fn doors_are_independent() {
        let mut g = garage();
        g.tick(0);

        g.apply_command(DoorId::Door2, DoorCommand::Open, 100);
        let report = g.tick(120);
        assert_eq!(g.states(), [DoorState::Closed, DoorState::Opening]);
        assert_eq!(report.publish.as_slice(), &[(DoorId::Door2, DoorState::Opening)]);
    }

    #[test]
    fn heartbeat_republishes_both_once() {
        let mut g = garage();
        g.tick(0);

        let report = g.tick(100_000);
        assert!(!report.heartbeat);
        assert!(report.is_quiet());

        let report = g.tick(100_001);
        assert!(report.heartbeat);
        assert_eq!(report.publish.len(), 2);
        assert_eq!(g.throttle().last_heartbeat_ms(), 100_001);

        let report = g.tick(100_021);
        assert!(!report.heartbeat);
        assert!(report.is_quiet());
    }

    #[test]
    fn heartbeat_includes_changed_door_once() {
        let mut g = garage();
        g.tick(0);

        g.door_mut(DoorId::Door1).sensor_mut().set(SensorReading::Open);
        let report = g.tick(100_001);
        assert!(report.heartbeat);
        assert_eq!(
            report.publish.as_slice(),
            &[
                (DoorId::Door1, DoorState::Open),
                (DoorId::Door2, DoorState::Closed)
            ]
        );
    }

    #[test]
    fn publish_list_holds_every_door() {
        let mut g = garage();
        let report = g.tick(0);
        assert_eq!(report.publish.capacity(), DoorId::ALL.len());

        // Both doors change and the heartbeat fires on the same tick
        g.door_mut(DoorId::Door1).sensor_mut().set(SensorReading::Open);
        g.door_mut(DoorId::Door2).sensor_mut().set(SensorReading::Open);
        let report = g.tick(100_001);
        assert!(report.heartbeat);
        assert_eq!(report.publish.len(), DoorId::ALL.len());
        for door in DoorId::ALL {
            assert_eq!(g.door(door).runtime().last_published, Some(DoorState::Open));
        }
    }

    #[test]
    fn change_publish_does_not_reset_heartbeat() {
        let mut g = garage();
        g.tick(0);

        g.door_mut(DoorId::Door1).sensor_mut().set(SensorReading::Open);
        g.tick(60_000);
        assert_eq!(g.throttle().last_heartbeat_ms(), 0);

        let report = g.tick(100_001);
        assert!(report.heartbeat);
    }
}
