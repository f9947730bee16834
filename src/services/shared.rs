//! Shared garage controller state for multi-task services.
//!
//! `SharedGarageState` wraps one [`GarageController`] in a mutex together with
//! a single [`Clock`], so the MQTT receive path and the tick loop see the same
//! time base and never interleave halfway through a tick. On desktop the clock
//! defaults to [`InstantClock`]; the firmware passes its hardware timer.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use garage_doors::services::SharedGarageState;
//! use garage_doors::hal::{MockRelay, MockSensor};
//! use garage_doors::traits::SensorReading;
//! use garage_doors::{DoorCommand, DoorId, GarageController, TimingConfig};
//!
//! let controller = GarageController::new(
//!     [MockSensor::new(SensorReading::Closed), MockSensor::new(SensorReading::Closed)],
//!     [MockRelay::new(), MockRelay::new()],
//!     TimingConfig::default(),
//! );
//! let state = Arc::new(SharedGarageState::new(controller));
//!
//! // Receive path
//! state.submit(DoorId::Door1, DoorCommand::Open);
//!
//! // Tick loop
//! let report = state.tick();
//! assert_eq!(report.accepted, 1);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::commands::DoorCommand;
use crate::door::{DoorId, DoorState, DOOR_COUNT};
use crate::garage::{GarageController, TickReport};
use crate::traits::{Clock, DoorSensor, RelayOutput};

/// Milliseconds since construction, from [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct InstantClock {
    start: Instant,
}

impl InstantClock {
    /// Clock reading 0 now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// The instant this clock reads 0 at.
    pub fn start(&self) -> Instant {
        self.start
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for InstantClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Garage controller behind a mutex, with one clock as the time base.
///
/// Uses `Mutex` rather than `RwLock`: the tick loop writes every 20ms and
/// readers are rare.
pub struct SharedGarageState<S: DoorSensor, R: RelayOutput, K: Clock = InstantClock> {
    controller: Mutex<GarageController<S, R>>,
    clock: K,
}

impl<S: DoorSensor, R: RelayOutput> SharedGarageState<S, R, InstantClock> {
    /// Wrap a controller; `now_ms()` counts from this call.
    pub fn new(controller: GarageController<S, R>) -> Self {
        Self::with_clock(controller, InstantClock::new())
    }
}

impl<S: DoorSensor, R: RelayOutput, K: Clock> SharedGarageState<S, R, K> {
    /// Wrap a controller, reading time from `clock`.
    pub fn with_clock(controller: GarageController<S, R>, clock: K) -> Self {
        Self {
            controller: Mutex::new(controller),
            clock,
        }
    }

    /// Current reading of the time base.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// The time base.
    #[inline]
    pub fn clock(&self) -> &K {
        &self.clock
    }

    // A panic mid-tick leaves the controller usable: every field is valid
    // between statements.
    fn lock(&self) -> MutexGuard<'_, GarageController<S, R>> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the controller.
    ///
    /// The closure form keeps the lock from being held across an `.await`.
    pub fn with_controller<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut GarageController<S, R>) -> T,
    {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Queue a command for the next tick.
    pub fn submit(&self, door: DoorId, cmd: DoorCommand) -> bool {
        self.lock().submit(door, cmd)
    }

    /// Run one tick at the current time.
    pub fn tick(&self) -> TickReport {
        let now_ms = self.now_ms();
        self.tick_at(now_ms)
    }

    /// Run one tick at an explicit time on this state's time base.
    pub fn tick_at(&self, now_ms: u64) -> TickReport {
        self.lock().tick(now_ms)
    }

    /// Current states of both doors.
    pub fn states(&self) -> [DoorState; DOOR_COUNT] {
        self.lock().states()
    }
}
