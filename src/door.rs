//! Per-door state and the controller that drives one door.
//!
//! A [`DoorController`] owns the sensor and relay for a single door and the
//! [`DoorRuntime`] bookkeeping. Each call to [`DoorController::update`] runs
//! one evaluation tick in a fixed order:
//!
//! 1. Compute the time since the last accepted command (once)
//! 2. Relay pulser releases the relay if the pulse has run its course
//! 3. Sample the position sensor
//! 4. State estimator reconciles the sample against the motion hypothesis
//!
//! # Example
//!
//! ```rust
//! use garage_doors::{DoorCommand, DoorController, DoorId, DoorState, TimingConfig};
//! use garage_doors::hal::{MockRelay, MockSensor};
//! use garage_doors::traits::{RelayOutput, SensorReading};
//!
//! let mut door = DoorController::new(
//!     DoorId::Door1,
//!     MockSensor::new(SensorReading::Closed),
//!     MockRelay::new(),
//!     TimingConfig::default(),
//! );
//!
//! let outcome = door.apply_command(DoorCommand::Open, 0);
//! assert!(outcome.is_accepted());
//! assert_eq!(door.state(), DoorState::Opening);
//! assert!(door.relay().is_active());
//!
//! // Door reaches the top two seconds later
//! door.sensor_mut().set(SensorReading::Open);
//! door.update(2000);
//! assert_eq!(door.state(), DoorState::Open);
//! assert!(!door.relay().is_active());
//! ```

use core::fmt;

use log::{debug, info, warn};

use crate::commands::{interpret, CommandOutcome, DoorCommand};
use crate::config::TimingConfig;
use crate::estimator::{reconcile_detailed, ReconcileKind, Reconciliation};
use crate::relay::RelayPulser;
use crate::traits::{elapsed_ms, DoorSensor, RelayOutput, SensorReading};

// ============================================================================
// Door Identity
// ============================================================================

/// Which of the two doors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DoorId {
    /// First door (`garage_door_1`).
    Door1,
    /// Second door (`garage_door_2`).
    Door2,
}

/// Number of doors the controller drives.
pub const DOOR_COUNT: usize = 2;

impl DoorId {
    /// Both doors in evaluation order.
    pub const ALL: [DoorId; DOOR_COUNT] = [DoorId::Door1, DoorId::Door2];

    /// Zero-based index into per-door arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            DoorId::Door1 => 0,
            DoorId::Door2 => 1,
        }
    }

    /// One-based door number as used in topic names.
    #[inline]
    pub const fn number(self) -> u8 {
        match self {
            DoorId::Door1 => 1,
            DoorId::Door2 => 2,
        }
    }

    /// Look up a door by its one-based number.
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(DoorId::Door1),
            2 => Some(DoorId::Door2),
            _ => None,
        }
    }
}

impl fmt::Display for DoorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "garage_door_{}", self.number())
    }
}

// ============================================================================
// Door State
// ============================================================================

/// Debounced position of a door.
///
/// `Open` and `Closed` are steady states that only change on a command or a
/// sensor change. `Opening` and `Closing` are time-bounded hypotheses that
/// the door is travelling after an accepted command.
///
/// # Default
///
/// Defaults to [`Closed`](Self::Closed); state is not persisted across restarts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DoorState {
    /// Door is fully open.
    Open,
    /// Door is fully closed.
    #[default]
    Closed,
    /// Door was commanded open and is presumed travelling up.
    Opening,
    /// Door was commanded closed and is presumed travelling down.
    Closing,
}

impl DoorState {
    /// Returns the state as the lowercase word published on the bus.
    ///
    /// # Examples
    ///
    /// ```
    /// use garage_doors::DoorState;
    ///
    /// assert_eq!(DoorState::Open.as_str(), "open");
    /// assert_eq!(DoorState::Closing.as_str(), "closing");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DoorState::Open => "open",
            DoorState::Closed => "closed",
            DoorState::Opening => "opening",
            DoorState::Closing => "closing",
        }
    }

    /// Parse the published word back into a state.
    pub fn from_text(s: &str) -> Option<Self> {
        match s.trim() {
            "open" => Some(DoorState::Open),
            "closed" => Some(DoorState::Closed),
            "opening" => Some(DoorState::Opening),
            "closing" => Some(DoorState::Closing),
            _ => None,
        }
    }

    /// True while a motion hypothesis is in flight.
    #[inline]
    pub const fn is_moving(&self) -> bool {
        matches!(self, DoorState::Opening | DoorState::Closing)
    }

    /// Steady state the door is heading to (itself for steady states).
    #[inline]
    pub const fn destination(&self) -> DoorState {
        match self {
            DoorState::Opening => DoorState::Open,
            DoorState::Closing => DoorState::Closed,
            other => *other,
        }
    }

    /// Whether a raw reading agrees with this state.
    ///
    /// Only the steady states can agree; a moving door never matches.
    #[inline]
    pub const fn matches(&self, reading: SensorReading) -> bool {
        matches!(
            (self, reading),
            (DoorState::Open, SensorReading::Open) | (DoorState::Closed, SensorReading::Closed)
        )
    }
}

impl From<SensorReading> for DoorState {
    fn from(reading: SensorReading) -> Self {
        match reading {
            SensorReading::Open => DoorState::Open,
            SensorReading::Closed => DoorState::Closed,
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Runtime Bookkeeping
// ============================================================================

/// Mutable per-door bookkeeping, one instance per door for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DoorRuntime {
    /// Current debounced state.
    pub state: DoorState,
    /// Clock reading at the last accepted command.
    pub last_command_ms: u64,
    /// Last state handed to the publisher; `None` until the first publish.
    pub last_published: Option<DoorState>,
}

impl DoorRuntime {
    /// Fresh runtime: closed, command epoch 0, nothing published.
    pub const fn new() -> Self {
        Self {
            state: DoorState::Closed,
            last_command_ms: 0,
            last_published: None,
        }
    }

    /// Milliseconds since the last accepted command.
    #[inline]
    pub fn since_command(&self, now_ms: u64) -> u64 {
        elapsed_ms(now_ms, self.last_command_ms)
    }
}

/// What happened to one door during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoorUpdate {
    /// Door the update belongs to.
    pub door: DoorId,
    /// State before the tick.
    pub previous: DoorState,
    /// State after the tick.
    pub state: DoorState,
    /// The reading sampled this tick.
    pub reading: SensorReading,
    /// How the estimator arrived at `state`.
    pub kind: ReconcileKind,
}

impl DoorUpdate {
    /// True if the state changed this tick.
    pub fn changed(&self) -> bool {
        self.previous != self.state
    }
}

// ============================================================================
// Door Controller
// ============================================================================

/// Controller for a single door.
///
/// # Type Parameters
///
/// - `S`: The position sensor ([`DoorSensor`])
/// - `R`: The opener relay ([`RelayOutput`])
pub struct DoorController<S: DoorSensor, R: RelayOutput> {
    id: DoorId,
    sensor: S,
    relay: R,
    pulser: RelayPulser,
    timing: TimingConfig,
    runtime: DoorRuntime,
}

impl<S: DoorSensor, R: RelayOutput> DoorController<S, R> {
    /// Create a controller; the relay is released immediately.
    pub fn new(id: DoorId, sensor: S, mut relay: R, timing: TimingConfig) -> Self {
        relay.release();
        Self {
            id,
            sensor,
            relay,
            pulser: RelayPulser::new(timing.relay_pulse_ms),
            timing,
            runtime: DoorRuntime::new(),
        }
    }

    /// Apply a command at `now_ms`.
    ///
    /// An accepted command moves the door into its motion state, stamps the
    /// command time and starts the relay pulse. Anything else is a no-op.
    pub fn apply_command(&mut self, cmd: DoorCommand, now_ms: u64) -> CommandOutcome {
        let outcome = interpret(cmd, self.runtime.state);
        match outcome {
            CommandOutcome::Accepted { from, to } => {
                info!("{}: {:?} accepted, {} -> {}", self.id, cmd, from, to);
                self.runtime.state = to;
                self.runtime.last_command_ms = now_ms;
                self.pulser.begin(&mut self.relay);
            }
            CommandOutcome::Ignored { state } => {
                debug!("{}: {:?} ignored while {}", self.id, cmd, state);
            }
        }
        outcome
    }

    /// Run one evaluation tick at `now_ms`.
    pub fn update(&mut self, now_ms: u64) -> DoorUpdate {
        let since_command = self.runtime.since_command(now_ms);
        let previous = self.runtime.state;

        self.pulser.tick(previous, since_command, &mut self.relay);

        let reading = self.sensor.read();
        let Reconciliation { state, kind } =
            reconcile_detailed(previous, reading, since_command, &self.timing);

        match kind {
            ReconcileKind::Fallback => warn!(
                "{}: no {} after {}ms, trusting sensor ({})",
                self.id,
                previous.destination(),
                since_command,
                reading.as_str()
            ),
            ReconcileKind::Arrived | ReconcileKind::External => {
                info!("{}: {} -> {}", self.id, previous, state)
            }
            ReconcileKind::Agreed | ReconcileKind::Held => {}
        }

        self.runtime.state = state;

        DoorUpdate {
            door: self.id,
            previous,
            state,
            reading,
            kind,
        }
    }

    /// Which door this is.
    pub fn id(&self) -> DoorId {
        self.id
    }

    /// Current debounced state.
    pub fn state(&self) -> DoorState {
        self.runtime.state
    }

    /// Runtime bookkeeping snapshot.
    pub fn runtime(&self) -> &DoorRuntime {
        &self.runtime
    }

    /// Record what was handed to the publisher.
    pub(crate) fn mark_published(&mut self, state: DoorState) {
        self.runtime.last_published = Some(state);
    }

    /// Timing this door runs with.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// The relay output.
    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// The position sensor.
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Mutable access to the position sensor (tests drive mocks through this).
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}
