//! Door state estimation.
//!
//! Each door has a single contact that is asserted at one travel extreme. A
//! door that has just been commanded open still reads "closed" for a moment
//! after it starts moving, and a door half way down still reads "open". The
//! estimator fuses the previous state, the raw reading and the time since the
//! last command to decide which of the two the reading means:
//!
//! 1. Reading agrees with the previous state: nothing changes
//! 2. Door is `Opening`, reads `Closed`, and the opening window has not
//!    elapsed: still travelling, hold `Opening`
//! 3. Door is `Closing`, reads `Open`, and the closing window has not
//!    elapsed: still travelling, hold `Closing`
//! 4. Otherwise the sensor is trusted
//!
//! When a motion window expires without the door reaching its destination
//! the estimator falls back to the sensor. That keeps a door from being stuck
//! in `Opening`/`Closing` forever if the opener ignored the pulse or the
//! contact failed; it is reported as [`ReconcileKind::Fallback`].
//!
//! # Example
//!
//! ```rust
//! use garage_doors::{reconcile, DoorState, TimingConfig};
//! use garage_doors::traits::SensorReading;
//!
//! let timing = TimingConfig::default();
//!
//! // Half a second after "open": the closed contact still reads closed
//! let held = reconcile(DoorState::Opening, SensorReading::Closed, 500, &timing);
//! assert_eq!(held, DoorState::Opening);
//!
//! // The open contact engages
//! let arrived = reconcile(DoorState::Opening, SensorReading::Open, 4000, &timing);
//! assert_eq!(arrived, DoorState::Open);
//! ```

use crate::config::TimingConfig;
use crate::door::DoorState;
use crate::traits::SensorReading;

/// How the estimator reached its answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileKind {
    /// Reading agreed with the previous state.
    Agreed,
    /// Reading disagreed but the door is still inside its motion window.
    Held,
    /// A moving door reached its destination.
    Arrived,
    /// A motion window expired without reaching the destination.
    Fallback,
    /// A steady door changed without a command (wall button, remote, by hand).
    External,
}

/// Result of one reconciliation step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    /// New debounced state.
    pub state: DoorState,
    /// Why.
    pub kind: ReconcileKind,
}

/// Reconcile `previous` against a fresh `reading`.
///
/// `since_command_ms` is the time since the last accepted command, computed
/// once per tick by the caller.
pub fn reconcile(
    previous: DoorState,
    reading: SensorReading,
    since_command_ms: u64,
    timing: &TimingConfig,
) -> DoorState {
    reconcile_detailed(previous, reading, since_command_ms, timing).state
}

/// [`reconcile`], also reporting which rule applied.
pub fn reconcile_detailed(
    previous: DoorState,
    reading: SensorReading,
    since_command_ms: u64,
    timing: &TimingConfig,
) -> Reconciliation {
    if previous.matches(reading) {
        return Reconciliation {
            state: previous,
            kind: ReconcileKind::Agreed,
        };
    }

    let still_opening = previous == DoorState::Opening
        && reading == SensorReading::Closed
        && since_command_ms < u64::from(timing.opening_window_ms);
    let still_closing = previous == DoorState::Closing
        && reading == SensorReading::Open
        && since_command_ms < u64::from(timing.closing_window_ms);

    if still_opening || still_closing {
        return Reconciliation {
            state: previous,
            kind: ReconcileKind::Held,
        };
    }

    let state = DoorState::from(reading);
    let kind = if !previous.is_moving() {
        ReconcileKind::External
    } else if state == previous.destination() {
        ReconcileKind::Arrived
    } else {
        ReconcileKind::Fallback
    };

    Reconciliation { state, kind }
}
