//! Relay pulse sequencing.
//!
//! Garage door openers react to a momentary press of the wall button, so the
//! relay wired across that button must only be closed briefly. The pulse has
//! two edges:
//!
//! - **Energize**: exactly once, when a command is accepted ([`RelayPulser::begin`])
//! - **Release**: on the first tick at least `relay_pulse_ms` after the command
//!   ([`RelayPulser::tick`])
//!
//! The release decision only depends on the elapsed time since the command,
//! so `tick` can be called unconditionally every cycle without remembering
//! whether the relay was already released. Sensor confirmation never cuts a
//! pulse short and never extends it.
//!
//! # Example
//!
//! ```rust
//! use garage_doors::{DoorState, RelayAction, RelayPulser};
//! use garage_doors::hal::MockRelay;
//! use garage_doors::traits::RelayOutput;
//!
//! let pulser = RelayPulser::new(1000);
//! let mut relay = MockRelay::new();
//!
//! pulser.begin(&mut relay);
//! assert_eq!(pulser.tick(DoorState::Opening, 999, &mut relay), RelayAction::Hold);
//! assert!(relay.is_active());
//!
//! assert_eq!(pulser.tick(DoorState::Opening, 1000, &mut relay), RelayAction::Release);
//! assert!(!relay.is_active());
//! ```

use log::debug;

use crate::door::DoorState;
use crate::traits::RelayOutput;

/// Decision taken by [`RelayPulser::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayAction {
    /// Pulse still running; relay untouched.
    Hold,
    /// Pulse window has passed; relay driven to released.
    Release,
}

/// True once `elapsed_ms` has reached the pulse length.
#[inline]
pub const fn pulse_expired(elapsed_ms: u64, pulse_ms: u64) -> bool {
    elapsed_ms >= pulse_ms
}

/// Emits bounded-length relay pulses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayPulser {
    pulse_ms: u64,
}

impl RelayPulser {
    /// Pulser with the given pulse length in milliseconds.
    pub fn new(pulse_ms: u32) -> Self {
        Self {
            pulse_ms: u64::from(pulse_ms),
        }
    }

    /// Pulse length in milliseconds.
    pub fn pulse_ms(&self) -> u64 {
        self.pulse_ms
    }

    /// Energize the relay for a newly accepted command.
    pub fn begin<R: RelayOutput>(&self, relay: &mut R) {
        relay.energize();
    }

    /// Release the relay if the pulse has run its course.
    ///
    /// `elapsed_ms` is the time since the last accepted command. Idempotent:
    /// after expiry every call writes the released level again.
    pub fn tick<R: RelayOutput>(&self, state: DoorState, elapsed_ms: u64, relay: &mut R) -> RelayAction {
        if !pulse_expired(elapsed_ms, self.pulse_ms) {
            return RelayAction::Hold;
        }
        if relay.is_active() {
            debug!("relay released after {}ms ({})", elapsed_ms, state);
        }
        relay.release();
        RelayAction::Release
    }
}
