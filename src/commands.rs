//! Door commands, the command interpreter, and the pending-command queue.
//!
//! # Command Flow
//!
//! 1. A payload arrives on a door's command topic and is decoded with
//!    [`DoorCommand::from_payload`]; malformed payloads never get further
//! 2. The decoded command is queued in a [`CommandQueue`] so it is applied
//!    atomically at the start of the next tick
//! 3. [`interpret`] decides whether the command starts a motion given the
//!    door's current state
//!
//! Only two combinations do anything:
//!
//! | Command | Current state | Result |
//! |---------|---------------|--------|
//! | `Open`  | `Closed`      | `Opening`, relay pulse |
//! | `Close` | `Open`        | `Closing`, relay pulse |
//!
//! Everything else, including commands while the door is moving, is ignored.
//!
//! ```rust
//! use garage_doors::{interpret, DoorCommand, DoorState};
//!
//! let outcome = interpret(DoorCommand::Open, DoorState::Closed);
//! assert!(outcome.is_accepted());
//! assert_eq!(outcome.state(), DoorState::Opening);
//!
//! let outcome = interpret(DoorCommand::Open, DoorState::Closing);
//! assert!(!outcome.is_accepted());
//! assert_eq!(outcome.state(), DoorState::Closing);
//! ```

use heapless::Deque;

use crate::door::{DoorId, DoorState};

// ============================================================================
// Commands
// ============================================================================

/// Binary intent received from the message bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DoorCommand {
    /// Open the door (payload `0`).
    Open,
    /// Close the door (payload `1`).
    Close,
}

impl DoorCommand {
    /// Decode a command payload.
    ///
    /// The payload must be exactly one byte, `0` (open) or `1` (close).
    ///
    /// # Examples
    ///
    /// ```
    /// use garage_doors::DoorCommand;
    ///
    /// assert_eq!(DoorCommand::from_payload(b"0"), Some(DoorCommand::Open));
    /// assert_eq!(DoorCommand::from_payload(b"1"), Some(DoorCommand::Close));
    /// assert_eq!(DoorCommand::from_payload(b"2"), None);
    /// assert_eq!(DoorCommand::from_payload(b"10"), None);
    /// assert_eq!(DoorCommand::from_payload(b""), None);
    /// ```
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [b'0'] => Some(DoorCommand::Open),
            [b'1'] => Some(DoorCommand::Close),
            _ => None,
        }
    }

    /// Encode as the wire payload.
    #[inline]
    pub const fn as_payload(&self) -> &'static [u8] {
        match self {
            DoorCommand::Open => b"0",
            DoorCommand::Close => b"1",
        }
    }
}

// ============================================================================
// Interpreter
// ============================================================================

/// Result of interpreting a command against the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command starts a motion; the relay must be pulsed.
    Accepted {
        /// Steady state the door was in.
        from: DoorState,
        /// Motion state the door enters.
        to: DoorState,
    },
    /// The command does not apply in the current state.
    Ignored {
        /// Unchanged current state.
        state: DoorState,
    },
}

impl CommandOutcome {
    /// Whether the command was accepted.
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandOutcome::Accepted { .. })
    }

    /// State after interpretation.
    #[inline]
    pub fn state(&self) -> DoorState {
        match self {
            CommandOutcome::Accepted { to, .. } => *to,
            CommandOutcome::Ignored { state } => *state,
        }
    }
}

/// Interpret `cmd` against `current`.
///
/// Pure: the caller applies the side effects of an accepted command
/// (stamping the command time and starting the relay pulse).
pub fn interpret(cmd: DoorCommand, current: DoorState) -> CommandOutcome {
    match (cmd, current) {
        (DoorCommand::Open, DoorState::Closed) => CommandOutcome::Accepted {
            from: current,
            to: DoorState::Opening,
        },
        (DoorCommand::Close, DoorState::Open) => CommandOutcome::Accepted {
            from: current,
            to: DoorState::Closing,
        },
        _ => CommandOutcome::Ignored { state: current },
    }
}

// ============================================================================
// Command Queue
// ============================================================================

/// A command waiting for the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuedCommand {
    /// Target door.
    pub door: DoorId,
    /// The command.
    pub command: DoorCommand,
}

/// FIFO of commands received between ticks.
///
/// Commands arrive asynchronously from the bus but are only applied at the
/// start of a tick, so command application never interleaves with a tick.
///
/// # Capacity
///
/// Fixed capacity `N`. When full, the new command is rejected; the older
/// commands already express the operator's intent.
///
/// ```rust
/// use garage_doors::{CommandQueue, DoorCommand, DoorId};
///
/// let mut queue: CommandQueue<2> = CommandQueue::new();
/// assert!(queue.push(DoorId::Door1, DoorCommand::Open));
/// assert!(queue.push(DoorId::Door2, DoorCommand::Close));
/// assert!(!queue.push(DoorId::Door1, DoorCommand::Close)); // full
///
/// assert_eq!(queue.pop().map(|c| c.door), Some(DoorId::Door1));
/// ```
#[derive(Debug)]
pub struct CommandQueue<const N: usize> {
    items: Deque<QueuedCommand, N>,
}

impl<const N: usize> CommandQueue<N> {
    /// Creates a new empty command queue with capacity N.
    pub fn new() -> Self {
        Self {
            items: Deque::new(),
        }
    }

    /// Append a command. Returns `false` if the queue is full.
    pub fn push(&mut self, door: DoorId, command: DoorCommand) -> bool {
        self.items
            .push_back(QueuedCommand { door, command })
            .is_ok()
    }

    /// Take the oldest command.
    pub fn pop(&mut self) -> Option<QueuedCommand> {
        self.items.pop_front()
    }

    /// Number of pending commands.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop all pending commands.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<const N: usize> Default for CommandQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [DoorState; 4] = [
        DoorState::Open,
        DoorState::Closed,
        DoorState::Opening,
        DoorState::Closing,
    ];

    // ========================================================================
    // Payload decoding
    // ========================================================================

    #[test]
    fn payload_decoding() {
        assert_eq!(DoorCommand::from_payload(b"0"), Some(DoorCommand::Open));
        assert_eq!(DoorCommand::from_payload(b"1"), Some(DoorCommand::Close));
    }

    #[test]
    fn payload_rejects_malformed() {
        let malformed: [&[u8]; 7] = [b"", b" 0", b"0\n", b"01", b"open", b"\x00", b"\x01"];
        for bad in malformed {
            assert_eq!(DoorCommand::from_payload(bad), None, "{:?}", bad);
        }
    }

    #[test]
    fn payload_encoding_matches_decoding() {
        for cmd in [DoorCommand::Open, DoorCommand::Close] {
            assert_eq!(DoorCommand::from_payload(cmd.as_payload()), Some(cmd));
        }
    }

    // ========================================================================
    // Interpreter
    // ========================================================================

    #[test]
    fn open_from_closed_accepted() {
        let outcome = interpret(DoorCommand::Open, DoorState::Closed);
        assert_eq!(
            outcome,
            CommandOutcome::Accepted {
                from: DoorState::Closed,
                to: DoorState::Opening
            }
        );
    }

    #[test]
    fn close_from_open_accepted() {
        let outcome = interpret(DoorCommand::Close, DoorState::Open);
        assert!(outcome.is_accepted());
        assert_eq!(outcome.state(), DoorState::Closing);
    }

    #[test]
    fn every_other_combination_is_ignored() {
        for cmd in [DoorCommand::Open, DoorCommand::Close] {
            for state in ALL_STATES {
                let outcome = interpret(cmd, state);
                let expected = matches!(
                    (cmd, state),
                    (DoorCommand::Open, DoorState::Closed) | (DoorCommand::Close, DoorState::Open)
                );
                assert_eq!(outcome.is_accepted(), expected, "{:?} / {:?}", cmd, state);
                if !expected {
                    assert_eq!(outcome.state(), state);
                }
            }
        }
    }

    // ========================================================================
    // Queue
    // ========================================================================

    #[test]
    fn queue_is_fifo() {
        let mut queue: CommandQueue<4> = CommandQueue::new();
        queue.push(DoorId::Door2, DoorCommand::Open);
        queue.push(DoorId::Door1, DoorCommand::Close);

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.pop(),
            Some(QueuedCommand {
                door: DoorId::Door2,
                command: DoorCommand::Open
            })
        );
        assert_eq!(queue.pop().map(|c| c.command), Some(DoorCommand::Close));
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn queue_rejects_when_full() {
        let mut queue: CommandQueue<1> = CommandQueue::new();
        assert!(queue.push(DoorId::Door1, DoorCommand::Open));
        assert!(!queue.push(DoorId::Door1, DoorCommand::Close));
        assert_eq!(queue.pop().map(|c| c.command), Some(DoorCommand::Open));
    }

    #[test]
    fn queue_clear() {
        let mut queue: CommandQueue<4> = CommandQueue::new();
        queue.push(DoorId::Door1, DoorCommand::Open);
        queue.clear();
        assert!(queue.is_empty());
    }
}
