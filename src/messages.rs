//! MQTT topic layout and payload codecs.
//!
//! Every topic is rooted at the device's monitor name:
//!
//! | Topic | Direction | Payload |
//! |-------|-----------|---------|
//! | `<monitor>/garage_door_N/state` | published, retained | `open`, `closed`, `opening`, `closing` |
//! | `<monitor>/garage_door_N/command` | subscribed | `0` (open) or `1` (close) |
//! | `<monitor>/reset` | subscribed | anything; restarts the device |
//!
//! # Example
//!
//! ```
//! use garage_doors::messages::{Inbound, Topics};
//! use garage_doors::{DoorCommand, DoorId};
//!
//! let topics = Topics::new("Garage");
//! assert_eq!(topics.state(DoorId::Door1).as_str(), "Garage/garage_door_1/state");
//!
//! let inbound = topics.decode("Garage/garage_door_2/command", b"1");
//! assert_eq!(inbound, Ok(Inbound::Command(DoorId::Door2, DoorCommand::Close)));
//! ```

use core::fmt;

use crate::commands::DoorCommand;
use crate::config::{short_string, LongString, ShortString};
use crate::door::{DoorId, DoorState};

const STATE_SUFFIX: &str = "state";
const COMMAND_SUFFIX: &str = "command";
const RESET_SUFFIX: &str = "reset";

/// Message received on a subscribed topic, decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A door command.
    Command(DoorId, DoorCommand),
    /// Restart request.
    Reset,
}

/// Why an inbound message was discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundError {
    /// Topic is not one of ours.
    UnknownTopic,
    /// Command payload is not exactly `0` or `1`.
    MalformedPayload(DoorId),
}

impl fmt::Display for InboundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTopic => write!(f, "unknown topic"),
            Self::MalformedPayload(door) => write!(f, "malformed command payload for {}", door),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InboundError {}

/// Topic names for one device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    root: ShortString,
}

impl Topics {
    /// Topics rooted at `monitor_name`.
    pub fn new(monitor_name: &str) -> Self {
        Self {
            root: short_string(monitor_name),
        }
    }

    /// Topic root.
    pub fn root(&self) -> &str {
        &self.root
    }

    fn door_topic(&self, door: DoorId, suffix: &str) -> LongString {
        use core::fmt::Write;

        let mut topic = LongString::new();
        let _ = write!(topic, "{}/{}/{}", self.root, door, suffix);
        topic
    }

    /// `<monitor>/garage_door_N/state`
    pub fn state(&self, door: DoorId) -> LongString {
        self.door_topic(door, STATE_SUFFIX)
    }

    /// `<monitor>/garage_door_N/command`
    pub fn command(&self, door: DoorId) -> LongString {
        self.door_topic(door, COMMAND_SUFFIX)
    }

    /// `<monitor>/reset`
    pub fn reset(&self) -> LongString {
        let mut topic = LongString::new();
        let _ = topic.push_str(&self.root);
        let _ = topic.push('/');
        let _ = topic.push_str(RESET_SUFFIX);
        topic
    }

    /// Every topic the device subscribes to.
    pub fn subscriptions(&self) -> [LongString; 3] {
        [
            self.command(DoorId::Door1),
            self.command(DoorId::Door2),
            self.reset(),
        ]
    }

    /// Decode a message received on `topic`.
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<Inbound, InboundError> {
        let rest = topic
            .strip_prefix(self.root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or(InboundError::UnknownTopic)?;

        if rest == RESET_SUFFIX {
            return Ok(Inbound::Reset);
        }

        let door = DoorId::ALL
            .into_iter()
            .find(|door| self.command(*door).as_str() == topic)
            .ok_or(InboundError::UnknownTopic)?;

        DoorCommand::from_payload(payload)
            .map(|cmd| Inbound::Command(door, cmd))
            .ok_or(InboundError::MalformedPayload(door))
    }
}

/// Wire payload for a published door state.
#[inline]
pub fn state_payload(state: DoorState) -> &'static [u8] {
    state.as_str().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_layout() {
        let topics = Topics::new("GarageDoors");
        assert_eq!(
            topics.command(DoorId::Door1).as_str(),
            "GarageDoors/garage_door_1/command"
        );
        assert_eq!(
            topics.state(DoorId::Door2).as_str(),
            "GarageDoors/garage_door_2/state"
        );
        assert_eq!(topics.reset().as_str(), "GarageDoors/reset");
    }

    #[test]
    fn subscriptions_cover_commands_and_reset() {
        let topics = Topics::new("g");
        let subs = topics.subscriptions();
        assert_eq!(subs[0].as_str(), "g/garage_door_1/command");
        assert_eq!(subs[1].as_str(), "g/garage_door_2/command");
        assert_eq!(subs[2].as_str(), "g/reset");
    }

    #[test]
    fn decode_commands() {
        let topics = Topics::new("g");
        assert_eq!(
            topics.decode("g/garage_door_1/command", b"0"),
            Ok(Inbound::Command(DoorId::Door1, DoorCommand::Open))
        );
        assert_eq!(
            topics.decode("g/garage_door_2/command", b"1"),
            Ok(Inbound::Command(DoorId::Door2, DoorCommand::Close))
        );
    }

    #[test]
    fn decode_malformed_payload() {
        let topics = Topics::new("g");
        assert_eq!(
            topics.decode("g/garage_door_1/command", b"open"),
            Err(InboundError::MalformedPayload(DoorId::Door1))
        );
        assert_eq!(
            topics.decode("g/garage_door_2/command", b""),
            Err(InboundError::MalformedPayload(DoorId::Door2))
        );
    }

    #[test]
    fn decode_reset_ignores_payload() {
        let topics = Topics::new("g");
        assert_eq!(topics.decode("g/reset", b""), Ok(Inbound::Reset));
        assert_eq!(topics.decode("g/reset", b"whatever"), Ok(Inbound::Reset));
    }

    #[test]
    fn decode_unknown_topics() {
        let topics = Topics::new("g");
        for topic in [
            "other/reset",
            "g/garage_door_3/command",
            "g/garage_door_1/state",
            "g",
            "gg/reset",
            "",
        ] {
            assert_eq!(
                topics.decode(topic, b"0"),
                Err(InboundError::UnknownTopic),
                "{}",
                topic
            );
        }
    }

    #[test]
    fn state_payloads() {
        assert_eq!(state_payload(DoorState::Open), b"open");
        assert_eq!(state_payload(DoorState::Closed), b"closed");
        assert_eq!(state_payload(DoorState::Opening), b"opening");
        assert_eq!(state_payload(DoorState::Closing), b"closing");
    }
}
