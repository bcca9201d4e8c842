//! Topic grammar for the device message bus.
//!
//! Every device topic has the shape `api/{token}/...`:
//!
//! | Topic | Direction | Meaning |
//! |---|---|---|
//! | `api/{token}/cam/{memory,streaming}` | both | command / command reply |
//! | `api/{token}/cam/{memory,stream,connect}/status` | device → server | status channel |
//! | `api/{token}/cam/record` | device → server | new recording available |
//! | `api/{token}/pair` | device → server | pairing announcement |
//!
//! [`classify`] turns an inbound topic into an [`InboundTopic`] by looking
//! at its segments, in a fixed priority order: pairing, status, memory
//! reply, streaming reply, record arrival.

use crate::command::CommandKind;
use crate::status::StatusChannel;

/// First segment of every device topic.
pub const ROOT: &str = "api";

const CAM: &str = "cam";
const PAIR: &str = "pair";
const STATUS: &str = "status";
const RECORD: &str = "record";

/// Wildcard patterns the server subscribes to on every (re)connect.
pub const SUBSCRIPTIONS: [&str; 7] = [
    "api/+/cam/memory",
    "api/+/cam/memory/status",
    "api/+/cam/streaming",
    "api/+/cam/stream/status",
    "api/+/cam/connect/status",
    "api/+/cam/record",
    "api/+/pair",
];

/// A routable inbound topic, borrowing the device token from the topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundTopic<'a> {
    /// `api/{token}/pair`
    Pairing { token: &'a str },
    /// `api/{token}/cam/{channel}/status`
    Status {
        token: &'a str,
        channel: StatusChannel,
    },
    /// `api/{token}/cam/{memory|streaming}`
    CommandReply { token: &'a str, kind: CommandKind },
    /// `api/{token}/cam/record`
    RecordArrival { token: &'a str },
}

impl<'a> InboundTopic<'a> {
    pub const fn token(&self) -> &'a str {
        match self {
            Self::Pairing { token }
            | Self::Status { token, .. }
            | Self::CommandReply { token, .. }
            | Self::RecordArrival { token } => token,
        }
    }
}

/// Classify a topic, or `None` when it matches no known pattern.
pub fn classify(topic: &str) -> Option<InboundTopic<'_>> {
    let segments: Vec<&str> = topic.split('/').collect();
    let (&root, &token) = (segments.first()?, segments.get(1)?);
    if root != ROOT || token.is_empty() {
        return None;
    }

    match segments[2..] {
        [PAIR] => Some(InboundTopic::Pairing { token }),
        [CAM, channel, STATUS] => StatusChannel::from_segment(channel)
            .map(|channel| InboundTopic::Status { token, channel }),
        [CAM, RECORD] => Some(InboundTopic::RecordArrival { token }),
        [CAM, leaf] => {
            CommandKind::from_segment(leaf).map(|kind| InboundTopic::CommandReply { token, kind })
        }
        _ => None,
    }
}

/// `api/{token}/cam/{kind}`
pub fn command_topic(token: &str, kind: CommandKind) -> String {
    format!("{ROOT}/{token}/{CAM}/{}", kind.as_segment())
}

/// `api/{token}/pair`
pub fn pairing_topic(token: &str) -> String {
    format!("{ROOT}/{token}/{PAIR}")
}

/// `api/{token}/cam/{channel}/status`
pub fn status_topic(token: &str, channel: StatusChannel) -> String {
    format!("{ROOT}/{token}/{CAM}/{}/{STATUS}", channel.as_segment())
}

/// `api/{token}/cam/record`
pub fn record_topic(token: &str) -> String {
    format!("{ROOT}/{token}/{CAM}/{RECORD}")
}
