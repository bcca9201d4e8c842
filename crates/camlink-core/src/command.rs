//! Commands the server sends to cameras and the replies they send back.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::topic;

/// Which request/response channel a command travels on.
///
/// Together with the device token this forms the correlation key: a reply
/// on `api/{token}/cam/{kind}` answers the command last sent on the same
/// topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Memory,
    Streaming,
}

impl CommandKind {
    pub const ALL: [Self; 2] = [Self::Memory, Self::Streaming];

    pub const fn as_segment(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Streaming => "streaming",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "memory" => Some(Self::Memory),
            "streaming" => Some(Self::Streaming),
            _ => None,
        }
    }

    /// Topic the command is published on (and the reply arrives on).
    pub fn topic(self, token: &str) -> String {
        topic::command_topic(token, self)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_segment())
    }
}

/// Streaming switch requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamAction {
    On,
    Off,
}

impl StreamAction {
    /// Case-insensitive parse of `"on"` / `"off"`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("on") {
            Some(Self::On)
        } else if raw.eq_ignore_ascii_case("off") {
            Some(Self::Off)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

/// JSON command published to a camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceCommand {
    /// Ask the camera to upload a stored recording.
    GetMemory {
        #[serde(rename = "recordID")]
        record_id: String,
        #[serde(rename = "folderName")]
        folder_name: String,
    },
    StartStreaming {
        action: StreamAction,
    },
    StopStreaming {
        action: StreamAction,
    },
}

impl DeviceCommand {
    pub fn get_memory(record_id: impl Into<String>, folder_name: impl Into<String>) -> Self {
        Self::GetMemory {
            record_id: record_id.into(),
            folder_name: folder_name.into(),
        }
    }

    pub const fn streaming(action: StreamAction) -> Self {
        match action {
            StreamAction::On => Self::StartStreaming { action },
            StreamAction::Off => Self::StopStreaming { action },
        }
    }

    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::GetMemory { .. } => CommandKind::Memory,
            Self::StartStreaming { .. } | Self::StopStreaming { .. } => CommandKind::Streaming,
        }
    }

    /// Serialize to the bytes published on the command topic.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Stream URL carried by a streaming reply (`streamUrl`, or `ip` from older
/// firmware).
pub fn stream_url(reply: &Value) -> Option<&str> {
    ["streamUrl", "ip"]
        .iter()
        .filter_map(|key| reply.get(key).and_then(Value::as_str))
        .find(|url| !url.is_empty())
}

/// Optional media details attached to a record announcement.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordMetadata {
    pub duration: Option<f64>,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
}

/// Unsolicited `api/{token}/cam/record` announcement of a new recording.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAnnouncement {
    pub folder_name: String,
    #[serde(default)]
    pub file_count: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub metadata: Option<RecordMetadata>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_command_payload() {
        let cmd = DeviceCommand::get_memory("r-1", "2024-06-01_12-00");
        let value: Value = serde_json::from_slice(&cmd.to_payload().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"command": "GET_MEMORY", "recordID": "r-1", "folderName": "2024-06-01_12-00"})
        );
        assert_eq!(cmd.kind(), CommandKind::Memory);
    }

    #[test]
    fn streaming_commands_follow_action() {
        let on: Value =
            serde_json::from_slice(&DeviceCommand::streaming(StreamAction::On).to_payload().unwrap())
                .unwrap();
        assert_eq!(on, json!({"command": "START_STREAMING", "action": "ON"}));

        let off = DeviceCommand::streaming(StreamAction::Off);
        assert_eq!(off.kind(), CommandKind::Streaming);
        let off: Value = serde_json::from_slice(&off.to_payload().unwrap()).unwrap();
        assert_eq!(off, json!({"command": "STOP_STREAMING", "action": "OFF"}));
    }

    #[test]
    fn stream_action_parse_is_case_insensitive() {
        assert_eq!(StreamAction::parse("on"), Some(StreamAction::On));
        assert_eq!(StreamAction::parse("OfF"), Some(StreamAction::Off));
        assert_eq!(StreamAction::parse("toggle"), None);
    }

    #[test]
    fn stream_url_prefers_stream_url_then_ip() {
        assert_eq!(
            stream_url(&json!({"streamUrl": "rtsp://x", "ip": "10.0.0.2"})),
            Some("rtsp://x")
        );
        assert_eq!(stream_url(&json!({"ip": "10.0.0.2"})), Some("10.0.0.2"));
        assert_eq!(stream_url(&json!({"streamUrl": ""})), None);
        assert_eq!(stream_url(&json!({"ok": true})), None);
    }

    #[test]
    fn record_announcement_defaults() {
        let rec: RecordAnnouncement =
            serde_json::from_str(r#"{"folderName":"clip-7","fileCount":3}"#).unwrap();
        assert_eq!(rec.folder_name, "clip-7");
        assert_eq!(rec.file_count, Some(3));
        assert_eq!(rec.size, None);
        assert!(rec.metadata.is_none());
    }

    #[test]
    fn command_kind_topic() {
        assert_eq!(CommandKind::Streaming.topic("abc"), "api/abc/cam/streaming");
        assert_eq!(CommandKind::from_segment("memory"), Some(CommandKind::Memory));
        assert_eq!(CommandKind::from_segment("record"), None);
    }
}
