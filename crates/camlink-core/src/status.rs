//! Device status and the projection from status-channel traffic.
//!
//! Cameras report what they are doing on three status channels
//! (`api/{token}/cam/{memory|stream|connect}/status`), each carrying a raw
//! `"ON"` or anything else. [`project`] maps one such message to the single
//! [`DeviceStatus`] stored for the device.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Window during which a device counts as reachable after its last status
/// change, in seconds.
pub const ONLINE_WINDOW_SECS: i64 = 5 * 60;

/// The payload a status channel uses to say "active".
pub const STATUS_ON: &str = "ON";

/// What a camera is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    #[default]
    Off,
    Streaming,
    Memory,
    Recording,
}

impl DeviceStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Streaming => "STREAMING",
            Self::Memory => "MEMORY",
            Self::Recording => "RECORDING",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OFF" => Ok(Self::Off),
            "STREAMING" => Ok(Self::Streaming),
            "MEMORY" => Ok(Self::Memory),
            "RECORDING" => Ok(Self::Recording),
            other => Err(Error::UnknownValue {
                kind: "device status",
                value: other.to_string(),
            }),
        }
    }
}

/// The status sub-channel a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusChannel {
    Memory,
    Stream,
    Connect,
}

impl StatusChannel {
    /// Parse the topic segment naming the channel.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "memory" => Some(Self::Memory),
            "stream" => Some(Self::Stream),
            "connect" => Some(Self::Connect),
            _ => None,
        }
    }

    pub const fn as_segment(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Stream => "stream",
            Self::Connect => "connect",
        }
    }

    /// Status a device has while this channel reports `"ON"`.
    const fn active_status(self) -> DeviceStatus {
        match self {
            Self::Memory => DeviceStatus::Memory,
            Self::Stream => DeviceStatus::Streaming,
            Self::Connect => DeviceStatus::Recording,
        }
    }
}

impl fmt::Display for StatusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_segment())
    }
}

/// Map a status-channel message to the device status it implies.
///
/// Only an exact `"ON"` activates a channel; any other payload means the
/// device is off.
pub fn project(channel: StatusChannel, payload: &str) -> DeviceStatus {
    if payload == STATUS_ON {
        channel.active_status()
    } else {
        DeviceStatus::Off
    }
}

/// Derived liveness: the device changed status within the last
/// [`ONLINE_WINDOW_SECS`] and is not off.
pub fn is_online(status: DeviceStatus, last_seen: i64, now: i64) -> bool {
    status != DeviceStatus::Off && now - last_seen < ONLINE_WINDOW_SECS
}
