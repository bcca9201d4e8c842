//! camlink Core Library
//!
//! Shared functionality for camlink components:
//! - Topic grammar for the device message bus (`api/{token}/...`)
//! - Command kinds and the JSON command payloads sent to cameras
//! - Device status, status projection, and online derivation
//! - Configuration resolution and hierarchy
//! - Common error types, database helpers, and tracing setup

pub mod command;
pub mod config;
pub mod db;
pub mod error;
pub mod status;
pub mod topic;
pub mod tracing_init;
pub mod validate;

pub use command::{CommandKind, DeviceCommand, StreamAction};
pub use config::Config;
pub use error::{Error, Result};
pub use status::{DeviceStatus, StatusChannel};
pub use topic::InboundTopic;
