//! camlink Server Library
//!
//! Core functionality for the camlink server:
//! - Pending-request tables with exactly-once resolution
//! - Command correlation over the MQTT bus and device pairing
//! - Inbound topic routing and status projection side effects
//! - SQLite storage for users, devices, and recordings
//! - JWT authentication and the HTTP API

pub mod api;
pub mod auth;
pub mod correlator;
pub mod pairing;
pub mod registry;
pub mod router;
pub mod service;
pub mod storage;
pub mod transport;

#[doc(hidden)]
pub mod test_support;
