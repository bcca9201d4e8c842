//! SQLite storage for the camlink server.
//!
//! Provides persistence for users, paired devices, and device recordings,
//! plus the repository traits the message router persists through.

mod db;
mod models;
mod queries;
mod queries_devices;
mod queries_records;
mod repository;


pub use camlink_core::db::DatabaseError;
pub use db::CamDatabase;
pub use models::*;
pub use repository::{DeviceRepository, RecordRepository};
