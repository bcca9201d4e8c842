//! In-memory tables of callers waiting on device traffic.

mod pending;

pub use pending::{PendingGuard, PendingTable, RegisterError, WaitError};
