//! First-time device pairing.
//!
//! A client asks for a fresh token, gets it back straight away, and types it
//! into the camera. The camera then announces itself on `api/{token}/pair`.
//! The [`PairingNegotiator`] holds one waiter per token until that
//! announcement arrives or the (long) deadline passes; the background
//! session spawned by [`spawn_pairing_session`] then creates the device.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use camlink_core::db::DatabaseError;

use crate::registry::{PendingGuard, PendingTable, WaitError};
use crate::storage::DeviceRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("No pairing announcement before the deadline")]
    Timeout,

    #[error("A pairing wait is already registered for this token")]
    AlreadyWaiting,

    #[error("Pairing cancelled")]
    Cancelled,
}

impl From<WaitError> for PairingError {
    fn from(e: WaitError) -> Self {
        match e {
            WaitError::Timeout => Self::Timeout,
            WaitError::Cancelled => Self::Cancelled,
        }
    }
}

/// A registered pairing wait. Dropping it withdraws the registration.
pub struct PairingWait {
    guard: PendingGuard<String, Value>,
}

impl PairingWait {
    pub fn token(&self) -> &str {
        self.guard.key()
    }

    /// Wait for the announcement until `timeout` elapses.
    pub async fn wait(self, timeout: Duration) -> Result<Value, PairingError> {
        Ok(self.guard.wait(timeout).await?)
    }
}

/// One-shot waiters keyed by pairing token.
#[derive(Clone, Default)]
pub struct PairingNegotiator {
    pending: PendingTable<String, Value>,
}

impl PairingNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `token` without waiting yet.
    ///
    /// Registering before the token is handed out means an announcement
    /// can never slip in ahead of the waiter.
    pub fn begin(&self, token: &str) -> Result<PairingWait, PairingError> {
        let guard = self
            .pending
            .register(token.to_string())
            .map_err(|_| PairingError::AlreadyWaiting)?;
        Ok(PairingWait { guard })
    }

    /// Wait up to `timeout` for the device holding `token` to announce itself.
    pub async fn await_pairing(&self, token: &str, timeout: Duration) -> Result<Value, PairingError> {
        self.begin(token)?.wait(timeout).await
    }

    /// Hand an announcement to the waiter for `token`.
    ///
    /// Returns `false` when nobody is waiting (unrequested, already paired,
    /// or expired).
    pub fn deliver(&self, token: &str, announcement: Value) -> bool {
        let delivered = self.pending.resolve(&token.to_string(), announcement);
        if !delivered {
            debug!(token = %token, "Pairing announcement with no waiter dropped");
        }
        delivered
    }

    pub fn is_waiting(&self, token: &str) -> bool {
        self.pending.contains(&token.to_string())
    }

    pub fn waiting(&self) -> usize {
        self.pending.len()
    }

    pub fn cancel_all(&self) -> usize {
        self.pending.cancel_all()
    }
}

/// Random 16-character lowercase hex token.
pub fn generate_token() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Generate a token no existing device uses and no pairing wait holds.
pub async fn allocate_token(
    devices: &dyn DeviceRepository,
    negotiator: &PairingNegotiator,
) -> Result<String, DatabaseError> {
    loop {
        let token = generate_token();
        if negotiator.is_waiting(&token) || devices.token_exists(&token).await? {
            debug!("Generated token collided, retrying");
            continue;
        }
        return Ok(token);
    }
}

/// Wait for `wait`'s announcement in the background and, on success, create
/// the device for `owner_id`.
///
/// The outcome is only logged: the request that started pairing has
/// already returned the token to its client.
pub fn spawn_pairing_session(
    wait: PairingWait,
    devices: Arc<dyn DeviceRepository>,
    owner_id: String,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let token = wait.token().to_string();
        match wait.wait(timeout).await {
            Ok(announcement) => match devices.create_paired_device(&token, &owner_id).await {
                Ok(device) => info!(
                    token = %token,
                    device_id = %device.id,
                    owner_id = %owner_id,
                    announcement = %announcement,
                    "Device paired"
                ),
                Err(e) => error!(
                    token = %token,
                    owner_id = %owner_id,
                    error = %e,
                    "Pairing announced but device creation failed"
                ),
            },
            Err(PairingError::Timeout) => warn!(
                token = %token,
                owner_id = %owner_id,
                timeout_secs = timeout.as_secs(),
                "Pairing timed out"
            ),
            Err(e) => info!(token = %token, reason = %e, "Pairing session ended"),
        }
    })
}
