//! Request/response over a fire-and-forget bus.
//!
//! [`CommandCorrelator::send_and_await`] registers a waiter keyed by
//! `(kind, token)`, publishes the command on the device's command topic and
//! suspends until the router delivers a reply on the same topic, the
//! deadline elapses, or the publish itself fails.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use camlink_core::{CommandKind, DeviceCommand};

use crate::registry::{PendingTable, WaitError};
use crate::transport::{Publisher, TransportError};

type CommandKey = (CommandKind, String);

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Device did not reply within {0:?}")]
    DeviceTimeout(Duration),

    #[error("Message transport unavailable: {0}")]
    TransportUnavailable(#[source] TransportError),

    #[error("A {0} command is already in flight for this device")]
    RequestInFlight(CommandKind),

    #[error("Command cancelled")]
    Cancelled,

    #[error("Failed to encode command: {0}")]
    Encode(#[from] camlink_core::Error),
}

/// Matches device replies to the callers waiting on them.
#[derive(Clone)]
pub struct CommandCorrelator {
    publisher: Arc<dyn Publisher>,
    pending: PendingTable<CommandKey, Value>,
    default_timeout: Duration,
}

impl CommandCorrelator {
    pub fn new(publisher: Arc<dyn Publisher>, default_timeout: Duration) -> Self {
        Self {
            publisher,
            pending: PendingTable::new(),
            default_timeout,
        }
    }

    /// Send `command` to the device with `token` and wait for its reply using
    /// the configured deadline.
    pub async fn send_command(
        &self,
        token: &str,
        command: &DeviceCommand,
    ) -> Result<Value, CommandError> {
        let payload = command.to_payload()?;
        self.send_and_await(token, command.kind(), payload, self.default_timeout)
            .await
    }

    /// Publish `payload` on the `kind` command topic of `token` and wait up
    /// to `timeout` for the reply.
    ///
    /// Dropping the returned future withdraws the registration.
    pub async fn send_and_await(
        &self,
        token: &str,
        kind: CommandKind,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Value, CommandError> {
        let guard = self
            .pending
            .register((kind, token.to_string()))
            .map_err(|_| CommandError::RequestInFlight(kind))?;

        let topic = kind.topic(token);
        if let Err(e) = self.publisher.publish(&topic, payload).await {
            warn!(token = %token, kind = %kind, error = %e, "Command publish failed");
            // Guard drop removes the entry.
            return Err(CommandError::TransportUnavailable(e));
        }
        debug!(token = %token, kind = %kind, "Command published, awaiting reply");

        match guard.wait(timeout).await {
            Ok(reply) => Ok(reply),
            Err(WaitError::Timeout) => {
                info!(token = %token, kind = %kind, timeout_ms = timeout.as_millis(), "Device reply timed out");
                Err(CommandError::DeviceTimeout(timeout))
            }
            Err(WaitError::Cancelled) => Err(CommandError::Cancelled),
        }
    }

    /// Hand a reply to whoever is waiting on `(kind, token)`.
    ///
    /// Returns `false` when nobody is waiting; late and duplicate replies
    /// are dropped.
    pub fn deliver(&self, token: &str, kind: CommandKind, reply: Value) -> bool {
        let delivered = self.pending.resolve(&(kind, token.to_string()), reply);
        if !delivered {
            debug!(token = %token, kind = %kind, "Reply with no waiting caller dropped");
        }
        delivered
    }

    /// Whether a command of `kind` is in flight for `token`.
    pub fn is_pending(&self, token: &str, kind: CommandKind) -> bool {
        self.pending.contains(&(kind, token.to_string()))
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Fail every waiting caller with [`CommandError::Cancelled`].
    pub fn cancel_all(&self) -> usize {
        self.pending.cancel_all()
    }
}
