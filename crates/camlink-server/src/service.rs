//! The explicitly constructed engine instance shared by the HTTP layer.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::info;

use camlink_core::DeviceCommand;
use camlink_core::config::TimeoutConfig;
use camlink_core::db::DatabaseError;

use crate::correlator::{CommandCorrelator, CommandError};
use crate::pairing::{self, PairingError, PairingNegotiator};
use crate::router::TopicRouter;
use crate::storage::{CamDatabase, DeviceRepository};
use crate::transport::Publisher;

#[derive(Debug, thiserror::Error)]
pub enum PairingStartError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Pairing(#[from] PairingError),
}

/// Where a pairing token stands, as seen by a polling client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    Paired,
    /// The token belongs to a device paired to someone else.
    PairedElsewhere,
    Waiting,
    Unknown,
}

/// Owns the correlator, the negotiator and the inbound router.
pub struct CamService {
    db: CamDatabase,
    publisher: Arc<dyn Publisher>,
    correlator: CommandCorrelator,
    negotiator: PairingNegotiator,
    router: Arc<TopicRouter>,
    pairing_timeout: Duration,
}

impl CamService {
    pub fn new(db: CamDatabase, publisher: Arc<dyn Publisher>, timeouts: &TimeoutConfig) -> Self {
        let correlator = CommandCorrelator::new(Arc::clone(&publisher), timeouts.command_timeout());
        let negotiator = PairingNegotiator::new();
        let router = Arc::new(TopicRouter::new(
            correlator.clone(),
            negotiator.clone(),
            Arc::new(db.clone()),
            Arc::new(db.clone()),
        ));
        Self {
            db,
            publisher,
            correlator,
            negotiator,
            router,
            pairing_timeout: timeouts.pairing_timeout(),
        }
    }

    pub const fn db(&self) -> &CamDatabase {
        &self.db
    }

    /// Handler for the transport's inbound traffic.
    pub fn router(&self) -> Arc<TopicRouter> {
        Arc::clone(&self.router)
    }

    pub const fn correlator(&self) -> &CommandCorrelator {
        &self.correlator
    }

    pub const fn negotiator(&self) -> &PairingNegotiator {
        &self.negotiator
    }

    pub const fn pairing_timeout(&self) -> Duration {
        self.pairing_timeout
    }

    pub fn is_connected(&self) -> bool {
        self.publisher.is_connected()
    }

    /// Send `command` to the device with `token` and wait for its reply.
    pub async fn send_command(
        &self,
        token: &str,
        command: &DeviceCommand,
    ) -> Result<Value, CommandError> {
        self.correlator.send_command(token, command).await
    }

    /// Allocate a fresh token for `owner_id` and start waiting for the
    /// device to announce it. Returns as soon as the wait is registered.
    pub async fn start_pairing(&self, owner_id: &str) -> Result<String, PairingStartError> {
        let token = pairing::allocate_token(&self.db, &self.negotiator).await?;
        let wait = self.negotiator.begin(&token)?;
        let devices: Arc<dyn DeviceRepository> = Arc::new(self.db.clone());
        pairing::spawn_pairing_session(wait, devices, owner_id.to_string(), self.pairing_timeout);
        info!(owner_id = %owner_id, token = %token, "Pairing started");
        Ok(token)
    }

    /// Pairing progress of `token` for `owner_id`.
    pub async fn pairing_state(
        &self,
        owner_id: &str,
        token: &str,
    ) -> Result<PairingState, DatabaseError> {
        if let Some(device) = self.db.get_device_by_token(token).await? {
            return Ok(if device.owner_id.as_deref() == Some(owner_id) {
                PairingState::Paired
            } else {
                PairingState::PairedElsewhere
            });
        }
        if self.negotiator.is_waiting(token) {
            return Ok(PairingState::Waiting);
        }
        Ok(PairingState::Unknown)
    }

    /// Fail every waiting caller, then close the transport.
    pub async fn shutdown(&self) {
        let commands = self.correlator.cancel_all();
        let pairings = self.negotiator.cancel_all();
        info!(commands, pairings, "Cancelled pending waiters");
        self.publisher.disconnect().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::RecordingPublisher;
    use serde_json::json;

    async fn service() -> (CamService, Arc<RecordingPublisher>) {
        let db = CamDatabase::open_in_memory().await.unwrap();
        db.create_user("u1", "alice", "hash").await.unwrap();
        let publisher = Arc::new(RecordingPublisher::connected());
        let service = CamService::new(db, publisher.clone(), &TimeoutConfig::default());
        (service, publisher)
    }

    #[tokio::test]
    async fn pairing_flow_reaches_paired() {
        let (service, _publisher) = service().await;
        let token = service.start_pairing("u1").await.unwrap();
        assert_eq!(
            service.pairing_state("u1", &token).await.unwrap(),
            PairingState::Waiting
        );

        service
            .router()
            .route(&format!("api/{token}/pair"), br#"{"deviceInfo":"x"}"#);

        let mut state = PairingState::Waiting;
        for _ in 0..50 {
            state = service.pairing_state("u1", &token).await.unwrap();
            if state == PairingState::Paired {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state, PairingState::Paired);
        assert_eq!(
            service.pairing_state("u1", "ffffffffffffffff").await.unwrap(),
            PairingState::Unknown
        );
        assert_eq!(
            service.pairing_state("u2", &token).await.unwrap(),
            PairingState::PairedElsewhere
        );
    }

    #[tokio::test]
    async fn shutdown_cancels_and_disconnects() {
        let (service, publisher) = service().await;
        let service = Arc::new(service);

        let task = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .send_command("0123456789abcdef", &DeviceCommand::get_memory("r1", "f"))
                    .await
            })
        };
        publisher.wait_for_publish(1).await;
        let token = service.start_pairing("u1").await.unwrap();

        service.shutdown().await;
        assert!(matches!(task.await.unwrap(), Err(CommandError::Cancelled)));
        assert!(!service.negotiator().is_waiting(&token));
        assert!(!service.is_connected());

        // Late traffic after shutdown is harmless.
        assert!(!service.correlator().deliver("0123456789abcdef", camlink_core::CommandKind::Memory, json!({})));
    }
}
