//! Message bus transport.
//!
//! The correlator publishes through [`Publisher`]; inbound publications are
//! handed to an [`InboundHandler`] by whichever transport drives the
//! connection.

mod mqtt;

pub use mqtt::{MqttEventLoop, MqttTransport};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Not connected to the broker")]
    NotConnected,

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Invalid transport configuration: {0}")]
    Config(#[from] camlink_core::Error),
}

/// Outbound half of the transport.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `payload` on `topic`. Fails fast when the link is down.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Close the link. Publishing afterwards fails with `NotConnected`.
    async fn disconnect(&self) {}
}

/// Receiver of inbound publications. Must return quickly: it runs on the
/// transport's delivery loop.
pub trait InboundHandler: Send + Sync {
    fn handle(&self, topic: &str, payload: &[u8]);
}
