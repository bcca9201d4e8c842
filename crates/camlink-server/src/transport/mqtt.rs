//! MQTT transport over a single `rumqttc` connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use camlink_core::config::MqttConfig;
use camlink_core::topic::SUBSCRIPTIONS;

use super::{InboundHandler, Publisher, TransportError};

/// Publishing half of the MQTT connection.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

/// Receiving half; drives the connection once spawned.
pub struct MqttEventLoop {
    eventloop: EventLoop,
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    reconnect_period: Duration,
}

impl MqttTransport {
    /// Build the client. Nothing touches the network until the returned
    /// event loop is spawned.
    pub fn new(config: &MqttConfig) -> Result<(Self, MqttEventLoop), TransportError> {
        let (host, port) = config.broker_address()?;

        let mut options = MqttOptions::new(&config.client_id, host, port);
        options.set_keep_alive(config.keep_alive());
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user, pass);
        }

        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);
        let connected = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let transport = Self {
            client: client.clone(),
            connected: Arc::clone(&connected),
            running: Arc::clone(&running),
        };
        let event_loop = MqttEventLoop {
            eventloop,
            client,
            connected,
            running,
            reconnect_period: config.reconnect_period(),
        };
        Ok((transport, event_loop))
    }
}

#[async_trait]
impl Publisher for MqttTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stop the event loop and send a DISCONNECT.
    async fn disconnect(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        if let Err(e) = self.client.disconnect().await {
            debug!(error = %e, "MQTT disconnect request not delivered");
        }
        info!("Disconnected from MQTT broker");
    }
}

impl MqttEventLoop {
    /// Poll the connection until shutdown, handing every inbound
    /// publication to `handler`.
    pub fn spawn(self, handler: Arc<dyn InboundHandler>) -> JoinHandle<()> {
        tokio::spawn(self.run(handler))
    }

    async fn run(mut self, handler: Arc<dyn InboundHandler>) {
        while self.running.load(Ordering::SeqCst) {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    handler.handle(&publish.topic, &publish.payload);
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    self.connected.store(true, Ordering::SeqCst);
                    info!("Connected to MQTT broker");
                    self.resubscribe();
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    warn!("MQTT broker closed the connection");
                }
                Ok(_) => {}
                Err(e) => {
                    self.connected.store(false, Ordering::SeqCst);
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    error!(
                        error = %e,
                        retry_in_secs = self.reconnect_period.as_secs(),
                        "MQTT connection error"
                    );
                    tokio::time::sleep(self.reconnect_period).await;
                }
            }
        }
        info!("MQTT event loop stopped");
    }

    /// Subscriptions do not survive a clean-session reconnect.
    fn resubscribe(&self) {
        let client = self.client.clone();
        // Subscribe requests are queued to this very loop; do it off-loop.
        tokio::spawn(async move {
            for topic in SUBSCRIPTIONS {
                match client.subscribe(topic, QoS::AtLeastOnce).await {
                    Ok(()) => debug!(topic, "Subscribed"),
                    Err(e) => warn!(topic, error = %e, "Subscribe failed"),
                }
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_fails_fast_before_connack() {
        let (transport, _event_loop) = MqttTransport::new(&MqttConfig::default()).unwrap();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.publish("api/t/cam/memory", b"{}".to_vec()).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn bad_broker_url_is_rejected() {
        let config = MqttConfig {
            broker_url: "ws://broker:8080".to_string(),
            ..MqttConfig::default()
        };
        assert!(matches!(
            MqttTransport::new(&config),
            Err(TransportError::Config(_))
        ));
    }
}
