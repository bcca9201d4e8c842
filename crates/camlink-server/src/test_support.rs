//! In-process doubles for driving the engine without a broker.
//!
//! Used by unit tests and by the integration tests under `tests/`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::transport::{Publisher, TransportError};

/// A [`Publisher`] that records every publication.
#[derive(Default)]
pub struct RecordingPublisher {
    connected: AtomicBool,
    published: Mutex<Vec<(String, Vec<u8>)>>,
    notify: Notify,
}

impl RecordingPublisher {
    pub fn connected() -> Self {
        Self {
            connected: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Snapshot of `(topic, payload)` pairs in publish order.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait (up to five seconds) until at least `count` messages went out.
    pub async fn wait_for_publish(&self, count: usize) {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.published().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        let _ = tokio::time::timeout(Duration::from_secs(5), wait).await;
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((topic.to_string(), payload));
        self.notify.notify_waiters();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.set_connected(false);
    }
}
