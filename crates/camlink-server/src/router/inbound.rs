//! Routes each inbound publication to exactly one handler.
//!
//! Pairing announcements and memory replies only touch in-memory tables and
//! are handled inline. Anything that writes to storage is queued on the
//! device's lane, so a slow database never stalls the transport's delivery
//! loop and one device's writes land in the order its messages arrived.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use camlink_core::command::{self, RecordAnnouncement};
use camlink_core::status;
use camlink_core::topic::{self, InboundTopic};
use camlink_core::validate;
use camlink_core::{CommandKind, StatusChannel};

use super::lanes::{DeviceLanes, Persisted};
use crate::correlator::CommandCorrelator;
use crate::pairing::PairingNegotiator;
use crate::storage::{DeviceRepository, RecordRepository};
use crate::transport::InboundHandler;

#[derive(Clone)]
pub struct TopicRouter {
    correlator: CommandCorrelator,
    negotiator: PairingNegotiator,
    devices: Arc<dyn DeviceRepository>,
    records: Arc<dyn RecordRepository>,
    lanes: DeviceLanes,
}

impl TopicRouter {
    pub fn new(
        correlator: CommandCorrelator,
        negotiator: PairingNegotiator,
        devices: Arc<dyn DeviceRepository>,
        records: Arc<dyn RecordRepository>,
    ) -> Self {
        Self {
            correlator,
            negotiator,
            devices,
            records,
            lanes: DeviceLanes::new(),
        }
    }

    /// Route one publication.
    ///
    /// Returns a completion signal when storage work was queued.
    /// Unknown topics and malformed JSON are logged and dropped.
    pub fn route(&self, topic: &str, payload: &[u8]) -> Option<Persisted> {
        let Some(inbound) = topic::classify(topic) else {
            debug!(topic = %topic, "Ignoring unroutable topic");
            return None;
        };

        match inbound {
            InboundTopic::Pairing { token } => {
                let announcement = parse_json(topic, payload)?;
                if self.negotiator.deliver(token, announcement) {
                    info!(token = %token, "Pairing announcement received");
                }
                None
            }
            InboundTopic::Status { token, channel } => Some(self.apply_status(token, channel, payload)),
            InboundTopic::CommandReply {
                token,
                kind: CommandKind::Memory,
            } => {
                let reply = parse_json(topic, payload)?;
                self.correlator.deliver(token, CommandKind::Memory, reply);
                None
            }
            InboundTopic::CommandReply {
                token,
                kind: CommandKind::Streaming,
            } => {
                let reply = parse_json(topic, payload)?;
                Some(self.streaming_reply(token, reply))
            }
            InboundTopic::RecordArrival { token } => {
                let announcement = parse_record(topic, payload)?;
                Some(self.record_arrival(token, announcement))
            }
        }
    }

    fn apply_status(&self, token: &str, channel: StatusChannel, payload: &[u8]) -> Persisted {
        let raw = String::from_utf8_lossy(payload);
        let projected = status::project(channel, &raw);
        let devices = Arc::clone(&self.devices);
        let owned = token.to_string();

        self.lanes.submit(token, async move {
            let token = owned;
            match devices.update_status(&token, projected).await {
                Ok(true) => {
                    debug!(token = %token, channel = %channel, status = %projected, "Device status updated");
                }
                Ok(false) => debug!(token = %token, "Status for unknown device ignored"),
                Err(e) => warn!(token = %token, error = %e, "Failed to store device status"),
            }
        })
    }

    /// Persist the stream URL first, then wake the caller, so the reply the
    /// caller sees and the stored URL agree.
    fn streaming_reply(&self, token: &str, reply: Value) -> Persisted {
        let devices = Arc::clone(&self.devices);
        let correlator = self.correlator.clone();
        let owned = token.to_string();

        self.lanes.submit(token, async move {
            let token = owned;
            if let Some(url) = command::stream_url(&reply) {
                match devices.set_streaming_url(&token, url).await {
                    Ok(true) => info!(token = %token, url = %url, "Stream URL stored"),
                    Ok(false) => debug!(token = %token, "Stream URL for unknown device ignored"),
                    // The caller still gets the device's reply.
                    Err(e) => warn!(token = %token, error = %e, "Failed to store stream URL"),
                }
            }
            correlator.deliver(&token, CommandKind::Streaming, reply);
        })
    }

    fn record_arrival(&self, token: &str, announcement: RecordAnnouncement) -> Persisted {
        let devices = Arc::clone(&self.devices);
        let records = Arc::clone(&self.records);
        let owned = token.to_string();

        self.lanes.submit(token, async move {
            let token = owned;
            let device = match devices.find_by_token(&token).await {
                Ok(Some(device)) => device,
                Ok(None) => {
                    warn!(token = %token, "Record announced by unknown device");
                    return;
                }
                Err(e) => {
                    warn!(token = %token, error = %e, "Device lookup failed");
                    return;
                }
            };
            match records.create_record(&device.id, &announcement).await {
                Ok(record) => info!(
                    token = %token,
                    record_id = %record.id,
                    folder = %record.folder_name,
                    "Record stored"
                ),
                Err(e) => warn!(token = %token, error = %e, "Failed to store record"),
            }
        })
    }
}

impl InboundHandler for TopicRouter {
    fn handle(&self, topic: &str, payload: &[u8]) {
        self.route(topic, payload);
    }
}

fn parse_json(topic: &str, payload: &[u8]) -> Option<Value> {
    match serde_json::from_slice(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(topic = %topic, error = %e, "Dropping malformed JSON payload");
            None
        }
    }
}

fn parse_record(topic: &str, payload: &[u8]) -> Option<RecordAnnouncement> {
    match serde_json::from_slice::<RecordAnnouncement>(payload) {
        Ok(mut announcement) => {
            announcement.folder_name = validate::sanitize(&announcement.folder_name);
            if announcement.folder_name.is_empty() {
                warn!(topic = %topic, "Dropping record announcement without folder name");
                return None;
            }
            Some(announcement)
        }
        Err(e) => {
            warn!(topic = %topic, error = %e, "Dropping malformed record announcement");
            None
        }
    }
}
