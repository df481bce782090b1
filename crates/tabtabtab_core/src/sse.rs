//! Notification-sender capability consumed by extensions.
//!
//! # Responsibility
//! - Define the boundary to the host's server-sent-event transport.
//! - Provide an in-process channel sender for hosts and tests.
//!
//! # Invariants
//! - Events for one device leave the channel sender in send order.
//! - No delivery confirmation is implied by a successful send.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

/// Event name used for extension push notifications.
pub const EXTENSION_NOTIFICATION_EVENT: &str = "extension_notification";

/// Sender failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SseError {
    #[error("notification channel is closed")]
    ChannelClosed,
    #[error("sse transport failed: {0}")]
    Transport(String),
}

/// Host transport that pushes events to a device's SSE connection.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_event(
        &self,
        device_id: &str,
        event_name: &str,
        data: Map<String, Value>,
    ) -> Result<(), SseError>;
}

/// One event handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseEvent {
    pub device_id: String,
    pub event_name: String,
    pub data: Map<String, Value>,
}

/// Sender that forwards events into a bounded mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelNotificationSender {
    tx: mpsc::Sender<SseEvent>,
}

impl ChannelNotificationSender {
    /// Creates a sender plus the receiving end drained by the transport.
    ///
    /// `capacity` is clamped to at least one slot.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SseEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSender for ChannelNotificationSender {
    async fn send_event(
        &self,
        device_id: &str,
        event_name: &str,
        data: Map<String, Value>,
    ) -> Result<(), SseError> {
        self.tx
            .send(SseEvent {
                device_id: device_id.to_string(),
                event_name: event_name.to_string(),
                data,
            })
            .await
            .map_err(|_| SseError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelNotificationSender, NotificationSender, SseError};
    use serde_json::{Map, Value};

    #[tokio::test]
    async fn channel_sender_preserves_order_per_device() {
        let (sender, mut rx) = ChannelNotificationSender::new(4);
        for index in 0..3 {
            let mut data = Map::new();
            data.insert("index".to_string(), Value::from(index));
            sender
                .send_event("device-1", "extension_notification", data)
                .await
                .expect("send event");
        }

        for expected in 0..3 {
            let event = rx.recv().await.expect("event");
            assert_eq!(event.device_id, "device-1");
            assert_eq!(event.data["index"], expected);
        }
    }

    #[tokio::test]
    async fn channel_sender_reports_closed_receiver() {
        let (sender, rx) = ChannelNotificationSender::new(1);
        drop(rx);
        let err = sender
            .send_event("device-1", "extension_notification", Map::new())
            .await
            .expect_err("closed channel should fail");
        assert_eq!(err, SseError::ChannelClosed);
    }
}
