//! Notification and immediate-paste value records.
//!
//! # Responsibility
//! - Define the user-visible notification shape surfaced by extensions.
//! - Define the literal paste payload an extension can hand back.
//!
//! # Invariants
//! - `status` alone determines client-visible severity.
//! - Wire keys are fixed: `notification_*` and `immediate_paste_content`.

use crate::model::ToJson;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

/// Closed severity tag for a notification.
///
/// Adding a variant is a breaking wire change: clients match on the
/// lowercase string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Work is still running; a follow-up notification is expected.
    Pending,
    /// Result is available.
    Ready,
    /// Extension hit a non-fatal, user-visible failure.
    Error,
}

impl NotificationStatus {
    /// Stable wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = StatusParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "error" => Ok(Self::Error),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// Unknown notification status string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("notification status is unsupported: {0} (expected pending|ready|error)")]
pub struct StatusParseError(pub String);

/// Push or inline notification surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Correlates the notification with the triggering event.
    #[serde(rename = "notification_request_id")]
    pub request_id: String,
    #[serde(rename = "notification_title")]
    pub title: String,
    #[serde(rename = "notification_detail")]
    pub detail: String,
    #[serde(rename = "notification_content")]
    pub content: String,
    #[serde(rename = "notification_status")]
    pub status: NotificationStatus,
}

impl Notification {
    pub fn new(
        request_id: impl Into<String>,
        title: impl Into<String>,
        detail: impl Into<String>,
        content: impl Into<String>,
        status: NotificationStatus,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            title: title.into(),
            detail: detail.into(),
            content: content.into(),
            status,
        }
    }

    pub fn pending(
        request_id: impl Into<String>,
        title: impl Into<String>,
        detail: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(request_id, title, detail, content, NotificationStatus::Pending)
    }

    pub fn ready(
        request_id: impl Into<String>,
        title: impl Into<String>,
        detail: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(request_id, title, detail, content, NotificationStatus::Ready)
    }

    pub fn error(
        request_id: impl Into<String>,
        title: impl Into<String>,
        detail: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(request_id, title, detail, content, NotificationStatus::Error)
    }

    /// Returns whether this is an extension-reported failure.
    pub fn is_error(&self) -> bool {
        self.status == NotificationStatus::Error
    }

    /// Serializes into a string-keyed map.
    ///
    /// Push delivery extends this map with `extension_id`, so it is exposed
    /// separately from [`ToJson::to_json`].
    pub fn to_map(&self) -> Map<String, Value> {
        match self.to_json() {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Literal text the client pastes verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmediatePaste {
    #[serde(rename = "immediate_paste_content")]
    pub content: String,
}

impl ImmediatePaste {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}
