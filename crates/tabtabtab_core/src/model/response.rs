//! Handler response records.
//!
//! # Responsibility
//! - Define what `on_copy`, `on_paste` and `on_context_request` hand back.
//! - Keep the paste payload an explicit sum type, never two nullable fields.
//!
//! # Invariants
//! - A serialized `PasteResponse` carries at most one of `notification` or
//!   `immediate_paste`.
//! - `PasteResponse::is_accepted()` is true iff a payload is present or a
//!   background task was started.
//! - `is_processing_task` is always present on the wire.

use crate::model::notification::{ImmediatePaste, Notification};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response returned by `on_copy`.
///
/// Payloads written against the legacy contract omit `is_processing_task`;
/// it defaults to `false` when decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyResponse {
    /// Notification surfaced to the user right away.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    /// A background task was started; its result arrives as a push
    /// notification instead of in this response.
    #[serde(default)]
    pub is_processing_task: bool,
}

impl CopyResponse {
    /// Response that only surfaces a notification.
    pub fn notify(notification: Notification) -> Self {
        Self {
            notification: Some(notification),
            is_processing_task: false,
        }
    }

    /// Response that only acknowledges a started background task.
    pub fn processing() -> Self {
        Self {
            notification: None,
            is_processing_task: true,
        }
    }

    pub fn with_processing_task(mut self, is_processing_task: bool) -> Self {
        self.is_processing_task = is_processing_task;
        self
    }
}

/// What an extension offers for a paste event.
///
/// Serializes as the bare inner record; [`PastePayload::wire_key`] names the
/// key it sits under inside a `PasteResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PastePayload {
    Notification(Notification),
    ImmediatePaste(ImmediatePaste),
}

impl PastePayload {
    /// Wire key the payload serializes under.
    pub fn wire_key(&self) -> &'static str {
        match self {
            Self::Notification(_) => "notification",
            Self::ImmediatePaste(_) => "immediate_paste",
        }
    }
}

impl From<Notification> for PastePayload {
    fn from(value: Notification) -> Self {
        Self::Notification(value)
    }
}

impl From<ImmediatePaste> for PastePayload {
    fn from(value: ImmediatePaste) -> Self {
        Self::ImmediatePaste(value)
    }
}

/// Response returned by `on_paste`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PasteResponseWire", into = "PasteResponseWire")]
pub struct PasteResponse {
    pub paste: Option<PastePayload>,
    pub is_processing_task: bool,
}

impl PasteResponse {
    /// Response carrying literal replacement content.
    pub fn immediate(content: impl Into<String>) -> Self {
        Self {
            paste: Some(PastePayload::ImmediatePaste(ImmediatePaste::new(content))),
            is_processing_task: false,
        }
    }

    /// Response carrying a notification instead of content.
    pub fn notify(notification: Notification) -> Self {
        Self {
            paste: Some(PastePayload::Notification(notification)),
            is_processing_task: false,
        }
    }

    /// Response that only acknowledges a started background task.
    pub fn processing() -> Self {
        Self {
            paste: None,
            is_processing_task: true,
        }
    }

    pub fn with_processing_task(mut self, is_processing_task: bool) -> Self {
        self.is_processing_task = is_processing_task;
        self
    }

    /// Returns true when the extension took the paste request.
    pub fn is_accepted(&self) -> bool {
        self.paste.is_some() || self.is_processing_task
    }

    pub fn immediate_paste(&self) -> Option<&ImmediatePaste> {
        match &self.paste {
            Some(PastePayload::ImmediatePaste(paste)) => Some(paste),
            _ => None,
        }
    }

    pub fn notification(&self) -> Option<&Notification> {
        match &self.paste {
            Some(PastePayload::Notification(notification)) => Some(notification),
            _ => None,
        }
    }
}

/// Flat wire rendering used by serde for `PasteResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PasteResponseWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notification: Option<Notification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    immediate_paste: Option<ImmediatePaste>,
    #[serde(default)]
    is_processing_task: bool,
}

/// Wire object that populates both paste branches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("paste response must not carry both `notification` and `immediate_paste`")]
pub struct AmbiguousPastePayload;

impl TryFrom<PasteResponseWire> for PasteResponse {
    type Error = AmbiguousPastePayload;

    fn try_from(value: PasteResponseWire) -> Result<Self, Self::Error> {
        let paste = match (value.notification, value.immediate_paste) {
            (Some(_), Some(_)) => return Err(AmbiguousPastePayload),
            (Some(notification), None) => Some(PastePayload::Notification(notification)),
            (None, Some(paste)) => Some(PastePayload::ImmediatePaste(paste)),
            (None, None) => None,
        };
        Ok(Self {
            paste,
            is_processing_task: value.is_processing_task,
        })
    }
}

impl From<PasteResponse> for PasteResponseWire {
    fn from(value: PasteResponse) -> Self {
        let (notification, immediate_paste) = match value.paste {
            Some(PastePayload::Notification(notification)) => (Some(notification), None),
            Some(PastePayload::ImmediatePaste(paste)) => (None, Some(paste)),
            None => (None, None),
        };
        Self {
            notification,
            immediate_paste,
            is_processing_task: value.is_processing_task,
        }
    }
}

/// One chunk of supplementary context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionContext {
    /// Human-readable label of what this chunk is.
    pub description: String,
    /// Content handed to the requester.
    pub context: String,
}

impl ExtensionContext {
    pub fn new(description: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            context: context.into(),
        }
    }
}

/// Ordered context chunks returned by `on_context_request`.
///
/// Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OnContextResponse {
    pub contexts: Vec<ExtensionContext>,
}

impl OnContextResponse {
    pub fn new(contexts: Vec<ExtensionContext>) -> Self {
        Self { contexts }
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }
}

impl FromIterator<ExtensionContext> for OnContextResponse {
    fn from_iter<I: IntoIterator<Item = ExtensionContext>>(iter: I) -> Self {
        Self {
            contexts: iter.into_iter().collect(),
        }
    }
}
