//! Extension contract implemented by every pluggable extension.
//!
//! # Responsibility
//! - Declare the three event handlers the host dispatches to.
//! - Carry the injected collaborators and the push-notification helper.
//!
//! # Invariants
//! - `Ok(None)` is a decline, never an error.
//! - `Err(_)` is a handler fault the host must contain per extension.
//! - Push notifications always carry the sending extension's id.

use crate::llm::{LlmError, LlmProcessor};
use crate::model::context::{ContextQuery, ContextValidationError, CopyContext, PasteContext};
use crate::model::notification::Notification;
use crate::model::response::{CopyResponse, OnContextResponse, PasteResponse};
use crate::sse::{NotificationSender, SseError, EXTENSION_NOTIFICATION_EVENT};
use async_trait::async_trait;
use log::info;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use thiserror::Error;

/// Result type shared by all handler operations.
pub type HandlerResult<T> = Result<Option<T>, ExtensionError>;

/// Handler fault raised out of an extension.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Sse(#[from] SseError),
    #[error(transparent)]
    InvalidContext(#[from] ContextValidationError),
    #[error("extension internal error: {0}")]
    Internal(String),
}

/// Collaborators injected into an extension at construction.
#[derive(Clone)]
pub struct ExtensionCollaborators {
    pub sse_sender: Arc<dyn NotificationSender>,
    pub llm_processor: Arc<dyn LlmProcessor>,
    pub extension_id: String,
}

impl ExtensionCollaborators {
    pub fn new(
        sse_sender: Arc<dyn NotificationSender>,
        llm_processor: Arc<dyn LlmProcessor>,
        extension_id: impl Into<String>,
    ) -> Self {
        let extension_id = extension_id.into();
        info!(
            "event=extension_init module=extension status=ok extension_id={}",
            extension_id
        );
        Self {
            sse_sender,
            llm_processor,
            extension_id,
        }
    }

    /// Stamps `notification` with the extension id and forwards it to the
    /// sender as an `extension_notification` event.
    pub async fn send_push_notification(
        &self,
        device_id: &str,
        notification: &Notification,
    ) -> Result<(), SseError> {
        let mut data = notification.to_map();
        data.insert(
            "extension_id".to_string(),
            Value::String(self.extension_id.clone()),
        );
        self.sse_sender
            .send_event(device_id, EXTENSION_NOTIFICATION_EVENT, data)
            .await
    }
}

impl Debug for ExtensionCollaborators {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionCollaborators")
            .field("extension_id", &self.extension_id)
            .finish_non_exhaustive()
    }
}

/// Capability every concrete extension implements.
///
/// Handlers may suspend on I/O (for example the LLM processor) but must
/// eventually return. Shared state observable by other extensions must not
/// be mutated.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Collaborators this extension was built with.
    fn collaborators(&self) -> &ExtensionCollaborators;

    /// Contributes context chunks for a query raised by `source_extension_id`.
    async fn on_context_request(
        &self,
        source_extension_id: &str,
        context_query: &ContextQuery,
    ) -> HandlerResult<OnContextResponse>;

    /// Reacts to a user copy. Declining is the common case.
    async fn on_copy(&self, context: &CopyContext) -> HandlerResult<CopyResponse>;

    /// Offers replacement content or a notification for a paste.
    async fn on_paste(&self, context: &PasteContext) -> HandlerResult<PasteResponse>;

    fn extension_id(&self) -> &str {
        &self.collaborators().extension_id
    }

    fn llm_processor(&self) -> &Arc<dyn LlmProcessor> {
        &self.collaborators().llm_processor
    }

    /// Sends an out-of-band notification, typically after a handler returned
    /// with `is_processing_task` set.
    async fn send_push_notification(
        &self,
        device_id: &str,
        notification: &Notification,
    ) -> Result<(), SseError> {
        self.collaborators()
            .send_push_notification(device_id, notification)
            .await
    }
}
