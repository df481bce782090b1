//! Extension contract and data model for TabTabTab.
//! This crate is the single source of truth for what extensions receive,
//! return and push to devices.

pub mod config;
pub mod dispatch;
pub mod extension;
pub mod llm;
pub mod logging;
pub mod model;
pub mod sse;

pub use config::{ConfigError, HostConfig};
pub use dispatch::{DispatchEntry, DispatchReport, ExtensionHost, HandlerOutcome};
pub use extension::contract::{
    Extension, ExtensionCollaborators, ExtensionError, HandlerResult,
};
pub use extension::descriptor::{
    ExtensionDescriptor, ExtensionFactory, ExtensionId, InvalidExtensionId,
};
pub use extension::directory::{DirectoryError, ExtensionDirectory};
pub use llm::{
    ImageGenerationMode, LlmContext, LlmError, LlmModel, LlmOutput, LlmProcessor, LlmRequest,
    PredictionResponse, UnavailableLlmProcessor,
};
pub use logging::{
    default_log_level, init_from_config, init_logging, logging_status, LoggingError,
};
pub use model::context::{
    new_request_id, parse_timestamp, ContextQuery, ContextValidationError, CopyContext,
    PasteContext, Timestamp, WindowInfo,
};
pub use model::notification::{ImmediatePaste, Notification, NotificationStatus, StatusParseError};
pub use model::response::{
    AmbiguousPastePayload, CopyResponse, ExtensionContext, OnContextResponse, PastePayload,
    PasteResponse,
};
pub use model::ToJson;
pub use sse::{
    ChannelNotificationSender, NotificationSender, SseError, SseEvent,
    EXTENSION_NOTIFICATION_EVENT,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
