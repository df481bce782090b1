//! Reference host-side dispatcher.
//!
//! # Responsibility
//! - Fan one event out to every registered extension concurrently.
//! - Classify each extension's result as responded, declined or faulted.
//!
//! # Invariants
//! - A fault (error or panic) in one extension never aborts the dispatch.
//! - Declines are not failures and never produce a synthesized notification.
//! - Report entries follow extension registration order.
//! - No timeout is applied; a handler that never returns keeps the dispatch
//!   pending.

use crate::extension::contract::{Extension, HandlerResult};
use crate::extension::directory::{DirectoryError, ExtensionDirectory};
use crate::llm::LlmProcessor;
use crate::model::context::{ContextQuery, ContextValidationError, CopyContext, PasteContext};
use crate::model::response::{CopyResponse, OnContextResponse, PasteResponse};
use crate::model::ToJson;
use crate::sse::NotificationSender;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// What one extension did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome<T> {
    Responded(T),
    Declined,
    Faulted(String),
}

impl<T> HandlerOutcome<T> {
    pub fn response(&self) -> Option<&T> {
        match self {
            Self::Responded(response) => Some(response),
            _ => None,
        }
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined)
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, Self::Faulted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEntry<T> {
    pub extension_id: String,
    pub outcome: HandlerOutcome<T>,
}

/// Per-extension outcomes for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport<T> {
    pub request_id: String,
    pub entries: Vec<DispatchEntry<T>>,
}

impl<T> DispatchReport<T> {
    /// Responded extensions in registration order.
    pub fn responses(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().filter_map(|entry| {
            entry
                .outcome
                .response()
                .map(|response| (entry.extension_id.as_str(), response))
        })
    }

    /// Faulted extensions with their fault reason.
    pub fn faults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            HandlerOutcome::Faulted(reason) => {
                Some((entry.extension_id.as_str(), reason.as_str()))
            }
            _ => None,
        })
    }

    pub fn declined_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.is_declined())
            .count()
    }

    pub fn outcome_for(&self, extension_id: &str) -> Option<&HandlerOutcome<T>> {
        self.entries
            .iter()
            .find(|entry| entry.extension_id == extension_id)
            .map(|entry| &entry.outcome)
    }

    pub fn has_responses(&self) -> bool {
        self.responses().next().is_some()
    }
}

impl<T: ToJson> DispatchReport<T> {
    /// Renders responded outcomes only; declines and faults carry no content.
    pub fn to_json(&self) -> Value {
        let responses = self
            .responses()
            .map(|(extension_id, response)| {
                let mut map = Map::with_capacity(2);
                map.insert(
                    "extension_id".to_string(),
                    Value::String(extension_id.to_string()),
                );
                map.insert("response".to_string(), response.to_json());
                Value::Object(map)
            })
            .collect();
        let mut map = Map::with_capacity(2);
        map.insert(
            "request_id".to_string(),
            Value::String(self.request_id.clone()),
        );
        map.insert("responses".to_string(), Value::Array(responses));
        Value::Object(map)
    }
}

impl DispatchReport<PasteResponse> {
    /// First accepted paste response in registration order.
    pub fn first_accepted_paste(&self) -> Option<(&str, &PasteResponse)> {
        self.responses()
            .find(|(_, response)| response.is_accepted())
    }
}

impl DispatchReport<OnContextResponse> {
    /// All contributed chunks, concatenated in registration order.
    pub fn merged_contexts(&self) -> OnContextResponse {
        self.responses()
            .flat_map(|(_, response)| response.contexts.iter().cloned())
            .collect()
    }
}

/// Holds instantiated extensions and dispatches events to them.
#[derive(Default, Clone)]
pub struct ExtensionHost {
    extensions: Vec<Arc<dyn Extension>>,
}

impl ExtensionHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates every directory entry in dependency order.
    pub fn from_directory(
        directory: &ExtensionDirectory,
        sse_sender: Arc<dyn NotificationSender>,
        llm_processor: Arc<dyn LlmProcessor>,
    ) -> Result<Self, DirectoryError> {
        let mut host = Self::new();
        for extension_id in directory.initialization_order()? {
            let extension = directory.instantiate(
                extension_id.as_str(),
                Arc::clone(&sse_sender),
                Arc::clone(&llm_processor),
            )?;
            host.register(extension);
        }
        Ok(host)
    }

    pub fn register(&mut self, extension: Arc<dyn Extension>) {
        self.extensions.push(extension);
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn extension_ids(&self) -> Vec<&str> {
        self.extensions
            .iter()
            .map(|extension| extension.extension_id())
            .collect()
    }

    pub async fn dispatch_copy(
        &self,
        context: CopyContext,
    ) -> Result<DispatchReport<CopyResponse>, ContextValidationError> {
        context.validate()?;
        let request_id = context.request_id.clone();
        let context = Arc::new(context);
        let report = fan_out(request_id, self.extensions.clone(), move |extension| {
            let context = Arc::clone(&context);
            async move { extension.on_copy(&context).await }
        })
        .await;
        log_report("copy", &report);
        Ok(report)
    }

    pub async fn dispatch_paste(
        &self,
        context: PasteContext,
    ) -> Result<DispatchReport<PasteResponse>, ContextValidationError> {
        context.validate()?;
        let request_id = context.request_id.clone();
        let context = Arc::new(context);
        let report = fan_out(request_id, self.extensions.clone(), move |extension| {
            let context = Arc::clone(&context);
            async move { extension.on_paste(&context).await }
        })
        .await;
        log_report("paste", &report);
        Ok(report)
    }

    /// Asks every extension except the requester for context.
    pub async fn dispatch_context_request(
        &self,
        source_extension_id: &str,
        query: ContextQuery,
    ) -> Result<DispatchReport<OnContextResponse>, ContextValidationError> {
        query.validate()?;
        let request_id = query.request_id.clone();
        let query = Arc::new(query);
        let source: Arc<str> = Arc::from(source_extension_id);
        let targets = self
            .extensions
            .iter()
            .filter(|extension| extension.extension_id() != source_extension_id)
            .cloned()
            .collect();
        let report = fan_out(request_id, targets, move |extension| {
            let query = Arc::clone(&query);
            let source = Arc::clone(&source);
            async move { extension.on_context_request(&source, &query).await }
        })
        .await;
        log_report("context_request", &report);
        Ok(report)
    }
}

async fn fan_out<T, F, Fut>(
    request_id: String,
    targets: Vec<Arc<dyn Extension>>,
    call: F,
) -> DispatchReport<T>
where
    T: Send + 'static,
    F: Fn(Arc<dyn Extension>) -> Fut,
    Fut: Future<Output = HandlerResult<T>> + Send + 'static,
{
    let handles: Vec<_> = targets
        .into_iter()
        .map(|extension| {
            let extension_id = extension.extension_id().to_string();
            (extension_id, tokio::spawn(call(extension)))
        })
        .collect();

    let mut entries = Vec::with_capacity(handles.len());
    for (extension_id, handle) in handles {
        let outcome = match handle.await {
            Ok(Ok(Some(response))) => HandlerOutcome::Responded(response),
            Ok(Ok(None)) => HandlerOutcome::Declined,
            Ok(Err(err)) => {
                warn!(
                    "event=handler_fault module=dispatch status=error extension_id={} request_id={} error={}",
                    extension_id, request_id, err
                );
                HandlerOutcome::Faulted(err.to_string())
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "handler panicked"
                } else {
                    "handler task was cancelled"
                };
                warn!(
                    "event=handler_fault module=dispatch status=error extension_id={} request_id={} error={}",
                    extension_id, request_id, reason
                );
                HandlerOutcome::Faulted(reason.to_string())
            }
        };
        entries.push(DispatchEntry {
            extension_id,
            outcome,
        });
    }

    DispatchReport {
        request_id,
        entries,
    }
}

fn log_report<T>(kind: &str, report: &DispatchReport<T>) {
    debug!(
        "event=dispatch module=dispatch status=ok kind={} request_id={} responded={} declined={} faulted={}",
        kind,
        report.request_id,
        report.responses().count(),
        report.declined_count(),
        report.faults().count()
    );
}
