//! Built-in clipboard echo extension used by the CLI driver.
//!
//! Acknowledges copies immediately, then pushes a summary produced by the
//! LLM processor (or an error notification when no backend answers).

use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use tabtabtab_core::{
    ContextQuery, CopyContext, CopyResponse, Extension, ExtensionCollaborators, ExtensionContext,
    HandlerResult, LlmContext, LlmModel, LlmProcessor, LlmRequest, Notification,
    OnContextResponse, PasteContext, PasteResponse,
};

pub const ECHO_EXTENSION_ID: &str = "builtin.clipboard.echo";

pub struct ClipboardEchoExtension {
    collaborators: ExtensionCollaborators,
}

pub fn build(collaborators: ExtensionCollaborators) -> Arc<dyn Extension> {
    Arc::new(ClipboardEchoExtension { collaborators })
}

#[async_trait]
impl Extension for ClipboardEchoExtension {
    fn collaborators(&self) -> &ExtensionCollaborators {
        &self.collaborators
    }

    async fn on_context_request(
        &self,
        _source_extension_id: &str,
        context_query: &ContextQuery,
    ) -> HandlerResult<OnContextResponse> {
        Ok(context_query.window_info.url().map(|url| {
            OnContextResponse::new(vec![ExtensionContext::new("Active window URL", url)])
        }))
    }

    async fn on_copy(&self, context: &CopyContext) -> HandlerResult<CopyResponse> {
        let Some(text) = context.selected_text.clone().filter(|t| !t.trim().is_empty()) else {
            return Ok(None);
        };
        let Some(device_id) = context.device_id.clone() else {
            return Ok(Some(CopyResponse::notify(Notification::ready(
                &context.request_id,
                "Copied",
                "Copied text received",
                text,
            ))));
        };

        let collaborators = self.collaborators.clone();
        let request_id = context.request_id.clone();
        let preview = text.clone();
        tokio::spawn(async move {
            let request = LlmRequest::new(LlmModel::GeminiFlash2, "Summarize the copied text.")
                .with_context(LlmContext::text(text));
            let outcome = match collaborators.llm_processor.process(request).await {
                Ok(output) => output.into_text().await,
                Err(err) => Err(err),
            };
            let notification = match outcome {
                Ok(summary) => Notification::ready(&request_id, "Summary ready", "", summary),
                Err(err) => {
                    Notification::error(&request_id, "Summary failed", err.to_string(), "")
                }
            };
            if let Err(err) = collaborators
                .send_push_notification(&device_id, &notification)
                .await
            {
                warn!(
                    "event=push_failed module=echo status=error request_id={} error={}",
                    request_id, err
                );
            }
        });

        Ok(Some(
            CopyResponse::notify(Notification::pending(
                &context.request_id,
                "Summarizing",
                "Working on your copied text",
                preview,
            ))
            .with_processing_task(true),
        ))
    }

    async fn on_paste(&self, context: &PasteContext) -> HandlerResult<PasteResponse> {
        let contents = context.session_contents.trim();
        if contents.is_empty() {
            return Ok(None);
        }
        Ok(Some(PasteResponse::immediate(contents)))
    }
}
