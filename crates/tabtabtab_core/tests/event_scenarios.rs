use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tabtabtab_core::{
    ChannelNotificationSender, ContextQuery, CopyContext, CopyResponse, DirectoryError, Extension,
    ExtensionCollaborators, ExtensionDescriptor, ExtensionDirectory, ExtensionHost,
    HandlerResult, Notification, OnContextResponse, PasteContext, PasteResponse,
    UnavailableLlmProcessor,
};

struct AcknowledgeCopy {
    collaborators: ExtensionCollaborators,
}

#[async_trait]
impl Extension for AcknowledgeCopy {
    fn collaborators(&self) -> &ExtensionCollaborators {
        &self.collaborators
    }

    async fn on_context_request(
        &self,
        _source_extension_id: &str,
        _context_query: &ContextQuery,
    ) -> HandlerResult<OnContextResponse> {
        Ok(None)
    }

    async fn on_copy(&self, context: &CopyContext) -> HandlerResult<CopyResponse> {
        let Some(text) = context.selected_text.clone() else {
            return Ok(None);
        };
        Ok(Some(
            CopyResponse::notify(Notification::pending(
                &context.request_id,
                "Saved",
                "Saved your text",
                text,
            ))
            .with_processing_task(true),
        ))
    }

    async fn on_paste(&self, _context: &PasteContext) -> HandlerResult<PasteResponse> {
        Ok(None)
    }
}

fn build_acknowledge(collaborators: ExtensionCollaborators) -> Arc<dyn Extension> {
    Arc::new(AcknowledgeCopy { collaborators })
}

#[tokio::test]
async fn copy_event_from_host_json_produces_pending_notification() {
    let context: CopyContext = serde_json::from_value(json!({
        "request_id": "r1",
        "timestamp": "2024-01-01T00:00:00Z",
        "window_info": {},
        "screenshot_provided": false,
        "selected_text": "hello"
    }))
    .expect("decode copy context");

    let mut directory = ExtensionDirectory::new();
    directory
        .register(
            ExtensionDescriptor::new("builtin.saver", "Acknowledges copies", build_acknowledge)
                .expect("descriptor"),
        )
        .expect("register");
    let (sender, _rx) = ChannelNotificationSender::new(4);
    let host = ExtensionHost::from_directory(
        &directory,
        Arc::new(sender),
        Arc::new(UnavailableLlmProcessor),
    )
    .expect("host");

    let report = host.dispatch_copy(context).await.expect("dispatch");
    let json = report.to_json();
    let response = &json["responses"][0]["response"];
    assert_eq!(json["responses"][0]["extension_id"], "builtin.saver");
    assert_eq!(response["notification"]["notification_status"], "pending");
    assert_eq!(response["notification"]["notification_content"], "hello");
    assert_eq!(response["is_processing_task"], true);
}

#[test]
fn mutual_dependency_is_rejected_as_cycle() {
    let mut directory = ExtensionDirectory::new();
    directory
        .register(
            ExtensionDescriptor::new("ext.a", "A", build_acknowledge)
                .and_then(|descriptor| descriptor.depends_on("ext.b"))
                .expect("descriptor a"),
        )
        .expect("register a");
    directory
        .register(
            ExtensionDescriptor::new("ext.b", "B", build_acknowledge)
                .and_then(|descriptor| descriptor.depends_on("ext.a"))
                .expect("descriptor b"),
        )
        .expect("register b");

    assert!(matches!(
        directory.validate(),
        Err(DirectoryError::DependencyCycle(_))
    ));

    let (sender, _rx) = ChannelNotificationSender::new(1);
    let err = ExtensionHost::from_directory(
        &directory,
        Arc::new(sender),
        Arc::new(UnavailableLlmProcessor),
    )
    .err()
    .expect("host must refuse cyclic directory");
    assert!(matches!(err, DirectoryError::DependencyCycle(_)));
}
