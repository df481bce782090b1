use serde_json::{json, Value};
use std::collections::BTreeSet;
use tabtabtab_core::{
    CopyResponse, ExtensionContext, ImmediatePaste, Notification, NotificationStatus,
    OnContextResponse, PastePayload, PasteResponse, ToJson,
};

fn keys(value: &Value) -> BTreeSet<String> {
    value
        .as_object()
        .expect("json object")
        .keys()
        .cloned()
        .collect()
}

fn sample_notifications() -> Vec<Notification> {
    vec![
        Notification::pending("r1", "Saved", "Saved your text", "hello"),
        Notification::ready("r2", "", "", ""),
        Notification::error("r3", "Failed", "multi\nline", "ünïcödé"),
    ]
}

#[test]
fn notification_serializes_exactly_five_keys() {
    let expected: BTreeSet<String> = [
        "notification_request_id",
        "notification_title",
        "notification_detail",
        "notification_content",
        "notification_status",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    for notification in sample_notifications() {
        let json = notification.to_json();
        assert_eq!(keys(&json), expected);
        let status = json["notification_status"].as_str().expect("status string");
        assert!(["pending", "ready", "error"].contains(&status));
        assert_eq!(status, notification.status.as_str());
    }
}

#[test]
fn notification_and_context_values_round_trip() {
    for notification in sample_notifications() {
        let decoded: Notification =
            serde_json::from_value(notification.to_json()).expect("decode notification");
        assert_eq!(decoded, notification);
    }

    let paste = ImmediatePaste::new("  keep   whitespace\t");
    let decoded: ImmediatePaste =
        serde_json::from_value(paste.to_json()).expect("decode immediate paste");
    assert_eq!(decoded, paste);

    for response in [
        OnContextResponse::default(),
        OnContextResponse::new(vec![
            ExtensionContext::new("Active page", "https://example.com"),
            ExtensionContext::new("Session", ""),
        ]),
    ] {
        let decoded: OnContextResponse =
            serde_json::from_value(response.to_json()).expect("decode context response");
        assert_eq!(decoded, response);
    }
}

#[test]
fn paste_response_carries_at_most_one_payload_key() {
    let payloads = [
        None,
        Some(PastePayload::ImmediatePaste(ImmediatePaste::new("x"))),
        Some(PastePayload::Notification(Notification::ready("r", "t", "d", "c"))),
    ];

    for paste in payloads {
        for is_processing_task in [false, true] {
            let response = PasteResponse {
                paste: paste.clone(),
                is_processing_task,
            };
            let json = response.to_json();
            let has_notification = json.get("notification").is_some();
            let has_immediate = json.get("immediate_paste").is_some();

            assert!(!(has_notification && has_immediate));
            assert_eq!(has_notification || has_immediate, paste.is_some());
            assert_eq!(json["is_processing_task"], is_processing_task);
            assert_eq!(
                response.is_accepted(),
                paste.is_some() || is_processing_task
            );
        }
    }
}

#[test]
fn empty_paste_response_is_not_accepted() {
    let response = PasteResponse::default();
    assert!(!response.is_accepted());
    assert!(PasteResponse::processing().is_accepted());
    assert!(PasteResponse::immediate("").is_accepted());
}

#[test]
fn copy_scenario_reports_pending_processing_task() {
    let response = CopyResponse::notify(Notification::new(
        "r1",
        "Saved",
        "Saved your text",
        "hello",
        NotificationStatus::Pending,
    ))
    .with_processing_task(true);

    let json = response.to_json();
    assert_eq!(json["notification"]["notification_status"], "pending");
    assert_eq!(json["notification"]["notification_request_id"], "r1");
    assert_eq!(json["is_processing_task"], true);
    assert_eq!(json, serde_json::to_value(&response).expect("serde copy response"));
}

#[test]
fn paste_wire_shapes_match_documented_layout() {
    assert_eq!(
        PasteResponse::immediate("pasted").to_json(),
        json!({
            "immediate_paste": { "immediate_paste_content": "pasted" },
            "is_processing_task": false
        })
    );
    assert_eq!(
        PasteResponse::processing().to_json(),
        json!({ "is_processing_task": true })
    );
}
