//! Host-built event payloads handed to extension handlers.
//!
//! # Responsibility
//! - Give the documented copy/paste/context-query key sets a typed shape.
//! - Decode the host's JSON payloads, tolerating keys this crate does not use.
//!
//! # Invariants
//! - `screenshot_data` is present iff `screenshot_provided` is true.
//! - `request_id` is never empty.
//! - Screenshot bytes travel as standard base64 strings on the JSON wire.
//! - Copy timestamps are UTC; offset-less ISO-8601 strings are read as UTC.

use chrono::{DateTime, NaiveDateTime, ParseError, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// UTC instant carried by copy events.
pub type Timestamp = DateTime<Utc>;

const NAIVE_ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parses an ISO-8601 timestamp into UTC.
///
/// RFC 3339 strings keep their offset and are converted; strings without an
/// offset (`2024-01-01T00:00:00.123456`) are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, ParseError> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, NAIVE_ISO8601_FORMAT).map(|naive| naive.and_utc())
        })
}

/// Generates a fresh request id for host-originated events.
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parsed information about the foreground window.
///
/// The host decides the key set; only `url` has a stable meaning here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowInfo(pub Map<String, Value>);

impl WindowInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.0.insert("url".to_string(), Value::String(url.into()));
        self
    }

    /// Returns the window URL when the host supplied one as a string.
    pub fn url(&self) -> Option<&str> {
        self.0.get("url").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Payload invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextValidationError {
    #[error("context request_id must not be empty")]
    EmptyRequestId,
    #[error("screenshot_provided is true but screenshot_data is missing (request_id={0})")]
    MissingScreenshot(String),
    #[error("screenshot_data is present but screenshot_provided is false (request_id={0})")]
    UnexpectedScreenshot(String),
}

fn check_payload(
    request_id: &str,
    screenshot_provided: bool,
    screenshot_data: &Option<Vec<u8>>,
) -> Result<(), ContextValidationError> {
    if request_id.trim().is_empty() {
        return Err(ContextValidationError::EmptyRequestId);
    }
    match (screenshot_provided, screenshot_data.is_some()) {
        (true, false) => Err(ContextValidationError::MissingScreenshot(
            request_id.to_string(),
        )),
        (false, true) => Err(ContextValidationError::UnexpectedScreenshot(
            request_id.to_string(),
        )),
        _ => Ok(()),
    }
}

/// Copy event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyContext {
    pub request_id: String,
    /// ISO-8601 UTC on the wire.
    #[serde(with = "timestamp_iso8601")]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub window_info: WindowInfo,
    #[serde(default)]
    pub screenshot_provided: bool,
    #[serde(default)]
    pub selected_text: Option<String>,
    #[serde(
        default,
        with = "screenshot_base64",
        skip_serializing_if = "Option::is_none"
    )]
    pub screenshot_data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl CopyContext {
    pub fn new(request_id: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp,
            window_info: WindowInfo::default(),
            screenshot_provided: false,
            selected_text: None,
            screenshot_data: None,
            device_id: None,
            session_id: None,
        }
    }

    pub fn with_selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }

    pub fn with_window_info(mut self, window_info: WindowInfo) -> Self {
        self.window_info = window_info;
        self
    }

    /// Attaches screenshot bytes and raises `screenshot_provided`.
    pub fn with_screenshot(mut self, bytes: Vec<u8>) -> Self {
        self.screenshot_provided = true;
        self.screenshot_data = Some(bytes);
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ContextValidationError> {
        check_payload(
            &self.request_id,
            self.screenshot_provided,
            &self.screenshot_data,
        )
    }
}

/// Paste event payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PasteContext {
    pub request_id: String,
    #[serde(default)]
    pub window_info: WindowInfo,
    #[serde(default)]
    pub screenshot_provided: bool,
    #[serde(
        default,
        with = "screenshot_base64",
        skip_serializing_if = "Option::is_none"
    )]
    pub screenshot_data: Option<Vec<u8>>,
    #[serde(default)]
    pub session_contents: String,
    /// Transient hint for this paste only.
    #[serde(default)]
    pub hint: String,
    /// Hint that persists across pastes in the session.
    #[serde(default)]
    pub sticky_hint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl PasteContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    pub fn with_window_info(mut self, window_info: WindowInfo) -> Self {
        self.window_info = window_info;
        self
    }

    pub fn with_session_contents(mut self, contents: impl Into<String>) -> Self {
        self.session_contents = contents.into();
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn with_sticky_hint(mut self, sticky_hint: impl Into<String>) -> Self {
        self.sticky_hint = sticky_hint.into();
        self
    }

    pub fn with_screenshot(mut self, bytes: Vec<u8>) -> Self {
        self.screenshot_provided = true;
        self.screenshot_data = Some(bytes);
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ContextValidationError> {
        check_payload(
            &self.request_id,
            self.screenshot_provided,
            &self.screenshot_data,
        )
    }
}

/// Query asking extensions for supplementary context.
///
/// Carries the same keys as a paste payload; the two are kept apart so
/// handler signatures say which event they serve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextQuery {
    pub request_id: String,
    #[serde(default)]
    pub window_info: WindowInfo,
    #[serde(default)]
    pub screenshot_provided: bool,
    #[serde(
        default,
        with = "screenshot_base64",
        skip_serializing_if = "Option::is_none"
    )]
    pub screenshot_data: Option<Vec<u8>>,
    #[serde(default)]
    pub session_contents: String,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub sticky_hint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ContextQuery {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    pub fn with_window_info(mut self, window_info: WindowInfo) -> Self {
        self.window_info = window_info;
        self
    }

    pub fn with_session_contents(mut self, contents: impl Into<String>) -> Self {
        self.session_contents = contents.into();
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn with_sticky_hint(mut self, sticky_hint: impl Into<String>) -> Self {
        self.sticky_hint = sticky_hint.into();
        self
    }

    pub fn with_screenshot(mut self, bytes: Vec<u8>) -> Self {
        self.screenshot_provided = true;
        self.screenshot_data = Some(bytes);
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ContextValidationError> {
        check_payload(
            &self.request_id,
            self.screenshot_provided,
            &self.screenshot_data,
        )
    }
}

impl From<&PasteContext> for ContextQuery {
    fn from(value: &PasteContext) -> Self {
        Self {
            request_id: value.request_id.clone(),
            window_info: value.window_info.clone(),
            screenshot_provided: value.screenshot_provided,
            screenshot_data: value.screenshot_data.clone(),
            session_contents: value.session_contents.clone(),
            hint: value.hint.clone(),
            sticky_hint: value.sticky_hint.clone(),
            device_id: value.device_id.clone(),
            session_id: value.session_id.clone(),
        }
    }
}

mod timestamp_iso8601 {
    use super::{parse_timestamp, Timestamp};
    use chrono::SecondsFormat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(|err| {
            serde::de::Error::custom(format!("invalid ISO-8601 timestamp `{raw}`: {err}"))
        })
    }
}

mod screenshot_base64 {
    use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&BASE64_STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|value| {
                BASE64_STANDARD
                    .decode(value.as_bytes())
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        new_request_id, parse_timestamp, ContextQuery, ContextValidationError, CopyContext,
        PasteContext, WindowInfo,
    };
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn copy_context_decodes_host_payload() {
        let context: CopyContext = serde_json::from_value(json!({
            "device_id": "device-1",
            "session_id": "s-1",
            "request_id": "r1",
            "timestamp": "2024-01-01T00:00:00Z",
            "window_info": { "url": "https://example.com", "app": "browser" },
            "screenshot_provided": true,
            "selected_text": "hello",
            "screenshot_data": "AQID"
        }))
        .expect("copy context should decode");

        assert_eq!(context.request_id, "r1");
        assert_eq!(
            context.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(context.window_info.url(), Some("https://example.com"));
        assert_eq!(context.screenshot_data, Some(vec![1, 2, 3]));
        assert_eq!(context.device_id.as_deref(), Some("device-1"));
        assert!(context.validate().is_ok());
    }

    #[test]
    fn copy_context_tolerates_null_screenshot() {
        let context: CopyContext = serde_json::from_value(json!({
            "request_id": "r1",
            "timestamp": "2024-01-01T00:00:00Z",
            "window_info": {},
            "screenshot_provided": false,
            "selected_text": null,
            "screenshot_data": null
        }))
        .expect("copy context should decode");
        assert_eq!(context.screenshot_data, None);
        assert_eq!(context.selected_text, None);
    }

    #[test]
    fn copy_context_accepts_offsetless_utc_timestamps() {
        for (raw, micros) in [
            ("2024-01-01T00:00:00", 0),
            ("2024-01-01T00:00:00.123456", 123_456),
        ] {
            let context: CopyContext = serde_json::from_value(json!({
                "request_id": "r1",
                "timestamp": raw,
                "window_info": {},
                "screenshot_provided": false,
                "selected_text": "hello"
            }))
            .expect("offset-less timestamp should decode");

            let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|date| date.and_hms_micro_opt(0, 0, 0, micros))
                .expect("valid date")
                .and_utc();
            assert_eq!(context.timestamp, expected, "{raw}");
        }
    }

    #[test]
    fn timestamps_with_offsets_convert_to_utc() {
        let parsed = parse_timestamp("2024-01-01T02:00:00+02:00").expect("offset timestamp");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(parse_timestamp("yesterday").is_err());

        let err = serde_json::from_value::<CopyContext>(json!({
            "request_id": "r1",
            "timestamp": "01/01/2024"
        }))
        .expect_err("non-ISO timestamp must be rejected");
        assert!(err.to_string().contains("invalid ISO-8601 timestamp"));
    }

    #[test]
    fn copy_timestamp_serializes_as_utc_string() {
        let context = CopyContext::new("r1", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let json = serde_json::to_value(&context).expect("serialize copy context");
        assert_eq!(json["timestamp"], "2024-01-01T00:00:00Z");
        let decoded: CopyContext = serde_json::from_value(json).expect("decode copy context");
        assert_eq!(decoded, context);
    }

    #[test]
    fn context_query_builders_match_paste_context() {
        let window = WindowInfo::new().with_url("https://example.com");
        let paste = PasteContext::new("r5")
            .with_window_info(window.clone())
            .with_session_contents("notes")
            .with_hint("short")
            .with_sticky_hint("formal")
            .with_screenshot(vec![1, 2])
            .with_device_id("device-1");
        let query = ContextQuery::new("r5")
            .with_window_info(window)
            .with_session_contents("notes")
            .with_hint("short")
            .with_sticky_hint("formal")
            .with_screenshot(vec![1, 2])
            .with_device_id("device-1");

        assert_eq!(ContextQuery::from(&paste), query);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn validation_rejects_screenshot_flag_mismatch() {
        let mut context = PasteContext::new("r2");
        context.screenshot_provided = true;
        assert_eq!(
            context.validate(),
            Err(ContextValidationError::MissingScreenshot("r2".to_string()))
        );

        let mut query = ContextQuery::new("r3");
        query.screenshot_data = Some(vec![0]);
        assert_eq!(
            query.validate(),
            Err(ContextValidationError::UnexpectedScreenshot("r3".to_string()))
        );

        assert_eq!(
            PasteContext::new("  ").validate(),
            Err(ContextValidationError::EmptyRequestId)
        );
    }

    #[test]
    fn screenshot_bytes_round_trip_as_base64() {
        let context = PasteContext::new("r4").with_screenshot(vec![255, 0, 7]);
        let json = serde_json::to_value(&context).expect("serialize paste context");
        assert_eq!(json["screenshot_data"], "/wAH");
        let decoded: PasteContext = serde_json::from_value(json).expect("decode paste context");
        assert_eq!(decoded, context);
    }

    #[test]
    fn generated_request_ids_are_unique() {
        assert_ne!(new_request_id(), new_request_id());
    }
}
