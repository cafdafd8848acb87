use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::DomainError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP methods used against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One field of a multipart form.
#[derive(Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormPart::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

impl fmt::Debug for FormPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormPart::Text { name, value } => {
                write!(f, "Text({}={:?})", name, value)
            }
            FormPart::File {
                name,
                file_name,
                mime,
                bytes,
            } => write!(
                f,
                "File({}={}, mime={}, bytes_len={})",
                name,
                file_name,
                mime,
                bytes.len()
            ),
        }
    }
}

/// Request payload.
///
/// Multipart bodies never carry an explicit content type: the boundary is
/// chosen by the transport when the form is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

/// A single logical request to the backend, independent of the transport.
#[derive(Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Endpoint path relative to the backend origin, or an absolute URL.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RequestDescriptor {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            headers: vec![("Accept".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: RequestBody::Empty,
        }
    }

    pub fn post_json<T: Serialize>(path: impl Into<String>, body: &T) -> Result<Self, DomainError> {
        Ok(Self {
            method: Method::Post,
            path: path.into(),
            headers: vec![(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string())],
            body: RequestBody::Json(serde_json::to_value(body)?),
        })
    }

    pub fn post_multipart(path: impl Into<String>, parts: Vec<FormPart>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            headers: Vec::new(),
            body: RequestBody::Multipart(parts),
        }
    }

    /// Add a header. A content type on a multipart body is dropped.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if name.eq_ignore_ascii_case(CONTENT_TYPE) {
            if matches!(self.body, RequestBody::Multipart(_)) {
                tracing::warn!(path = %self.path, "Ignoring explicit content type on multipart request");
                return self;
            }
            self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(CONTENT_TYPE));
        }
        self.headers.push((name, value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body_summary = match &self.body {
            RequestBody::Empty => "Empty".to_string(),
            RequestBody::Json(v) => format!("Json(len={})", v.to_string().len()),
            RequestBody::Multipart(parts) => format!("Multipart({:?})", parts),
        };

        f.debug_struct("RequestDescriptor")
            .field("method", &self.method.as_str())
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("body", &body_summary)
            .finish()
    }
}

/// Per-request transport policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPolicy {
    /// Additional attempts after the first one fails.
    pub retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
    /// Hard deadline for the whole logical request, retries included.
    pub timeout: Option<Duration>,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay: Duration::from_secs(1),
            timeout: None,
        }
    }
}

impl RequestPolicy {
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ResponseEnvelope {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Parse the body as JSON, treating an empty body as `null`.
    pub fn json_value(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }
}

/// Which layer a request failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No response at all: connection refused, DNS, TLS.
    Transport,
    /// The backend answered with a non-2xx status.
    Application,
    /// The deadline expired before a response arrived.
    Timeout,
}

/// Normalized failure of one logical request. Built once, never mutated.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct RequestFailure {
    kind: FailureKind,
    status: Option<u16>,
    message: String,
    detail: Option<Value>,
}

impl RequestFailure {
    /// Build a failure from a non-2xx response body.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: Value = serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Default::default()));
        let message = message_from_body(status, &parsed);
        let detail = match parsed.get("detail").filter(|d| !d.is_null()).cloned() {
            Some(detail) => Some(detail),
            None if is_empty_body(&parsed) => None,
            None => Some(parsed),
        };

        Self {
            kind: FailureKind::Application,
            status: Some(status),
            message,
            detail,
        }
    }

    /// The backend could not be reached at all.
    pub fn unreachable(origin: &str) -> Self {
        Self {
            kind: FailureKind::Transport,
            status: None,
            message: format!(
                "Connection error: could not reach the backend at {}",
                origin.trim_end_matches('/')
            ),
            detail: None,
        }
    }

    /// The request URL could not be formed; nothing was sent.
    pub fn invalid_url(url: &str) -> Self {
        Self {
            kind: FailureKind::Transport,
            status: None,
            message: format!("Connection error: '{}' is not a valid backend URL", url),
            detail: None,
        }
    }

    /// The configured deadline expired.
    pub fn timed_out(after: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            status: None,
            message: format!(
                "Request timed out after {} ms - backend not responding",
                after.as_millis()
            ),
            detail: None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }

    pub fn is_transport(&self) -> bool {
        self.kind == FailureKind::Transport
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn message_from_body(status: u16, body: &Value) -> String {
    match body.get("detail") {
        Some(detail) if !detail.is_null() => normalize_detail(detail),
        _ if is_empty_body(body) => format!("HTTP {}", status),
        _ => normalize_detail(body),
    }
}

/// Turn a server-provided error detail into one display string.
///
/// A list of validation errors joins their `msg` fields with ", ", a string is
/// used as is, anything else is rendered as JSON.
pub fn normalize_detail(detail: &Value) -> String {
    match detail {
        Value::Array(items) => items
            .iter()
            .map(|item| match item.get("msg") {
                Some(Value::String(msg)) => msg.clone(),
                _ => match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_list_joins_messages() {
        let failure = RequestFailure::from_response(
            422,
            br#"{"detail":[{"loc":["body","text"],"msg":"a"},{"msg":"b"}]}"#,
        );
        assert_eq!(failure.message(), "a, b");
        assert_eq!(failure.status(), Some(422));
        assert_eq!(failure.kind(), FailureKind::Application);
    }

    #[test]
    fn test_detail_string_is_verbatim() {
        let failure = RequestFailure::from_response(400, br#"{"detail":"x"}"#);
        assert_eq!(failure.message(), "x");
        assert_eq!(failure.detail(), Some(&json!("x")));
    }

    #[test]
    fn test_detail_object_is_stringified() {
        let failure = RequestFailure::from_response(500, br#"{"detail":{"code":7}}"#);
        assert_eq!(failure.message(), r#"{"code":7}"#);
    }

    #[test]
    fn test_unparseable_body_is_not_fatal() {
        let failure = RequestFailure::from_response(502, b"<html>Bad Gateway</html>");
        assert_eq!(failure.message(), "HTTP 502");
        assert!(failure.detail().is_none());
    }

    #[test]
    fn test_transport_failure_is_distinct() {
        let transport = RequestFailure::unreachable("http://127.0.0.1:8000/");
        let app = RequestFailure::from_response(503, br#"{"detail":"down"}"#);

        assert!(transport.is_transport());
        assert!(!app.is_transport());
        assert!(transport.status().is_none());
        assert!(transport.message().contains("http://127.0.0.1:8000"));
        assert_ne!(transport.message(), app.message());
    }

    #[test]
    fn test_multipart_rejects_content_type() {
        let req = RequestDescriptor::post_multipart("/stt", vec![FormPart::text("a", "b")])
            .with_header("content-type", "multipart/form-data");
        assert!(req.content_type().is_none());
    }

    #[test]
    fn test_json_sets_content_type() {
        let req = RequestDescriptor::post_json("/tts", &json!({"text": "hi"})).unwrap();
        assert_eq!(req.content_type(), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn test_debug_summarizes_file_parts() {
        let req = RequestDescriptor::post_multipart(
            "/stt",
            vec![FormPart::file("file", "recording.wav", "audio/wav", vec![1u8; 2048])],
        );
        let s = format!("{req:?}");
        assert!(s.contains("bytes_len=2048"));
    }
}
