//! Typed operations against the VoxAI backend.
//!
//! Every call goes through the `HttpClient` port; request failures are
//! returned unchanged so callers see the normalized message.

mod chat;
mod health;
mod stt;
mod tts;
mod voices;

use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    AudioClip, BackendConfig, DomainError, EndpointTable, FormPart, Operation, RequestDescriptor,
    RequestPolicy, ResponseEnvelope,
};
use crate::ports::HttpClient;

/// Client for the backend's health, voice, synthesis, transcription and
/// voice chat routes.
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<dyn HttpClient>,
    endpoints: EndpointTable,
    policy: RequestPolicy,
    chat_policy: RequestPolicy,
}

impl ApiClient {
    pub fn new(http: Arc<dyn HttpClient>, config: &BackendConfig) -> Self {
        Self {
            http,
            endpoints: EndpointTable::for_scheme(config.scheme),
            policy: config.request_policy(),
            chat_policy: config.voice_chat_policy(),
        }
    }

    /// Override the policy used for ordinary requests.
    pub fn with_policy(mut self, policy: RequestPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the policy used for voice chat turns.
    pub fn with_chat_policy(mut self, policy: RequestPolicy) -> Self {
        self.chat_policy = policy;
        self
    }

    pub(crate) fn http(&self) -> Arc<dyn HttpClient> {
        self.http.clone()
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    pub fn origin(&self) -> &str {
        self.http.origin()
    }

    /// Turn an audio URL returned by the backend into something playable.
    ///
    /// Absolute URLs are kept, relative paths are resolved against the
    /// backend origin, and an empty value means there is no audio.
    pub fn resolve_audio_url(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Some(raw.to_string());
        }

        let origin = self.origin().trim_end_matches('/');
        if raw.starts_with('/') {
            Some(format!("{}{}", origin, raw))
        } else {
            Some(format!("{}/{}", origin, raw))
        }
    }

    fn path(&self, operation: Operation) -> Result<&'static str, DomainError> {
        self.endpoints
            .path(operation)
            .ok_or_else(|| DomainError::Unsupported {
                operation: operation.name().to_string(),
                scheme: self.endpoints.scheme.to_string(),
            })
    }

    async fn send(
        &self,
        request: RequestDescriptor,
        policy: &RequestPolicy,
    ) -> Result<ResponseEnvelope, DomainError> {
        debug!(request = ?request, "Dispatching backend request");
        Ok(self.http.send(request, policy).await?)
    }

    /// Multipart part carrying a clip under this scheme's upload field.
    fn upload_part(&self, clip: &AudioClip) -> FormPart {
        FormPart::file(
            self.endpoints.upload_field,
            clip.file_name(),
            clip.mime(),
            clip.bytes().to_vec(),
        )
    }
}

/// Reject clips with nothing to upload before touching the network.
fn require_audio(clip: &AudioClip) -> Result<(), DomainError> {
    if clip.has_audio() {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "Invalid audio - recording is empty ({} bytes)",
            clip.len()
        )))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::domain::{RequestDescriptor, RequestFailure, RequestPolicy, ResponseEnvelope};
    use crate::ports::HttpClient;

    /// Records every request and answers from a queue of canned results.
    pub(crate) struct RecordingHttp {
        pub requests: Mutex<Vec<(RequestDescriptor, RequestPolicy)>>,
        responses: Mutex<VecDeque<Result<ResponseEnvelope, RequestFailure>>>,
    }

    impl RecordingHttp {
        pub fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(VecDeque::new()),
            }
        }

        pub fn respond(self, response: Result<ResponseEnvelope, RequestFailure>) -> Self {
            self.responses.lock().push_back(response);
            self
        }

        pub fn json(self, body: serde_json::Value) -> Self {
            self.respond(Ok(ResponseEnvelope {
                status: 200,
                content_type: Some("application/json".to_string()),
                body: body.to_string().into_bytes(),
            }))
        }

        pub fn audio(self, bytes: &[u8], mime: &str) -> Self {
            self.respond(Ok(ResponseEnvelope {
                status: 200,
                content_type: Some(mime.to_string()),
                body: bytes.to_vec(),
            }))
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        pub fn last(&self) -> RequestDescriptor {
            self.requests.lock().last().expect("no request sent").0.clone()
        }
    }

    #[async_trait]
    impl HttpClient for RecordingHttp {
        async fn send(
            &self,
            request: RequestDescriptor,
            policy: &RequestPolicy,
        ) -> Result<ResponseEnvelope, RequestFailure> {
            self.requests.lock().push((request, policy.clone()));
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(RequestFailure::from_response(500, b"")))
        }

        fn origin(&self) -> &str {
            "http://backend.test"
        }
    }
}
