use serde_json::{Map, Value};
use tracing::info;

use super::ApiClient;
use crate::domain::{
    AudioHandle, DomainError, HostedAudio, Operation, RequestDescriptor, SynthesisRequest,
    SynthesisResult,
};

const DEFAULT_AUDIO_MIME: &str = "audio/wav";

impl ApiClient {
    /// Synthesize speech.
    ///
    /// Audio streamed back is written to a temporary file behind an
    /// `AudioHandle`; a JSON answer is read as hosted audio with its URL
    /// resolved against the backend origin.
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisResult, DomainError> {
        request.validate()?;
        let path = self.path(Operation::Synthesize)?;

        let mut body = Map::new();
        body.insert("text".into(), Value::from(request.text.as_str()));
        body.insert(
            self.endpoints.voice_field.into(),
            Value::from(request.voice.as_str()),
        );
        body.insert("speed".into(), Value::from(request.speed));
        if let Some(pitch) = request.pitch {
            body.insert("pitch".into(), Value::from(pitch));
        }

        let response = self
            .send(RequestDescriptor::post_json(path, &Value::Object(body))?, &self.policy)
            .await?;

        if response.is_json() {
            let mut hosted: HostedAudio = response.json()?;
            hosted.audio_url = hosted
                .audio_url
                .as_deref()
                .and_then(|url| self.resolve_audio_url(url));
            info!(audio_url = ?hosted.audio_url, duration = ?hosted.duration, "Speech synthesized");
            return Ok(SynthesisResult::Hosted(hosted));
        }

        if response.body.is_empty() {
            return Err(DomainError::Audio(
                "Backend returned an empty audio payload".to_string(),
            ));
        }

        let mime = response
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .unwrap_or(DEFAULT_AUDIO_MIME)
            .to_string();
        let handle = AudioHandle::from_bytes(&response.body, &mime)?;
        info!(bytes = handle.len(), mime = %mime, "Speech synthesized");
        Ok(SynthesisResult::Audio(handle))
    }
}
