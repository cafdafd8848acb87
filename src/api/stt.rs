use tracing::info;

use super::{require_audio, ApiClient};
use crate::domain::{
    AudioClip, DomainError, FormPart, Operation, RequestDescriptor, Transcription,
};

impl ApiClient {
    /// Transcribe a clip.
    ///
    /// `language` is sent as a hint unless it is empty or `auto`. Clips
    /// without audio are rejected before any request is made.
    pub async fn transcribe(
        &self,
        clip: &AudioClip,
        language: Option<&str>,
    ) -> Result<Transcription, DomainError> {
        require_audio(clip)?;
        let path = self.path(Operation::Transcribe)?;

        let mut parts = vec![self.upload_part(clip)];
        if let Some(language) = language
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("auto"))
        {
            parts.push(FormPart::text("language", language));
        }

        let response = self
            .send(RequestDescriptor::post_multipart(path, parts), &self.policy)
            .await?;
        let transcription: Transcription = response.json()?;

        info!(
            chars = transcription.text.len(),
            language = ?transcription.language,
            "Audio transcribed"
        );
        Ok(transcription)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::api::testing::RecordingHttp;
    use crate::api::ApiClient;
    use crate::domain::{
        ApiScheme, AudioBuffer, AudioClip, BackendConfig, DomainError, FormPart, RequestBody,
    };

    fn api(http: Arc<RecordingHttp>, scheme: ApiScheme) -> ApiClient {
        let config = BackendConfig {
            scheme,
            ..BackendConfig::default()
        };
        ApiClient::new(http, &config)
    }

    fn sent_parts(http: &RecordingHttp) -> Vec<FormPart> {
        match http.last().body {
            RequestBody::Multipart(parts) => parts,
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    fn recording() -> AudioClip {
        let mut buffer = AudioBuffer::new(16000);
        buffer.push_samples(&[100; 1600]);
        AudioClip::from_recording(&buffer)
    }

    #[tokio::test]
    async fn test_transcribe_v1() {
        let http = Arc::new(RecordingHttp::new().json(json!({
            "text": "hello world",
            "language": "en",
            "confidence": 0.93
        })));

        let result = api(http.clone(), ApiScheme::V1)
            .transcribe(&recording(), Some("en_US"))
            .await
            .unwrap();

        assert_eq!(result.text, "hello world");
        assert_eq!(result.confidence, Some(0.93));

        let sent = http.last();
        assert_eq!(sent.path, "/api/v1/stt/transcribe");
        assert!(sent.content_type().is_none());

        let parts = sent_parts(&http);
        assert_eq!(parts.len(), 2);
        match &parts[0] {
            FormPart::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                assert_eq!(name, "file");
                assert_eq!(file_name, "recording.wav");
                assert_eq!(mime, "audio/wav");
                assert_eq!(bytes.len(), 44 + 3200);
            }
            other => panic!("unexpected part {:?}", other),
        }
        assert_eq!(parts[1], FormPart::text("language", "en_US"));
    }

    #[tokio::test]
    async fn test_transcribe_legacy_field_and_auto_language() {
        let http = Arc::new(RecordingHttp::new().json(json!({"text": "namaste"})));

        api(http.clone(), ApiScheme::Legacy)
            .transcribe(&recording(), Some("auto"))
            .await
            .unwrap();

        assert_eq!(http.last().path, "/stt");
        let parts = sent_parts(&http);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name(), "audio");
    }

    #[tokio::test]
    async fn test_transcribe_rejects_empty_clip() {
        let http = Arc::new(RecordingHttp::new());
        let api = api(http.clone(), ApiScheme::V1);

        let empty = AudioClip::new(Vec::new(), "audio/webm", "recording.webm");
        let err = api.transcribe(&empty, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let silent = AudioClip::from_recording(&AudioBuffer::new(16000));
        assert!(api.transcribe(&silent, None).await.is_err());

        assert_eq!(http.request_count(), 0);
    }
}
