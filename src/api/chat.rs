use tracing::info;

use super::{require_audio, ApiClient};
use crate::domain::{
    AudioClip, AudioHandle, ChatReply, ChatTurn, DomainError, FormPart, Operation,
    RequestDescriptor,
};

impl ApiClient {
    /// Run one voice chat turn: the backend transcribes the clip, generates
    /// a reply and speaks it with `voice_id`.
    ///
    /// Uses the voice chat policy, whose deadline covers all three stages.
    pub async fn voice_chat(
        &self,
        clip: &AudioClip,
        voice_id: &str,
    ) -> Result<ChatTurn, DomainError> {
        require_audio(clip)?;
        let voice_id = voice_id.trim();
        if voice_id.is_empty() {
            return Err(DomainError::validation("No voice selected"));
        }
        let path = self.path(Operation::VoiceChat)?;

        let parts = vec![
            self.upload_part(clip),
            FormPart::text("voice_id", voice_id),
        ];
        let response = self
            .send(RequestDescriptor::post_multipart(path, parts), &self.chat_policy)
            .await?;

        if !response.is_json() && !response.body.is_empty() {
            let mime = response
                .content_type
                .as_deref()
                .and_then(|ct| ct.split(';').next())
                .map(str::trim)
                .filter(|ct| ct.starts_with("audio/"))
                .unwrap_or("audio/wav")
                .to_string();
            let audio = AudioHandle::from_bytes(&response.body, &mime)?;
            info!(bytes = audio.len(), "Voice chat answered with audio only");
            return Ok(ChatTurn {
                reply: ChatReply::default(),
                audio: Some(audio),
            });
        }

        let mut reply: ChatReply = response.json()?;
        reply.audio_url = reply
            .audio_url
            .as_deref()
            .and_then(|url| self.resolve_audio_url(url));

        info!(
            user_chars = reply.user_text.len(),
            ai_chars = reply.ai_text.len(),
            has_audio = reply.audio_url.is_some(),
            "Voice chat turn completed"
        );
        Ok(ChatTurn { reply, audio: None })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use crate::api::testing::RecordingHttp;
    use crate::api::ApiClient;
    use crate::domain::{
        ApiScheme, AudioClip, BackendConfig, DomainError, FormPart, RequestBody, RequestFailure,
    };

    fn api(http: Arc<RecordingHttp>, scheme: ApiScheme) -> ApiClient {
        let config = BackendConfig {
            scheme,
            ..BackendConfig::default()
        };
        ApiClient::new(http, &config)
    }

    fn clip() -> AudioClip {
        AudioClip::new(vec![7; 512], "audio/webm", "chat_recording.webm")
    }

    #[tokio::test]
    async fn test_voice_chat_turn() {
        let http = Arc::new(RecordingHttp::new().json(json!({
            "user_text": "what time is it",
            "ai_text": "It is noon.",
            "audio_url": "/static/audio/reply.wav",
            "duration": 1.2
        })));

        let turn = api(http.clone(), ApiScheme::V1)
            .voice_chat(&clip(), "en_US-lessac-medium")
            .await
            .unwrap();

        assert_eq!(turn.reply.user_text, "what time is it");
        assert_eq!(turn.reply.ai_text, "It is noon.");
        assert_eq!(
            turn.playable_url().as_deref(),
            Some("http://backend.test/static/audio/reply.wav")
        );

        let (sent, policy) = http.requests.lock()[0].clone();
        assert_eq!(sent.path, "/api/v1/voice-chat");
        assert_eq!(policy.timeout, Some(Duration::from_millis(30_000)));
        let RequestBody::Multipart(parts) = sent.body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts[0].name(), "file");
        assert_eq!(parts[1], FormPart::text("voice_id", "en_US-lessac-medium"));
    }

    #[tokio::test]
    async fn test_voice_chat_nothing_heard() {
        let http = Arc::new(RecordingHttp::new().json(json!({
            "user_text": "",
            "ai_text": "I didn't hear anything.",
            "audio_url": null
        })));

        let turn = api(http, ApiScheme::V1)
            .voice_chat(&clip(), "neural")
            .await
            .unwrap();

        assert!(turn.reply.user_text.is_empty());
        assert!(turn.playable_url().is_none());
    }

    #[tokio::test]
    async fn test_voice_chat_audio_only_answer() {
        let http = Arc::new(RecordingHttp::new().audio(b"RIFF\x24\x00\x00\x00WAVE", "audio/wav"));

        let turn = api(http.clone(), ApiScheme::Legacy)
            .voice_chat(&clip(), "neural")
            .await
            .unwrap();

        assert!(turn.audio.is_some());
        assert!(turn.playable_url().unwrap().starts_with("file://"));
        assert_eq!(http.last().path, "/voice-chat");
    }

    #[tokio::test]
    async fn test_voice_chat_validation() {
        let http = Arc::new(RecordingHttp::new());
        let api = api(http.clone(), ApiScheme::V1);

        let empty = AudioClip::new(Vec::new(), "audio/wav", "recording.wav");
        assert!(matches!(
            api.voice_chat(&empty, "neural").await.unwrap_err(),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            api.voice_chat(&clip(), "  ").await.unwrap_err(),
            DomainError::Validation(_)
        ));
        assert_eq!(http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_voice_chat_timeout_propagates() {
        let http = Arc::new(
            RecordingHttp::new().respond(Err(RequestFailure::timed_out(Duration::from_millis(30_000)))),
        );
        let err = api(http, ApiScheme::V1)
            .voice_chat(&clip(), "neural")
            .await
            .unwrap_err();

        assert!(err.as_request_failure().unwrap().is_timeout());
        assert_eq!(
            err.to_string(),
            "Request timed out after 30000 ms - backend not responding"
        );
    }
}
