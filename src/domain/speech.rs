use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::TempPath;

use crate::domain::clip::extension_for_mime;
use crate::domain::DomainError;

/// Slowest and fastest accepted speed multipliers.
pub const MIN_SPEED: f32 = 0.25;
pub const MAX_SPEED: f32 = 4.0;

/// A synthesis voice offered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

/// The voices route answers with either a bare list or `{"voices": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum VoiceListResponse {
    Bare(Vec<Voice>),
    Wrapped { voices: Vec<Voice> },
}

impl VoiceListResponse {
    pub(crate) fn into_voices(self) -> Vec<Voice> {
        match self {
            VoiceListResponse::Bare(voices) | VoiceListResponse::Wrapped { voices } => voices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageList {
    pub languages: Vec<Language>,
    #[serde(default)]
    pub default: Option<String>,
    /// True when the list is the built-in table rather than the backend's.
    #[serde(skip)]
    pub fallback: bool,
}

impl LanguageList {
    /// Built-in table used while the backend lacks a languages route.
    pub fn fallback() -> Self {
        let languages = [
            ("en_US", "English (US)"),
            ("hi_IN", "Hindi"),
            ("es_ES", "Spanish"),
        ]
        .into_iter()
        .map(|(code, name)| Language {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect();

        Self {
            languages,
            default: Some("en_US".to_string()),
            fallback: true,
        }
    }
}

/// Backend liveness as reported by the health route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    Up,
    Down,
    /// The response carried no liveness field.
    Unknown,
}

impl Liveness {
    /// Read an explicit liveness field from a health body.
    ///
    /// Accepts `status` as a string (`ok`, `online`, `healthy`, `up` mean up)
    /// or a boolean `healthy`, `ok` or `online` flag.
    pub fn from_body(body: &Value) -> Self {
        if let Some(status) = body.get("status").and_then(Value::as_str) {
            return match status.to_ascii_lowercase().as_str() {
                "ok" | "online" | "healthy" | "up" => Liveness::Up,
                _ => Liveness::Down,
            };
        }

        for key in ["healthy", "ok", "online"] {
            if let Some(flag) = body.get(key).and_then(Value::as_bool) {
                return if flag { Liveness::Up } else { Liveness::Down };
            }
        }

        Liveness::Unknown
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub liveness: Liveness,
    pub version: Option<String>,
    pub raw: Value,
}

impl Health {
    pub fn is_up(&self) -> bool {
        self.liveness == Liveness::Up
    }
}

/// Input to the synthesis operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub speed: f32,
    /// Pitch offset; omitted from the request when None.
    #[serde(default)]
    pub pitch: Option<f32>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            speed: 1.0,
            pitch: None,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.text.trim().is_empty() {
            return Err(DomainError::validation("Text to synthesize is empty"));
        }
        if self.voice.trim().is_empty() {
            return Err(DomainError::validation("No voice selected"));
        }
        if !self.speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(DomainError::validation(format!(
                "Speed must be between {} and {}, got {}",
                MIN_SPEED, MAX_SPEED, self.speed
            )));
        }
        if let Some(pitch) = self.pitch {
            if !pitch.is_finite() {
                return Err(DomainError::validation("Pitch must be a finite number"));
            }
        }
        Ok(())
    }
}

/// Audio hosted by the backend, referenced by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedAudio {
    /// Playable URL, already resolved against the backend origin.
    #[serde(alias = "url")]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of a synthesis call. The backend either streams audio bytes back
/// or answers with JSON pointing at a hosted file.
#[derive(Debug)]
pub enum SynthesisResult {
    Audio(AudioHandle),
    Hosted(HostedAudio),
}

/// Locally playable audio. The backing temporary file is removed when the
/// handle is released or dropped.
#[derive(Debug)]
pub struct AudioHandle {
    path: TempPath,
    mime: String,
    len: usize,
}

impl AudioHandle {
    pub fn from_bytes(bytes: &[u8], mime: &str) -> Result<Self, DomainError> {
        let suffix = format!(".{}", extension_for_mime(mime));
        let mut file = tempfile::Builder::new()
            .prefix("voxai-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            path: file.into_temp_path(),
            mime: mime.to_string(),
            len: bytes.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file://` URL for players that take a URL.
    pub fn url(&self) -> Option<String> {
        url::Url::from_file_path(&self.path).ok().map(|u| u.to_string())
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the audio to `dest` and release the temporary file.
    pub fn save_to(self, dest: &Path) -> Result<PathBuf, DomainError> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&self.path, dest)?;
        self.release()?;
        Ok(dest.to_path_buf())
    }

    /// Delete the backing file now instead of on drop.
    pub fn release(self) -> Result<(), DomainError> {
        self.path.close()?;
        Ok(())
    }
}

/// Result of the transcription operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Result of one voice chat turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(alias = "text", default)]
    pub user_text: String,
    #[serde(default)]
    pub ai_text: String,
    /// Playable URL, already resolved against the backend origin.
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub detected_language: Option<String>,
}

/// A completed voice chat turn. Backends that stream the spoken answer
/// directly leave `reply` texts empty and hand back `audio`.
#[derive(Debug)]
pub struct ChatTurn {
    pub reply: ChatReply,
    pub audio: Option<AudioHandle>,
}

impl ChatTurn {
    /// Where the assistant's answer can be played from, if anywhere.
    pub fn playable_url(&self) -> Option<String> {
        self.audio
            .as_ref()
            .and_then(AudioHandle::url)
            .or_else(|| self.reply.audio_url.clone())
    }
}
