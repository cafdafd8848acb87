//! Endpoint paths for each backend API generation.
//!
//! The backend is mid-migration from unversioned routes (`/tts`, `/stt`,
//! `/voice-chat`) to `/api/v1/...`. Every path lives in this table so the
//! operations never hard-code either scheme.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Backend path scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiScheme {
    /// Versioned routes under `/api/v1`.
    #[default]
    V1,
    /// Deprecated unversioned routes.
    Legacy,
}

impl fmt::Display for ApiScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiScheme::V1 => write!(f, "v1"),
            ApiScheme::Legacy => write!(f, "legacy"),
        }
    }
}

impl FromStr for ApiScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(ApiScheme::V1),
            "legacy" => Ok(ApiScheme::Legacy),
            other => Err(format!("unknown API scheme '{}', expected 'v1' or 'legacy'", other)),
        }
    }
}

/// Backend capabilities addressed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Health,
    Voices,
    Languages,
    Synthesize,
    Transcribe,
    VoiceChat,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Health => "health",
            Operation::Voices => "voices",
            Operation::Languages => "languages",
            Operation::Synthesize => "synthesize",
            Operation::Transcribe => "transcribe",
            Operation::VoiceChat => "voice-chat",
        }
    }
}

/// Paths and field names for one scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    pub scheme: ApiScheme,
    health: &'static str,
    voices: Option<&'static str>,
    languages: Option<&'static str>,
    synthesize: &'static str,
    transcribe: &'static str,
    voice_chat: &'static str,
    /// Multipart field carrying the uploaded audio.
    pub upload_field: &'static str,
    /// JSON field naming the voice in a synthesis body.
    pub voice_field: &'static str,
}

impl EndpointTable {
    pub const V1: EndpointTable = EndpointTable {
        scheme: ApiScheme::V1,
        health: "/health",
        voices: Some("/api/v1/tts/voices"),
        languages: Some("/api/v1/languages"),
        synthesize: "/api/v1/tts/synthesize",
        transcribe: "/api/v1/stt/transcribe",
        voice_chat: "/api/v1/voice-chat",
        upload_field: "file",
        voice_field: "voice_id",
    };

    pub const LEGACY: EndpointTable = EndpointTable {
        scheme: ApiScheme::Legacy,
        health: "/",
        voices: None,
        languages: None,
        synthesize: "/tts",
        transcribe: "/stt",
        voice_chat: "/voice-chat",
        upload_field: "audio",
        voice_field: "voice",
    };

    pub fn for_scheme(scheme: ApiScheme) -> Self {
        match scheme {
            ApiScheme::V1 => Self::V1,
            ApiScheme::Legacy => Self::LEGACY,
        }
    }

    /// Path for an operation, or None if this scheme has no such route.
    pub fn path(&self, operation: Operation) -> Option<&'static str> {
        match operation {
            Operation::Health => Some(self.health),
            Operation::Voices => self.voices,
            Operation::Languages => self.languages,
            Operation::Synthesize => Some(self.synthesize),
            Operation::Transcribe => Some(self.transcribe),
            Operation::VoiceChat => Some(self.voice_chat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_parse() {
        assert_eq!("V1".parse::<ApiScheme>().unwrap(), ApiScheme::V1);
        assert_eq!(" legacy ".parse::<ApiScheme>().unwrap(), ApiScheme::Legacy);
        assert!("v2".parse::<ApiScheme>().is_err());
    }

    #[test]
    fn test_v1_paths() {
        let table = EndpointTable::for_scheme(ApiScheme::V1);
        assert_eq!(table.path(Operation::Synthesize), Some("/api/v1/tts/synthesize"));
        assert_eq!(table.path(Operation::Transcribe), Some("/api/v1/stt/transcribe"));
        assert_eq!(table.path(Operation::VoiceChat), Some("/api/v1/voice-chat"));
        assert_eq!(table.upload_field, "file");
    }

    #[test]
    fn test_legacy_paths() {
        let table = EndpointTable::for_scheme(ApiScheme::Legacy);
        assert_eq!(table.path(Operation::Health), Some("/"));
        assert_eq!(table.path(Operation::Synthesize), Some("/tts"));
        assert_eq!(table.path(Operation::Voices), None);
        assert_eq!(table.upload_field, "audio");
    }
}
