use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::audio::AudioConfig;
use crate::domain::endpoints::ApiScheme;
use crate::domain::request::RequestPolicy;
use crate::domain::speech::SynthesisRequest;

/// Environment variable overriding `backend.origin`.
pub const BACKEND_URL_ENV: &str = "VOXAI_BACKEND_URL";
/// Environment variable overriding `backend.scheme`.
pub const API_SCHEME_ENV: &str = "VOXAI_API_SCHEME";

/// Backend connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Origin every relative endpoint path is resolved against.
    pub origin: String,
    /// Endpoint path scheme spoken by the backend.
    pub scheme: ApiScheme,
    /// Extra attempts after a failed request.
    pub retries: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Hard deadline for ordinary requests. None waits indefinitely.
    pub timeout_ms: Option<u64>,
    /// Deadline for a voice chat turn (STT, LLM and TTS on the backend).
    pub voice_chat_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8000".to_string(),
            scheme: ApiScheme::V1,
            retries: 1,
            retry_delay_ms: 1000,
            timeout_ms: None,
            voice_chat_timeout_ms: 30_000,
            user_agent: format!("VoxAI/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl BackendConfig {
    /// Default policy for requests issued with this configuration.
    pub fn request_policy(&self) -> RequestPolicy {
        RequestPolicy::default()
            .with_retries(self.retries)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_timeout(self.timeout_ms.map(Duration::from_millis))
    }

    /// Policy for voice chat turns.
    pub fn voice_chat_policy(&self) -> RequestPolicy {
        self.request_policy()
            .with_timeout(Some(Duration::from_millis(self.voice_chat_timeout_ms)))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
    /// Maximum number of log files to keep.
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
            max_files: 7,
        }
    }
}

/// Defaults for the text-to-speech workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub voice: String,
    /// Speed multiplier.
    pub speed: f32,
    /// Pitch offset in semitones. Left out of requests when unset.
    pub pitch: Option<f32>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            voice: "en_US-lessac-medium".to_string(),
            speed: 1.0,
            pitch: None,
        }
    }
}

impl SynthesisConfig {
    /// Build a request, filling whatever the caller left out from these defaults.
    pub fn request(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: Option<f32>,
        pitch: Option<f32>,
    ) -> SynthesisRequest {
        let mut request = SynthesisRequest::new(text, voice.unwrap_or(&self.voice))
            .with_speed(speed.unwrap_or(self.speed));
        request.pitch = pitch.or(self.pitch);
        request
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
    pub audio: AudioConfig,
    pub synthesis: SynthesisConfig,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `VOXAI_*` environment overrides on top of the loaded file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(BACKEND_URL_ENV).ok(),
            std::env::var(API_SCHEME_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, origin: Option<String>, scheme: Option<String>) {
        if let Some(origin) = origin.filter(|o| !o.trim().is_empty()) {
            info!(origin = %origin, "Backend origin overridden from environment");
            self.backend.origin = origin.trim().to_string();
        }

        if let Some(scheme) = scheme {
            match scheme.parse::<ApiScheme>() {
                Ok(parsed) => self.backend.scheme = parsed,
                Err(e) => warn!(value = %scheme, error = %e, "Ignoring invalid API scheme override"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.origin, "http://127.0.0.1:8000");
        assert_eq!(config.scheme, ApiScheme::V1);

        let policy = config.request_policy();
        assert_eq!(policy.retries, 1);
        assert_eq!(policy.retry_delay, Duration::from_secs(1));
        assert!(policy.timeout.is_none());

        let chat = config.voice_chat_policy();
        assert_eq!(chat.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::new();
        config.apply_overrides(
            Some("http://voice.local:9000".to_string()),
            Some("legacy".to_string()),
        );
        assert_eq!(config.backend.origin, "http://voice.local:9000");
        assert_eq!(config.backend.scheme, ApiScheme::Legacy);
    }

    #[test]
    fn test_invalid_scheme_override_ignored() {
        let mut config = AppConfig::new();
        config.apply_overrides(None, Some("v9".to_string()));
        assert_eq!(config.backend.scheme, ApiScheme::V1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("[backend]\nretries = 3\n").unwrap();
        assert_eq!(config.backend.retries, 3);
        assert_eq!(config.backend.retry_delay_ms, 1000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.synthesis.pitch, None);
    }

    #[test]
    fn test_synthesis_request_omits_unset_pitch() {
        let defaults = SynthesisConfig::default();

        let plain = defaults.request("hello", None, None, None);
        assert_eq!(plain.voice, "en_US-lessac-medium");
        assert_eq!(plain.speed, 1.0);
        assert_eq!(plain.pitch, None);

        let tuned = defaults.request("hello", Some("neural"), Some(1.5), Some(-2.0));
        assert_eq!(tuned.voice, "neural");
        assert_eq!(tuned.pitch, Some(-2.0));

        let configured: AppConfig = toml::from_str("[synthesis]\npitch = 1.5\n").unwrap();
        assert_eq!(configured.synthesis.request("hi", None, None, None).pitch, Some(1.5));
    }
}
