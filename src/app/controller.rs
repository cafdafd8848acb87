use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::{Recorder, ReqwestHttpClient, TomlConfigStore};
use crate::api::ApiClient;
use crate::domain::{ApiScheme, AppConfig, AudioClip, AudioDevice, CaptureState, DomainError};
use crate::infrastructure::init_logging;
use crate::ports::{AudioCapture, AudioSource, ConfigStore, HttpClient};

/// Application controller that orchestrates initialization and owns the
/// backend client and the recorder.
pub struct AppController {
    config: RwLock<AppConfig>,
    config_store: Arc<dyn ConfigStore>,
    api: RwLock<ApiClient>,
    audio: Option<AudioStack>,
    _log_guard: Option<WorkerGuard>,
}

/// Microphone source plus the recorder driving it.
struct AudioStack {
    source: Arc<dyn AudioSource>,
    recorder: Recorder,
}

impl AppController {
    /// Initialize the application controller.
    /// This sets up configuration, logging, the HTTP client and, when built
    /// with microphone support, audio capture.
    pub fn new() -> Result<Self, DomainError> {
        // Step 1: Initialize config store
        let config_store: Arc<dyn ConfigStore> = Arc::new(TomlConfigStore::new()?);

        // Step 2: Load configuration, environment overrides on top
        let config = config_store.load_effective()?;

        // Step 3: Initialize logging
        let log_guard = init_logging(&config_store.logs_dir(), &config.logging)?;

        info!(version = env!("CARGO_PKG_VERSION"), "VoxAI starting up");

        // Step 4: HTTP client for the configured backend
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(&config.backend)?);

        // Step 5: Microphone, if compiled in
        let source = default_audio_source();

        let mut controller = Self::with_parts(config, config_store, http, source);
        controller._log_guard = log_guard;
        Ok(controller)
    }

    /// Assemble a controller from already constructed parts. Logging is left
    /// to the caller.
    pub fn with_parts(
        config: AppConfig,
        config_store: Arc<dyn ConfigStore>,
        http: Arc<dyn HttpClient>,
        source: Option<Arc<dyn AudioSource>>,
    ) -> Self {
        let api = ApiClient::new(http, &config.backend);
        let audio = source.map(|source| AudioStack {
            recorder: Recorder::new(source.clone(), config.audio.clone()),
            source,
        });

        info!(
            origin = %api.origin(),
            scheme = %api.endpoints().scheme,
            microphone = audio.is_some(),
            "AppController initialized"
        );

        Self {
            config: RwLock::new(config),
            config_store,
            api: RwLock::new(api),
            audio,
            _log_guard: None,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Update and persist the configuration.
    ///
    /// A changed origin rebuilds the HTTP client; scheme and policy changes
    /// take effect for the next request.
    pub fn update_config(&self, config: AppConfig) -> Result<(), DomainError> {
        self.install(config, true)?;
        info!("Configuration updated");
        Ok(())
    }

    /// Configuration as stored on disk, without environment or session
    /// overrides.
    pub fn stored_config(&self) -> Result<AppConfig, DomainError> {
        self.config_store.load()
    }

    /// Point this process at another backend without touching the stored
    /// configuration.
    pub fn override_backend(
        &self,
        origin: Option<&str>,
        scheme: Option<ApiScheme>,
        timeout_ms: Option<u64>,
    ) -> Result<(), DomainError> {
        if origin.is_none() && scheme.is_none() && timeout_ms.is_none() {
            return Ok(());
        }

        let mut config = self.config();
        if let Some(origin) = origin {
            config.backend.origin = origin.trim().to_string();
        }
        if let Some(scheme) = scheme {
            config.backend.scheme = scheme;
        }
        if let Some(timeout_ms) = timeout_ms {
            config.backend.timeout_ms = Some(timeout_ms);
            config.backend.voice_chat_timeout_ms = timeout_ms;
        }

        self.install(config, false)?;
        info!(origin = ?origin, scheme = ?scheme, timeout_ms = ?timeout_ms, "Backend overridden for this session");
        Ok(())
    }

    fn install(&self, config: AppConfig, persist: bool) -> Result<(), DomainError> {
        let origin_changed = {
            let current = self.config.read();
            current.backend.origin != config.backend.origin
                || current.backend.user_agent != config.backend.user_agent
        };

        let http: Arc<dyn HttpClient> = if origin_changed {
            Arc::new(ReqwestHttpClient::new(&config.backend)?)
        } else {
            self.api.read().http()
        };

        if persist {
            self.config_store.save(&config)?;
        }

        *self.api.write() = ApiClient::new(http, &config.backend);
        *self.config.write() = config;
        Ok(())
    }

    /// Backend client for the current configuration.
    pub fn api(&self) -> ApiClient {
        self.api.read().clone()
    }

    // ==================== Audio ====================

    fn audio(&self) -> Result<&AudioStack, DomainError> {
        self.audio.as_ref().ok_or_else(|| DomainError::AudioDevice {
            message: "this build has no microphone support".to_string(),
        })
    }

    pub fn has_microphone(&self) -> bool {
        self.audio.is_some()
    }

    /// Start recording from the microphone.
    pub async fn start_recording(&self) -> Result<(), DomainError> {
        self.audio()?.recorder.start_capture().await
    }

    /// Stop recording and return the encoded clip.
    pub async fn stop_recording(&self) -> Result<AudioClip, DomainError> {
        match self.audio()?.recorder.stop_capture().await? {
            Some(clip) => Ok(clip),
            None => {
                warn!("stop_recording called while not recording");
                Err(DomainError::Audio("Not recording".to_string()))
            }
        }
    }

    pub fn recording_state(&self) -> CaptureState {
        self.audio
            .as_ref()
            .map(|a| a.recorder.state())
            .unwrap_or(CaptureState::Idle)
    }

    pub fn recording_duration(&self) -> f32 {
        self.audio
            .as_ref()
            .map(|a| a.recorder.current_duration())
            .unwrap_or(0.0)
    }

    pub fn audio_level(&self) -> f32 {
        self.audio
            .as_ref()
            .map(|a| a.recorder.current_level())
            .unwrap_or(0.0)
    }

    /// List available audio input devices.
    pub fn list_audio_devices(&self) -> Result<Vec<AudioDevice>, DomainError> {
        self.audio()?.source.list_input_devices()
    }

    /// Select an audio input device, or the system default for None.
    pub fn select_audio_device(&self, device_id: Option<&str>) -> Result<(), DomainError> {
        self.audio()?.source.select_input_device(device_id)
    }

    // ==================== Paths ====================

    /// Get the data directory path.
    pub fn data_dir(&self) -> String {
        self.config_store.data_dir().to_string_lossy().to_string()
    }

    /// Get the logs directory path.
    pub fn logs_dir(&self) -> String {
        self.config_store.logs_dir().to_string_lossy().to_string()
    }

    /// Get the config file path.
    pub fn config_path(&self) -> String {
        self.config_store.config_path().to_string_lossy().to_string()
    }
}

#[cfg(feature = "microphone")]
fn default_audio_source() -> Option<Arc<dyn AudioSource>> {
    match crate::adapters::CpalAudioSource::new() {
        Ok(source) => Some(Arc::new(source)),
        Err(e) => {
            warn!(error = %e, "Microphone unavailable");
            None
        }
    }
}

#[cfg(not(feature = "microphone"))]
fn default_audio_source() -> Option<Arc<dyn AudioSource>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingHttp;

    fn controller(dir: &std::path::Path) -> AppController {
        let store = Arc::new(TomlConfigStore::with_data_dir(dir).unwrap());
        let config = store.load().unwrap();
        AppController::with_parts(config, store, Arc::new(RecordingHttp::new()), None)
    }

    #[test]
    fn test_update_config_persists_and_switches_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        assert_eq!(controller.api().endpoints().scheme, ApiScheme::V1);

        let mut config = controller.config();
        config.backend.scheme = ApiScheme::Legacy;
        controller.update_config(config).unwrap();

        assert_eq!(controller.api().endpoints().scheme, ApiScheme::Legacy);
        let saved = std::fs::read_to_string(controller.config_path()).unwrap();
        assert!(saved.contains("legacy"));
    }

    #[test]
    fn test_session_override_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        controller
            .override_backend(Some("http://10.0.0.5:8000"), None, Some(2500))
            .unwrap();

        assert_eq!(controller.api().origin(), "http://10.0.0.5:8000");
        assert_eq!(controller.config().backend.timeout_ms, Some(2500));
        assert_eq!(
            controller.config().backend.voice_chat_policy().timeout,
            Some(std::time::Duration::from_millis(2500))
        );
        let stored = controller.stored_config().unwrap();
        assert_eq!(stored.backend.origin, "http://127.0.0.1:8000");
        assert_eq!(stored.backend.timeout_ms, None);
        assert_eq!(stored.backend.voice_chat_timeout_ms, 30_000);
    }

    #[tokio::test]
    async fn test_recording_without_microphone() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        assert!(!controller.has_microphone());
        let err = controller.start_recording().await.unwrap_err();
        assert!(matches!(err, DomainError::AudioDevice { .. }));
        assert_eq!(controller.recording_state(), CaptureState::Idle);
    }
}
