#[cfg(feature = "microphone")]
pub mod audio_cpal;
pub mod config_store;
pub mod http_client;
pub mod recorder;

#[cfg(feature = "microphone")]
pub use audio_cpal::CpalAudioSource;
pub use config_store::TomlConfigStore;
pub use http_client::ReqwestHttpClient;
pub use recorder::Recorder;
