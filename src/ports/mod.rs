pub mod audio;
pub mod config;
pub mod http;

pub use audio::{AudioCapture, AudioSource, CaptureTarget, SampleSink};
pub use config::ConfigStore;
pub use http::HttpClient;
