pub mod audio;
pub mod chat;
pub mod clip;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod notice;
pub mod request;
pub mod speech;

pub use audio::{AtomicCaptureState, AudioConfig, AudioDevice, AudioEvent, CaptureState};
pub use chat::{ChatMessage, Conversation, Role};
pub use clip::{AudioBuffer, AudioClip};
pub use config::{AppConfig, BackendConfig, LoggingConfig, SynthesisConfig};
pub use endpoints::{ApiScheme, EndpointTable, Operation};
pub use error::DomainError;
pub use notice::{Notice, NoticeLevel};
pub use request::{
    FailureKind, FormPart, Method, RequestBody, RequestDescriptor, RequestFailure, RequestPolicy,
    ResponseEnvelope,
};
pub use speech::{
    AudioHandle, ChatReply, ChatTurn, Health, HostedAudio, Language, LanguageList, Liveness,
    SynthesisRequest, SynthesisResult, Transcription, Voice,
};
