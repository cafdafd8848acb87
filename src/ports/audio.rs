use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ringbuf::traits::Producer;
use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::{AudioClip, AudioConfig, AudioDevice, AudioEvent, CaptureState, DomainError};

/// Producer half of the capture ring buffer.
///
/// Samples that no longer fit are counted rather than buffered; the first
/// overflow of a recording publishes `AudioEvent::BufferFull`.
pub struct SampleSink {
    producer: ringbuf::HeapProd<i16>,
    dropped: Arc<AtomicUsize>,
    events: broadcast::Sender<AudioEvent>,
    capacity_secs: u32,
}

impl SampleSink {
    pub fn new(
        producer: ringbuf::HeapProd<i16>,
        dropped: Arc<AtomicUsize>,
        events: broadcast::Sender<AudioEvent>,
        capacity_secs: u32,
    ) -> Self {
        Self {
            producer,
            dropped,
            events,
            capacity_secs,
        }
    }

    /// Append samples, returning how many were stored.
    pub fn push(&mut self, samples: &[i16]) -> usize {
        let stored = self.producer.push_slice(samples);
        let overflow = samples.len() - stored;
        if overflow > 0 && self.dropped.fetch_add(overflow, Ordering::Relaxed) == 0 {
            warn!(
                capacity_secs = self.capacity_secs,
                "Recording buffer full, further audio is dropped"
            );
            let _ = self.events.send(AudioEvent::BufferFull {
                capacity_secs: self.capacity_secs,
            });
        }
        stored
    }

    /// Samples dropped so far in this recording.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Where an open source delivers audio.
pub struct CaptureTarget {
    /// Receives PCM samples, 16-bit mono at `sample_rate`.
    pub sink: SampleSink,
    pub sample_rate: u32,
    /// Level updates and stream errors are published here.
    pub events: broadcast::Sender<AudioEvent>,
}

/// Platform microphone capability.
///
/// `open` asks for device access and starts streaming samples into the
/// target; `close` stops the stream. Permission problems surface as
/// `DomainError::PermissionDenied`.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn open(&self, target: CaptureTarget) -> Result<(), DomainError>;

    async fn close(&self) -> Result<(), DomainError>;

    /// Current input level (0.0 - 1.0).
    fn current_level(&self) -> f32 {
        0.0
    }

    /// List available audio input devices.
    fn list_input_devices(&self) -> Result<Vec<AudioDevice>, DomainError>;

    /// Select an input device by ID, or use the system default if None.
    fn select_input_device(&self, device_id: Option<&str>) -> Result<(), DomainError>;
}

/// Port for the start/stop recording contract.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Start recording. A no-op while a recording is already running.
    async fn start_capture(&self) -> Result<(), DomainError>;

    /// Stop recording and return the finished clip.
    ///
    /// Returns `Ok(None)` when nothing was recording.
    async fn stop_capture(&self) -> Result<Option<AudioClip>, DomainError>;

    fn state(&self) -> CaptureState;

    fn config(&self) -> AudioConfig;

    fn subscribe(&self) -> broadcast::Receiver<AudioEvent>;

    /// Seconds since recording started, 0.0 when idle.
    fn current_duration(&self) -> f32;

    /// Current input level (0.0 - 1.0), 0.0 when idle.
    fn current_level(&self) -> f32;
}
