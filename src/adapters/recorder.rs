use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Split};
use ringbuf::HeapRb;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::{
    AtomicCaptureState, AudioBuffer, AudioClip, AudioConfig, AudioEvent, CaptureState, DomainError,
};
use crate::ports::{AudioCapture, AudioSource, CaptureTarget, SampleSink};

type RingConsumer = ringbuf::HeapCons<i16>;

/// Consumer side of the active recording plus its overflow counter.
struct ActiveSession {
    consumer: RingConsumer,
    dropped: Arc<AtomicUsize>,
}

/// Recording session state machine on top of any `AudioSource`.
///
/// Chunks land in a single-producer ring buffer that is drained exactly once
/// when the recording is finalized.
pub struct Recorder {
    source: Arc<dyn AudioSource>,
    config: AudioConfig,
    state: AtomicCaptureState,
    event_sender: broadcast::Sender<AudioEvent>,
    /// Serializes start/stop and holds the consumer of the active session.
    session: tokio::sync::Mutex<Option<ActiveSession>>,
    recording_start: Mutex<Option<Instant>>,
}

impl Recorder {
    pub fn new(source: Arc<dyn AudioSource>, config: AudioConfig) -> Self {
        let (event_sender, _) = broadcast::channel(64);

        info!(
            buffer_duration = config.buffer_duration_secs,
            sample_rate = config.sample_rate,
            "Recorder initialized"
        );

        Self {
            source,
            config,
            state: AtomicCaptureState::default(),
            event_sender,
            session: tokio::sync::Mutex::new(None),
            recording_start: Mutex::new(None),
        }
    }

    fn transition(&self, to: CaptureState) {
        let from = self.state.load();
        self.state.store(to);
        let _ = self.event_sender.send(AudioEvent::StateChanged { from, to });
    }
}

#[async_trait]
impl AudioCapture for Recorder {
    async fn start_capture(&self) -> Result<(), DomainError> {
        let mut session = self.session.lock().await;

        if !self.state.load().can_start() {
            debug!(state = ?self.state.load(), "start_capture ignored: already recording");
            return Ok(());
        }

        let ring = HeapRb::<i16>::new(self.config.buffer_capacity());
        let (producer, consumer) = ring.split();
        let dropped = Arc::new(AtomicUsize::new(0));

        let target = CaptureTarget {
            sink: SampleSink::new(
                producer,
                dropped.clone(),
                self.event_sender.clone(),
                self.config.buffer_duration_secs,
            ),
            sample_rate: self.config.sample_rate,
            events: self.event_sender.clone(),
        };

        if let Err(e) = self.source.open(target).await {
            warn!(error = %e, "Failed to start recording");
            let _ = self.event_sender.send(AudioEvent::Error {
                message: e.to_string(),
            });
            return Err(e);
        }

        *session = Some(ActiveSession { consumer, dropped });
        *self.recording_start.lock() = Some(Instant::now());
        self.transition(CaptureState::Recording);

        info!("Recording started");
        Ok(())
    }

    async fn stop_capture(&self) -> Result<Option<AudioClip>, DomainError> {
        let mut session = self.session.lock().await;

        if !self.state.load().can_stop() {
            debug!(state = ?self.state.load(), "stop_capture ignored: not recording");
            return Ok(None);
        }

        self.transition(CaptureState::Finalizing);

        if let Err(e) = self.source.close().await {
            warn!(error = %e, "Audio source did not close cleanly");
        }

        let mut buffer = AudioBuffer::new(self.config.sample_rate);
        let mut dropped_samples = 0;
        if let Some(ActiveSession { mut consumer, dropped }) = session.take() {
            let available = consumer.occupied_len();
            let mut samples = vec![0i16; available];
            let read = consumer.pop_slice(&mut samples);
            buffer.push_samples(&samples[..read]);
            dropped_samples = dropped.load(Ordering::Relaxed);
        }

        if dropped_samples > 0 {
            warn!(
                dropped_samples,
                dropped_secs = dropped_samples as f32 / self.config.sample_rate as f32,
                limit_secs = self.config.buffer_duration_secs,
                "Recording truncated at the buffer limit"
            );
        }

        let clip = AudioClip::from_recording(&buffer);
        drop(buffer);

        let elapsed = self
            .recording_start
            .lock()
            .take()
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or(0.0);

        self.transition(CaptureState::Idle);
        let _ = self.event_sender.send(AudioEvent::ClipReady {
            bytes: clip.len(),
            duration_secs: clip.duration_secs().unwrap_or(0.0),
            dropped_samples,
        });

        info!(
            elapsed_secs = elapsed,
            audio_secs = clip.duration_secs().unwrap_or(0.0),
            bytes = clip.len(),
            "Recording stopped"
        );

        Ok(Some(clip))
    }

    fn state(&self) -> CaptureState {
        self.state.load()
    }

    fn config(&self) -> AudioConfig {
        self.config.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AudioEvent> {
        self.event_sender.subscribe()
    }

    fn current_duration(&self) -> f32 {
        self.recording_start
            .lock()
            .as_ref()
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or(0.0)
    }

    fn current_level(&self) -> f32 {
        if self.state.load() == CaptureState::Recording {
            self.source.current_level()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AudioDevice;

    /// Pushes a fixed block of samples every time it is opened.
    struct ScriptedSource {
        samples: Vec<i16>,
        opens: AtomicUsize,
        closes: AtomicUsize,
        deny: bool,
    }

    impl ScriptedSource {
        fn new(samples: Vec<i16>) -> Arc<Self> {
            Arc::new(Self {
                samples,
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                deny: false,
            })
        }

        fn denied() -> Arc<Self> {
            Arc::new(Self {
                samples: Vec::new(),
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                deny: true,
            })
        }
    }

    #[async_trait]
    impl AudioSource for ScriptedSource {
        async fn open(&self, mut target: CaptureTarget) -> Result<(), DomainError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.deny {
                return Err(DomainError::PermissionDenied("user refused".into()));
            }
            for chunk in self.samples.chunks(1600) {
                target.sink.push(chunk);
            }
            Ok(())
        }

        async fn close(&self) -> Result<(), DomainError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn list_input_devices(&self) -> Result<Vec<AudioDevice>, DomainError> {
            Ok(Vec::new())
        }

        fn select_input_device(&self, _device_id: Option<&str>) -> Result<(), DomainError> {
            Ok(())
        }
    }

    fn recorder(source: Arc<ScriptedSource>) -> Recorder {
        Recorder::new(source, AudioConfig::default())
    }

    #[tokio::test]
    async fn test_start_stop_emits_clip_once() {
        let source = ScriptedSource::new(vec![10; 1600]);
        let rec = recorder(source.clone());

        rec.start_capture().await.unwrap();
        assert_eq!(rec.state(), CaptureState::Recording);

        let clip = rec.stop_capture().await.unwrap().expect("clip");
        assert_eq!(rec.state(), CaptureState::Idle);
        assert_eq!(clip.len(), 44 + 1600 * 2);
        assert!((clip.duration_secs().unwrap() - 0.1).abs() < 0.001);

        // Second stop is a no-op
        assert!(rec.stop_capture().await.unwrap().is_none());
        assert_eq!(source.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_double_start_does_not_duplicate_buffering() {
        let source = ScriptedSource::new(vec![1; 160]);
        let rec = recorder(source.clone());

        rec.start_capture().await.unwrap();
        rec.start_capture().await.unwrap();
        assert_eq!(rec.state(), CaptureState::Recording);
        assert_eq!(source.opens.load(Ordering::SeqCst), 1);

        let clip = rec.stop_capture().await.unwrap().unwrap();
        assert_eq!(clip.len(), 44 + 160 * 2);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let source = ScriptedSource::new(vec![1; 16]);
        let rec = recorder(source.clone());
        let mut events = rec.subscribe();

        assert!(rec.stop_capture().await.unwrap().is_none());
        assert_eq!(rec.state(), CaptureState::Idle);
        assert_eq!(source.closes.load(Ordering::SeqCst), 0);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_permission_denied_is_surfaced() {
        let source = ScriptedSource::denied();
        let rec = recorder(source.clone());

        let err = rec.start_capture().await.unwrap_err();
        assert!(matches!(err, DomainError::PermissionDenied(_)));
        assert_eq!(rec.state(), CaptureState::Idle);
        assert_eq!(source.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_new_recording_after_clip() {
        let source = ScriptedSource::new(vec![5; 320]);
        let rec = recorder(source.clone());

        rec.start_capture().await.unwrap();
        let first = rec.stop_capture().await.unwrap().unwrap();
        rec.start_capture().await.unwrap();
        let second = rec.stop_capture().await.unwrap().unwrap();

        assert_eq!(first.len(), second.len());
        assert_eq!(source.opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_overfull_recording_is_reported() {
        // 3 s of audio into a 1 s buffer
        let source = ScriptedSource::new(vec![7; 48_000]);
        let rec = Recorder::new(
            source,
            AudioConfig {
                buffer_duration_secs: 1,
                sample_rate: 16_000,
            },
        );
        let mut events = rec.subscribe();

        rec.start_capture().await.unwrap();
        let clip = rec.stop_capture().await.unwrap().unwrap();
        assert!((clip.duration_secs().unwrap() - 1.0).abs() < 0.001);

        let mut buffer_full = 0;
        let mut reported_drop = None;
        while let Ok(event) = events.try_recv() {
            match event {
                AudioEvent::BufferFull { capacity_secs } => {
                    assert_eq!(capacity_secs, 1);
                    buffer_full += 1;
                }
                AudioEvent::ClipReady { dropped_samples, .. } => reported_drop = Some(dropped_samples),
                _ => {}
            }
        }
        assert_eq!(buffer_full, 1);
        assert_eq!(reported_drop, Some(32_000));
    }

    #[tokio::test]
    async fn test_state_events() {
        let source = ScriptedSource::new(vec![5; 32]);
        let rec = recorder(source);
        let mut events = rec.subscribe();

        rec.start_capture().await.unwrap();
        rec.stop_capture().await.unwrap();

        let mut transitions = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let AudioEvent::StateChanged { to, .. } = event {
                transitions.push(to);
            }
        }
        assert_eq!(
            transitions,
            vec![CaptureState::Recording, CaptureState::Finalizing, CaptureState::Idle]
        );
    }
}
