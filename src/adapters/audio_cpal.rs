use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::domain::{AudioDevice, AudioEvent, DomainError};
use crate::ports::{AudioSource, CaptureTarget, SampleSink};

/// Commands sent to the audio thread.
enum AudioCommand {
    Open {
        target: CaptureTarget,
        reply: oneshot::Sender<Result<(), DomainError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Map a device failure, recognising OS permission refusals.
fn device_error(context: &str, err: impl std::fmt::Display) -> DomainError {
    let message = format!("{}: {}", context, err);
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        DomainError::PermissionDenied(message)
    } else {
        DomainError::AudioDevice { message }
    }
}

mod audio_processing {
    use super::*;

    pub fn get_device(selected_device_id: Option<&str>) -> Result<Device, DomainError> {
        let host = cpal::default_host();

        if let Some(id) = selected_device_id {
            let devices = host
                .input_devices()
                .map_err(|e| device_error("Failed to enumerate devices", e))?;

            for device in devices {
                if device.name().map(|n| n == id).unwrap_or(false) {
                    return Ok(device);
                }
            }
            warn!(device_id = %id, "Selected device not found, falling back to default");
        }

        host.default_input_device().ok_or_else(|| DomainError::AudioDevice {
            message: "No default input device available".to_string(),
        })
    }

    pub struct StreamSink {
        pub producer: SampleSink,
        pub device_rate: u32,
        pub target_rate: u32,
        pub channels: usize,
        pub events: broadcast::Sender<AudioEvent>,
        pub level: Arc<AtomicU32>,
        level_samples: Vec<i16>,
    }

    impl StreamSink {
        pub fn new(
            target: CaptureTarget,
            device_rate: u32,
            channels: usize,
            level: Arc<AtomicU32>,
        ) -> Self {
            Self {
                producer: target.sink,
                device_rate,
                target_rate: target.sample_rate,
                channels,
                events: target.events,
                level,
                level_samples: Vec::new(),
            }
        }

        pub fn process(&mut self, data: &[i16]) {
            let mono: Vec<i16> = if self.channels > 1 {
                data.chunks(self.channels)
                    .map(|frame| {
                        let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                        (sum / frame.len() as i32) as i16
                    })
                    .collect()
            } else {
                data.to_vec()
            };

            let resampled = resample(&mono, self.device_rate, self.target_rate);
            self.producer.push(&resampled);

            self.level_samples.extend_from_slice(&resampled);
            if self.level_samples.len() >= (self.target_rate / 10) as usize {
                let level = calculate_rms(&self.level_samples);
                self.level.store(level.to_bits(), Ordering::Relaxed);
                let _ = self.events.send(AudioEvent::LevelUpdate { level });
                self.level_samples.clear();
            }
        }
    }

    pub fn build_stream(device: &Device, mut sink: StreamSink) -> Result<Stream, DomainError> {
        let supported = device
            .default_input_config()
            .map_err(|e| device_error("Failed to get default config", e))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();

        debug!(
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            format = ?sample_format,
            "Device default config"
        );

        let err_events = sink.events.clone();
        let on_error = move |err: cpal::StreamError| {
            error!(?err, "Audio stream error");
            let _ = err_events.send(AudioEvent::Error {
                message: err.to_string(),
            });
        };

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| sink.process(data),
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                        .collect();
                    sink.process(&converted);
                },
                on_error,
                None,
            ),
            other => {
                return Err(DomainError::AudioDevice {
                    message: format!("Unsupported sample format: {:?}", other),
                });
            }
        }
        .map_err(|e| device_error("Failed to open microphone", e))?;

        Ok(stream)
    }

    pub fn calculate_rms(samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
        let rms = (sum_squares / samples.len() as f64).sqrt();
        (rms / 32767.0).min(1.0) as f32
    }

    /// Linear interpolation resampler.
    pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
        if from_rate == to_rate || samples.is_empty() {
            return samples.to_vec();
        }

        let ratio = from_rate as f64 / to_rate as f64;
        let output_len = (samples.len() as f64 / ratio).ceil() as usize;

        (0..output_len)
            .map(|i| {
                let src_pos = i as f64 * ratio;
                let idx = src_pos.floor() as usize;
                let frac = src_pos.fract();
                match (samples.get(idx), samples.get(idx + 1)) {
                    (Some(&s0), Some(&s1)) => (s0 as f64 + (s1 as f64 - s0 as f64) * frac) as i16,
                    (Some(&s0), None) => s0,
                    _ => 0,
                }
            })
            .collect()
    }
}

/// Audio thread runner. cpal streams are not Send, so they live here.
fn audio_thread_main(
    selected_device_id: Arc<RwLock<Option<String>>>,
    level: Arc<AtomicU32>,
    mut cmd_rx: mpsc::Receiver<AudioCommand>,
) {
    let mut stream: Option<Stream> = None;

    while let Some(cmd) = cmd_rx.blocking_recv() {
        match cmd {
            AudioCommand::Open { target, reply } => {
                let result = (|| -> Result<(), DomainError> {
                    let device_id = selected_device_id.read().clone();
                    let device = audio_processing::get_device(device_id.as_deref())?;
                    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                    let config = device
                        .default_input_config()
                        .map_err(|e| device_error("Failed to get default config", e))?;

                    let sink = audio_processing::StreamSink::new(
                        target,
                        config.sample_rate().0,
                        config.channels() as usize,
                        Arc::clone(&level),
                    );
                    let new_stream = audio_processing::build_stream(&device, sink)?;
                    new_stream
                        .play()
                        .map_err(|e| device_error("Failed to start stream", e))?;

                    stream = Some(new_stream);
                    info!(device = %device_name, "Microphone opened");
                    Ok(())
                })();
                let _ = reply.send(result);
            }
            AudioCommand::Close { reply } => {
                stream.take();
                level.store(0f32.to_bits(), Ordering::Relaxed);
                let _ = reply.send(());
            }
            AudioCommand::Shutdown => break,
        }
    }
    debug!("Audio thread shutting down");
}

/// Microphone source backed by cpal.
pub struct CpalAudioSource {
    current_level: Arc<AtomicU32>,
    selected_device_id: Arc<RwLock<Option<String>>>,
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CpalAudioSource {
    pub fn new() -> Result<Self, DomainError> {
        let current_level = Arc::new(AtomicU32::new(0));
        let selected_device_id = Arc::new(RwLock::new(None));
        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        let thread_device_id = Arc::clone(&selected_device_id);
        let thread_level = Arc::clone(&current_level);

        let thread_handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || audio_thread_main(thread_device_id, thread_level, cmd_rx))
            .map_err(|e| DomainError::AudioDevice {
                message: format!("Failed to spawn audio thread: {}", e),
            })?;

        Ok(Self {
            current_level,
            selected_device_id,
            cmd_tx,
            thread_handle: Mutex::new(Some(thread_handle)),
        })
    }

    fn list_devices_internal(&self) -> Result<Vec<AudioDevice>, DomainError> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(|e| device_error("Failed to enumerate devices", e))?;

        let mut result = Vec::new();
        let mut name_counts: HashMap<String, usize> = HashMap::new();

        for device in devices {
            if let Ok(name) = device.name() {
                let count = name_counts.entry(name.clone()).or_insert(0);
                let id = if *count == 0 {
                    name.clone()
                } else {
                    format!("{}:{}", name, count)
                };
                *count += 1;

                result.push(AudioDevice {
                    id,
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                });
            }
        }

        debug!(count = result.len(), "Listed input devices");
        Ok(result)
    }

    fn thread_gone() -> DomainError {
        DomainError::AudioDevice {
            message: "Audio thread not running".to_string(),
        }
    }
}

impl Drop for CpalAudioSource {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
    }
}

#[async_trait]
impl AudioSource for CpalAudioSource {
    async fn open(&self, target: CaptureTarget) -> Result<(), DomainError> {
        let (reply, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(AudioCommand::Open { target, reply })
            .await
            .map_err(|_| Self::thread_gone())?;
        reply_rx.await.map_err(|_| Self::thread_gone())?
    }

    async fn close(&self) -> Result<(), DomainError> {
        let (reply, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(AudioCommand::Close { reply })
            .await
            .map_err(|_| Self::thread_gone())?;
        reply_rx.await.map_err(|_| Self::thread_gone())
    }

    fn current_level(&self) -> f32 {
        f32::from_bits(self.current_level.load(Ordering::Relaxed))
    }

    fn list_input_devices(&self) -> Result<Vec<AudioDevice>, DomainError> {
        self.list_devices_internal()
    }

    fn select_input_device(&self, device_id: Option<&str>) -> Result<(), DomainError> {
        if let Some(id) = device_id {
            let devices = self.list_devices_internal()?;
            if !devices.iter().any(|d| d.id == id) {
                return Err(DomainError::AudioDevice {
                    message: format!("Device not found: {}", id),
                });
            }
        }

        *self.selected_device_id.write() = device_id.map(String::from);
        info!(device_id = ?device_id, "Input device selected");
        Ok(())
    }
}
