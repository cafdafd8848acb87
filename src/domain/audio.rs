use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Audio capture state machine.
///
/// State transitions:
/// - Idle -> Recording (start_capture)
/// - Recording -> Finalizing (stop_capture, buffered chunks are flushed)
/// - Finalizing -> Idle (finished clip handed to the caller)
///
/// start_capture while Recording and stop_capture while not Recording are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CaptureState {
    /// Ready to record, no active capture.
    Idle = 0,
    /// Actively buffering audio chunks.
    Recording = 1,
    /// Flushing buffered chunks into a finished clip.
    Finalizing = 2,
}

impl CaptureState {
    /// Check if recording can be started from this state.
    #[must_use]
    pub fn can_start(&self) -> bool {
        matches!(self, CaptureState::Idle)
    }

    /// Check if recording can be stopped from this state.
    #[must_use]
    pub fn can_stop(&self) -> bool {
        matches!(self, CaptureState::Recording)
    }
}

impl From<u8> for CaptureState {
    fn from(value: u8) -> Self {
        match value {
            1 => CaptureState::Recording,
            2 => CaptureState::Finalizing,
            _ => CaptureState::Idle,
        }
    }
}

impl From<CaptureState> for u8 {
    fn from(state: CaptureState) -> Self {
        state as u8
    }
}

/// Atomic wrapper for CaptureState for lock-free reads.
#[derive(Debug)]
pub struct AtomicCaptureState(AtomicU8);

impl AtomicCaptureState {
    pub fn new(state: CaptureState) -> Self {
        Self(AtomicU8::new(state.into()))
    }

    pub fn load(&self) -> CaptureState {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn store(&self, state: CaptureState) {
        self.0.store(state.into(), Ordering::Release);
    }

    /// Compare and swap, returns true if successful.
    pub fn compare_exchange(&self, current: CaptureState, new: CaptureState) -> bool {
        self.0
            .compare_exchange(current.into(), new.into(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicCaptureState {
    fn default() -> Self {
        Self::new(CaptureState::Idle)
    }
}

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Maximum recording duration in seconds (ring buffer size).
    pub buffer_duration_secs: u32,
    /// Target sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            buffer_duration_secs: 60,
            sample_rate: 16_000,
        }
    }
}

impl AudioConfig {
    /// Calculate the ring buffer capacity in samples.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_duration_secs as usize * self.sample_rate as usize
    }
}

/// Events emitted by the audio capture system.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum AudioEvent {
    StateChanged {
        from: CaptureState,
        to: CaptureState,
    },
    /// A finished clip was handed off.
    ClipReady {
        bytes: usize,
        duration_secs: f32,
        /// Samples lost because the recording outgrew the buffer.
        dropped_samples: usize,
    },
    /// The recording reached `buffer_duration_secs`; later audio is dropped.
    BufferFull {
        capacity_secs: u32,
    },
    Error {
        message: String,
    },
    /// RMS level normalized to 0.0-1.0.
    LevelUpdate {
        level: f32,
    },
}

/// Input audio device information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Unique device identifier.
    pub id: String,
    /// Human-readable device name.
    pub name: String,
    /// Whether this is the system default device.
    pub is_default: bool,
}
