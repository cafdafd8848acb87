use std::path::Path;

use zeroize::Zeroize;

use crate::domain::DomainError;

/// Recorded PCM samples that are securely zeroed on drop.
#[derive(Debug, Zeroize)]
#[zeroize(drop)]
pub struct AudioBuffer {
    /// PCM audio samples (16-bit mono).
    samples: Vec<i16>,
    /// Sample rate in Hz.
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new empty audio buffer.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    /// Create an audio buffer with pre-allocated capacity.
    pub fn with_capacity(sample_rate: u32, capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            sample_rate,
        }
    }

    /// Append samples to the buffer.
    pub fn push_samples(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Encode as a 16-bit PCM mono WAV file.
    pub fn to_wav(&self) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let audio_format: u16 = 1; // PCM

        let byte_rate = self.sample_rate * num_channels as u32 * (bits_per_sample as u32 / 8);
        let block_align = num_channels * (bits_per_sample / 8);
        let data_bytes_len = self.samples.len() as u32 * 2;

        let mut out = Vec::with_capacity((44 + data_bytes_len) as usize);

        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_bytes_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");

        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&audio_format.to_le_bytes());
        out.extend_from_slice(&num_channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits_per_sample.to_le_bytes());

        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_bytes_len.to_le_bytes());
        for s in &self.samples {
            out.extend_from_slice(&s.to_le_bytes());
        }

        out
    }
}

/// A finished audio object ready for upload: a recording or a user-supplied file.
///
/// The encoded bytes are zeroed when the clip is dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct AudioClip {
    bytes: Vec<u8>,
    #[zeroize(skip)]
    mime: String,
    #[zeroize(skip)]
    file_name: String,
    #[zeroize(skip)]
    duration_secs: Option<f32>,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            file_name: file_name.into(),
            duration_secs: None,
        }
    }

    /// Encode a finished recording as `recording.wav`.
    pub fn from_recording(buffer: &AudioBuffer) -> Self {
        Self {
            bytes: buffer.to_wav(),
            mime: "audio/wav".to_string(),
            file_name: "recording.wav".to_string(),
            duration_secs: Some(buffer.duration_secs()),
        }
    }

    /// Read an audio file from disk, guessing its type from the extension.
    pub fn from_file(path: &Path) -> Result<Self, DomainError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let mime = mime_for_extension(path.extension().and_then(|e| e.to_str()));
        Ok(Self::new(bytes, mime, file_name))
    }

    /// Same clip under a different upload name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn duration_secs(&self) -> Option<f32> {
        self.duration_secs
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// False for zero-byte payloads and for recordings that captured no samples.
    pub fn has_audio(&self) -> bool {
        !self.bytes.is_empty() && self.duration_secs.map_or(true, |d| d > 0.0)
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("bytes_len", &self.bytes.len())
            .field("duration_secs", &self.duration_secs)
            .finish()
    }
}

pub(crate) fn mime_for_extension(ext: Option<&str>) -> &'static str {
    match ext.map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        Some("m4a") | Some("mp4") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

pub(crate) fn extension_for_mime(mime: &str) -> &'static str {
    let mime = mime.to_ascii_lowercase();
    if mime.contains("mpeg") || mime.contains("mp3") {
        "mp3"
    } else if mime.contains("ogg") {
        "ogg"
    } else if mime.contains("webm") {
        "webm"
    } else if mime.contains("flac") {
        "flac"
    } else if mime.contains("mp4") {
        "m4a"
    } else {
        "wav"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_buffer_push_samples() {
        let mut buffer = AudioBuffer::new(16000);
        buffer.push_samples(&[100, 200, 300]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.samples(), &[100, 200, 300]);
    }

    #[test]
    fn test_audio_buffer_duration() {
        let mut buffer = AudioBuffer::new(16000);
        buffer.push_samples(&vec![0i16; 16000]);
        assert!((buffer.duration_secs() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_wav_header() {
        let mut buffer = AudioBuffer::new(16000);
        buffer.push_samples(&[1, -1]);
        let wav = buffer.to_wav();

        assert!(wav.starts_with(b"RIFF"));
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(wav.len(), 44 + 4);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 16000);
    }

    #[test]
    fn test_clip_from_recording() {
        let mut buffer = AudioBuffer::new(16000);
        buffer.push_samples(&vec![0i16; 8000]);
        let clip = AudioClip::from_recording(&buffer);

        assert_eq!(clip.mime(), "audio/wav");
        assert_eq!(clip.file_name(), "recording.wav");
        assert!(!clip.is_empty());
        assert!((clip.duration_secs().unwrap() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(mime_for_extension(Some("WAV")), "audio/wav");
        assert_eq!(mime_for_extension(Some("webm")), "audio/webm");
        assert_eq!(mime_for_extension(None), "application/octet-stream");
        assert_eq!(extension_for_mime("audio/mpeg"), "mp3");
        assert_eq!(extension_for_mime("audio/x-wav"), "wav");
    }
}
