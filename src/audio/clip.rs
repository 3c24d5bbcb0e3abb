//! Audio clips handed to collaborators.
//!
//! A clip carries both representations the collaborators want: WAV bytes for
//! transcription and a file on disk for alignment and diarization. The file
//! is a `NamedTempFile`, removed as soon as the clip is dropped, so a worker
//! that is cancelled or times out releases its extraction without cleanup code.

use crate::audio::wav::{AudioBuffer, encode_wav};
use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub struct AudioClip {
    start: f64,
    end: f64,
    wav_bytes: Vec<u8>,
    file: NamedTempFile,
}

impl AudioClip {
    /// Extract `[start, end]` seconds of `buffer` into a new clip.
    pub fn extract(buffer: &AudioBuffer, start: f64, end: f64) -> Result<Self> {
        let wav_bytes = encode_wav(buffer.slice(start, end))?;
        Self::from_wav_bytes(wav_bytes, start, end)
    }

    /// The whole recording as one clip.
    pub fn whole(buffer: &AudioBuffer) -> Result<Self> {
        Self::extract(buffer, 0.0, buffer.duration())
    }

    fn from_wav_bytes(wav_bytes: Vec<u8>, start: f64, end: f64) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("diarscribe-clip-")
            .suffix(".wav")
            .tempfile()?;
        file.write_all(&wav_bytes)?;
        file.flush()?;

        Ok(Self {
            start,
            end,
            wav_bytes,
            file,
        })
    }

    pub fn wav_bytes(&self) -> &[u8] {
        &self.wav_bytes
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Where the clip starts on the recording's timeline, in seconds.
    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("bytes", &self.wav_bytes.len())
            .field("path", &self.file.path())
            .finish()
    }
}
