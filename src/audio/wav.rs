//! WAV decoding into a shared 16kHz mono buffer, and encoding clips back out.

use crate::defaults::SAMPLE_RATE;
use crate::error::{DiarscribeError, Result};
use std::io::Cursor;

/// Decoded recording, resampled to 16kHz mono.
///
/// Read-only once built; workers share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<i16>,
}

impl AudioBuffer {
    /// Wrap samples that are already 16kHz mono.
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// Decode WAV file contents of any sample rate and channel count.
    ///
    /// Anything hound cannot parse, or a file with no samples, is a fatal
    /// input error: no stage can run without audio.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(DiarscribeError::FatalInput {
                message: "audio input is empty".to_string(),
            });
        }

        let mut wav_reader =
            hound::WavReader::new(Cursor::new(bytes)).map_err(|e| DiarscribeError::FatalInput {
                message: format!("Failed to parse WAV data: {}", e),
            })?;

        let spec = wav_reader.spec();
        let source_rate = spec.sample_rate;
        let source_channels = spec.channels.max(1) as usize;

        let raw_samples: Vec<i16> = match spec.sample_format {
            hound::SampleFormat::Int if spec.bits_per_sample <= 16 => wav_reader
                .samples::<i16>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let shift = spec.bits_per_sample.saturating_sub(16) as u32;
                wav_reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (v >> shift) as i16))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<std::result::Result<Vec<_>, _>>(),
        }
        .map_err(|e| DiarscribeError::FatalInput {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

        // Downmix by averaging all channels of each frame
        let mono_samples: Vec<i16> = if source_channels > 1 {
            raw_samples
                .chunks_exact(source_channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / source_channels as i32) as i16
                })
                .collect()
        } else {
            raw_samples
        };

        let samples = if source_rate != SAMPLE_RATE {
            resample(&mono_samples, source_rate, SAMPLE_RATE)
        } else {
            mono_samples
        };

        if samples.is_empty() {
            return Err(DiarscribeError::FatalInput {
                message: "WAV data contains no samples".to_string(),
            });
        }

        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Length of the recording in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }

    /// Samples between `start` and `end` seconds, clamped to the recording.
    pub fn slice(&self, start: f64, end: f64) -> &[i16] {
        let to_index = |t: f64| -> usize {
            let idx = (t.max(0.0) * SAMPLE_RATE as f64).round() as usize;
            idx.min(self.samples.len())
        };
        let from = to_index(start);
        let to = to_index(end).max(from);
        &self.samples[from..to]
    }

    /// The whole recording as 16-bit 16kHz mono WAV bytes.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        encode_wav(&self.samples)
    }
}

/// Encode 16kHz mono samples as a 16-bit PCM WAV file in memory.
pub fn encode_wav(samples: &[i16]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

/// Simple linear interpolation resampling.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}
