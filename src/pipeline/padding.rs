//! Context padding around segments before audio extraction.

use crate::config::PipelineConfig;
use crate::pipeline::types::Word;

/// A segment together with the padded window its audio is cut from.
///
/// `start`/`end` are the unpadded bounds on the original timeline; the
/// window adds context on both sides, clamped to the recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddedSegment {
    /// Position in the processing order.
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub window_start: f64,
    pub window_end: f64,
}

impl PaddedSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Offset that maps clip-relative timestamps back onto the original
    /// timeline.
    pub fn time_offset(&self) -> f64 {
        self.window_start
    }

    /// Padding actually applied before the segment (less than the configured
    /// amount near the start of the recording).
    pub fn lead_padding(&self) -> f64 {
        self.start - self.window_start
    }

    pub fn trail_padding(&self) -> f64 {
        self.window_end - self.end
    }

    /// Keep the words this segment owns, trimmed to its unpadded bounds.
    ///
    /// A word belongs here when its midpoint lies in `[start, end)`; speech
    /// heard only in the padding belongs to the neighbouring segment. Words
    /// must already be on the original timeline.
    pub fn own_words(&self, words: Vec<Word>) -> Vec<Word> {
        let total = words.len();
        let owned: Vec<Word> = words
            .into_iter()
            .filter(|w| {
                let midpoint = w.midpoint();
                midpoint >= self.start && midpoint < self.end
            })
            .map(|mut w| {
                w.start = w.start.max(self.start);
                w.end = w.end.min(self.end);
                w
            })
            .collect();

        if owned.len() < total {
            tracing::trace!(
                segment = self.index,
                dropped = total - owned.len(),
                "Dropped words from the padding margins"
            );
        }
        owned
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextPadder {
    padding: f64,
}

impl Default for ContextPadder {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ContextPadder {
    pub fn new(padding: f64) -> Self {
        Self {
            padding: padding.max(0.0),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.context_padding)
    }

    /// Window `[max(0, start - pad), min(audio_duration, end + pad)]`.
    pub fn pad(&self, index: usize, start: f64, end: f64, audio_duration: f64) -> PaddedSegment {
        PaddedSegment {
            index,
            start,
            end,
            window_start: (start - self.padding).max(0.0),
            window_end: (end + self.padding).min(audio_duration),
        }
    }

    /// Pad a list of `(start, end)` bounds, indexing them in order.
    pub fn pad_all(&self, bounds: &[(f64, f64)], audio_duration: f64) -> Vec<PaddedSegment> {
        bounds
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| self.pad(i, start, end, audio_duration))
            .collect()
    }
}
