//! Forced-alignment collaborator and the shape of what it returns.
//!
//! The result is hierarchical: utterances contain sub-segments, which contain
//! tokens. Only some tokens are words; punctuation and whitespace tokens
//! usually arrive without timestamps. `pipeline::normalizer` is the only code
//! that reads this shape.

use crate::error::{DiarscribeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a token represents in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    #[default]
    Word,
    Punctuation,
    Space,
}

/// Smallest unit of an alignment: a word or a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedToken {
    pub text: String,
    #[serde(default)]
    pub kind: TokenKind,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub score: Option<f32>,
}

impl AlignedToken {
    pub fn word(text: &str, start: f64, end: f64) -> Self {
        Self {
            text: text.to_string(),
            kind: TokenKind::Word,
            start: Some(start),
            end: Some(end),
            score: None,
        }
    }

    pub fn punctuation(text: &str) -> Self {
        Self {
            text: text.to_string(),
            kind: TokenKind::Punctuation,
            start: None,
            end: None,
            score: None,
        }
    }

    pub fn space() -> Self {
        Self {
            text: " ".to_string(),
            kind: TokenKind::Space,
            start: None,
            end: None,
            score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AlignedSubSegment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub tokens: Vec<AlignedToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AlignedUtterance {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub sub_segments: Vec<AlignedSubSegment>,
}

/// Full alignment output for one audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AlignmentResult {
    #[serde(default)]
    pub utterances: Vec<AlignedUtterance>,
}

impl AlignmentResult {
    /// Single utterance/sub-segment wrapping the given tokens.
    pub fn from_tokens(text: &str, tokens: Vec<AlignedToken>) -> Self {
        let start = tokens.iter().find_map(|t| t.start);
        let end = tokens.iter().rev().find_map(|t| t.end);
        Self {
            utterances: vec![AlignedUtterance {
                text: text.to_string(),
                start,
                end,
                sub_segments: vec![AlignedSubSegment {
                    text: text.to_string(),
                    start,
                    end,
                    tokens,
                }],
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.utterances
            .iter()
            .all(|u| u.sub_segments.iter().all(|s| s.tokens.is_empty()))
    }
}

/// Trait for forced alignment of a known transcript against audio.
#[async_trait]
pub trait Aligner: Send + Sync {
    /// Align `transcript` against the WAV file at `audio_path`.
    ///
    /// Timestamps are relative to the start of that file. Very short inputs
    /// may legitimately produce no word-level data.
    async fn align(&self, audio_path: &Path, transcript: &str) -> Result<AlignmentResult>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Aligner + ?Sized> Aligner for Arc<T> {
    async fn align(&self, audio_path: &Path, transcript: &str) -> Result<AlignmentResult> {
        (**self).align(audio_path, transcript).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Spread the transcript's words evenly over `duration` seconds.
///
/// Trailing punctuation is split off into an untimed punctuation token and
/// words are separated by untimed space tokens, the way real aligners report
/// them.
pub fn uniform_alignment(transcript: &str, duration: f64) -> AlignmentResult {
    let words: Vec<&str> = transcript.split_whitespace().collect();
    if words.is_empty() || duration <= 0.0 {
        return AlignmentResult::default();
    }

    let slot = duration / words.len() as f64;
    let mut tokens = Vec::with_capacity(words.len() * 2);
    for (i, raw) in words.iter().enumerate() {
        if i > 0 {
            tokens.push(AlignedToken::space());
        }
        let bare = raw.trim_end_matches(|c: char| c.is_ascii_punctuation());
        let punct = &raw[bare.len()..];
        let start = i as f64 * slot;
        if !bare.is_empty() {
            tokens.push(AlignedToken::word(bare, start, start + slot * 0.9));
        }
        if !punct.is_empty() {
            tokens.push(AlignedToken::punctuation(punct));
        }
    }

    AlignmentResult::from_tokens(transcript, tokens)
}

type AlignHandler = Arc<dyn Fn(&Path, &str) -> Result<AlignmentResult> + Send + Sync>;

/// Mock aligner for testing.
///
/// By default it reads the clip's duration and spreads the transcript over
/// it with [`uniform_alignment`].
#[derive(Clone)]
pub struct MockAligner {
    should_fail: bool,
    empty: bool,
    delay: Option<Duration>,
    handler: Option<AlignHandler>,
    calls: Arc<AtomicUsize>,
}

impl MockAligner {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            empty: false,
            delay: None,
            handler: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Return no word-level data at all.
    pub fn with_empty_result(mut self) -> Self {
        self.empty = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Path, &str) -> Result<AlignmentResult> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockAligner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Aligner for MockAligner {
    async fn align(&self, audio_path: &Path, transcript: &str) -> Result<AlignmentResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(handler) = &self.handler {
            return handler(audio_path, transcript);
        }
        if self.should_fail {
            return Err(DiarscribeError::Alignment {
                message: "mock alignment failure".to_string(),
            });
        }
        if self.empty {
            return Ok(AlignmentResult::default());
        }

        let reader = hound::WavReader::open(audio_path)?;
        let spec = reader.spec();
        let duration = reader.duration() as f64 / spec.sample_rate as f64;
        Ok(uniform_alignment(transcript, duration))
    }

    fn name(&self) -> &str {
        "mock-aligner"
    }
}
