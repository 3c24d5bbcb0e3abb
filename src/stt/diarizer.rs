use crate::error::{DiarscribeError, Result};
use crate::pipeline::types::SpeakerSegment;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Trait for speaker diarization.
///
/// Implementations return speaker turns for the file at `audio_path`. An
/// empty list is a legitimate answer (silence, music, a model that found no
/// speech), not an error.
#[async_trait]
pub trait Diarizer: Send + Sync {
    async fn diarize(
        &self,
        audio_path: &Path,
        expected_speakers: Option<usize>,
        max_speakers: Option<usize>,
    ) -> Result<Vec<SpeakerSegment>>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Diarizer + ?Sized> Diarizer for Arc<T> {
    async fn diarize(
        &self,
        audio_path: &Path,
        expected_speakers: Option<usize>,
        max_speakers: Option<usize>,
    ) -> Result<Vec<SpeakerSegment>> {
        (**self)
            .diarize(audio_path, expected_speakers, max_speakers)
            .await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Mock diarizer returning a fixed set of speaker turns.
#[derive(Debug, Clone, Default)]
pub struct MockDiarizer {
    segments: Vec<SpeakerSegment>,
    should_fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    last_hints: Arc<Mutex<Option<(Option<usize>, Option<usize>)>>>,
}

impl MockDiarizer {
    pub fn new(segments: Vec<SpeakerSegment>) -> Self {
        Self {
            segments,
            ..Self::default()
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Speaker-count hints received by the most recent call.
    pub fn last_hints(&self) -> Option<(Option<usize>, Option<usize>)> {
        self.last_hints.lock().ok().and_then(|guard| *guard)
    }
}

#[async_trait]
impl Diarizer for MockDiarizer {
    async fn diarize(
        &self,
        _audio_path: &Path,
        expected_speakers: Option<usize>,
        max_speakers: Option<usize>,
    ) -> Result<Vec<SpeakerSegment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut hints) = self.last_hints.lock() {
            *hints = Some((expected_speakers, max_speakers));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(DiarscribeError::Diarization {
                message: "mock diarization failure".to_string(),
            });
        }
        Ok(self.segments.clone())
    }

    fn name(&self) -> &str {
        "mock-diarizer"
    }
}
