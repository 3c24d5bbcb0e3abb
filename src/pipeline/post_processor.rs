//! Per-segment text post-processing after speaker attribution.
//!
//! Only segment text is rewritten; words, timestamps and speakers are left
//! exactly as aggregated. A failing collaborator leaves the text it was given.

use crate::pipeline::state::PipelineStep;
use crate::pipeline::types::TranscriptSegment;
use crate::stt::text::{Denormalizer, Punctuator};
use crate::stt::with_timeout;
use std::sync::Arc;
use std::time::Duration;

/// One rewrite applied to each segment's text, in chain order.
enum Rewrite {
    Punctuate(Arc<dyn Punctuator>),
    Denormalize(Arc<dyn Denormalizer>, String),
}

impl Rewrite {
    fn applied_step(&self) -> PipelineStep {
        match self {
            Rewrite::Punctuate(_) => PipelineStep::Punctuation,
            Rewrite::Denormalize(..) => PipelineStep::Denormalization,
        }
    }

    fn failed_step(&self) -> PipelineStep {
        match self {
            Rewrite::Punctuate(_) => PipelineStep::PunctuationFailed,
            Rewrite::Denormalize(..) => PipelineStep::DenormalizationFailed,
        }
    }

    fn collaborator(&self) -> &'static str {
        match self {
            Rewrite::Punctuate(_) => "punctuation",
            Rewrite::Denormalize(..) => "denormalization",
        }
    }
}

/// Chain of text rewrites built for one run.
pub struct PostProcessor {
    rewrites: Vec<Rewrite>,
    timeout: Duration,
}

impl PostProcessor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            rewrites: Vec::new(),
            timeout,
        }
    }

    pub fn with_punctuator(mut self, punctuator: Arc<dyn Punctuator>) -> Self {
        self.rewrites.push(Rewrite::Punctuate(punctuator));
        self
    }

    pub fn with_denormalizer(mut self, denormalizer: Arc<dyn Denormalizer>, style: &str) -> Self {
        self.rewrites
            .push(Rewrite::Denormalize(denormalizer, style.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rewrites.is_empty()
    }

    /// Rewrite every segment's text in place.
    ///
    /// Returns one step per rewrite: the applied step, or its `_failed`
    /// variant if any segment fell back to its previous text.
    pub async fn apply(&self, segments: &mut [TranscriptSegment]) -> Vec<PipelineStep> {
        let mut steps = Vec::with_capacity(self.rewrites.len());

        for rewrite in &self.rewrites {
            let mut failures = 0usize;
            for segment in segments.iter_mut().filter(|s| !s.text.is_empty()) {
                let result = match rewrite {
                    Rewrite::Punctuate(p) => {
                        with_timeout(rewrite.collaborator(), self.timeout, p.punctuate(&segment.text))
                            .await
                    }
                    Rewrite::Denormalize(d, style) => {
                        with_timeout(
                            rewrite.collaborator(),
                            self.timeout,
                            d.denormalize(&segment.text, style),
                        )
                        .await
                    }
                };

                match result {
                    Ok(text) if !text.trim().is_empty() => segment.text = text.trim().to_string(),
                    Ok(_) => {
                        tracing::debug!(
                            segment = segment.id,
                            "{} returned blank text, keeping original",
                            rewrite.collaborator()
                        );
                    }
                    Err(e) => {
                        failures += 1;
                        tracing::warn!(segment = segment.id, "{} failed: {}", rewrite.collaborator(), e);
                    }
                }
            }

            steps.push(if failures == 0 {
                rewrite.applied_step()
            } else {
                rewrite.failed_step()
            });
        }

        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Word;
    use crate::stt::text::{MockDenormalizer, MockPunctuator};

    fn segment(id: usize, text: &str, speaker: &str) -> TranscriptSegment {
        TranscriptSegment {
            id,
            start: id as f64,
            end: id as f64 + 1.0,
            text: text.to_string(),
            speaker: Some(speaker.to_string()),
            words: text
                .split_whitespace()
                .map(|w| Word::new(w, id as f64, id as f64 + 0.5))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_empty_chain_changes_nothing() {
        let processor = PostProcessor::new(Duration::from_secs(1));
        let mut segments = vec![segment(0, "hello there", "Speaker 1")];
        let original = segments.clone();

        assert!(processor.is_empty());
        assert!(processor.apply(&mut segments).await.is_empty());
        assert_eq!(segments, original);
    }

    #[tokio::test]
    async fn test_punctuate_then_denormalize_per_segment() {
        let processor = PostProcessor::new(Duration::from_secs(1))
            .with_punctuator(Arc::new(MockPunctuator::new()))
            .with_denormalizer(
                Arc::new(MockDenormalizer::new().with_replacement("two", "2")),
                "default",
            );
        let mut segments = vec![
            segment(0, "two of us", "Speaker 1"),
            segment(1, "me too", "Speaker 2"),
        ];

        let steps = processor.apply(&mut segments).await;

        assert_eq!(
            steps,
            vec![PipelineStep::Punctuation, PipelineStep::Denormalization]
        );
        assert_eq!(segments[0].text, "2 of us.");
        assert_eq!(segments[1].text, "Me too.");
        // Words and speakers are untouched
        assert_eq!(segments[0].words.len(), 3);
        assert_eq!(segments[1].speaker.as_deref(), Some("Speaker 2"));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_text() {
        let processor = PostProcessor::new(Duration::from_secs(1))
            .with_punctuator(Arc::new(MockPunctuator::new()))
            .with_denormalizer(Arc::new(MockDenormalizer::new().with_failure()), "default");
        let mut segments = vec![segment(0, "keep me", "Speaker 1")];

        let steps = processor.apply(&mut segments).await;

        assert_eq!(
            steps,
            vec![
                PipelineStep::Punctuation,
                PipelineStep::DenormalizationFailed
            ]
        );
        assert_eq!(segments[0].text, "Keep me.");
    }
}
