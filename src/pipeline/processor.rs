//! Bounded worker pool running transcription and alignment per segment.
//!
//! Workers pull the next segment index from a shared atomic cursor and write
//! the outcome into that index's slot, so results come back in input order
//! however the calls interleave. A segment that fails is degraded in place
//! and the pool keeps going.

use crate::audio::clip::AudioClip;
use crate::audio::wav::AudioBuffer;
use crate::config::PipelineConfig;
use crate::error::{DiarscribeError, Result};
use crate::pipeline::error::{ErrorReporter, SegmentFailure, SegmentStage, TracingReporter};
use crate::pipeline::normalizer::normalize;
use crate::pipeline::padding::PaddedSegment;
use crate::pipeline::types::Word;
use crate::stt::aligner::Aligner;
use crate::stt::transcriber::Transcriber;
use crate::stt::with_timeout;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// How a segment came out of processing.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentStatus {
    /// Transcribed, and aligned when long enough.
    Complete,
    /// Too short for alignment; text only.
    AlignmentSkipped,
    /// A collaborator call failed or timed out.
    Degraded(SegmentFailure),
}

/// Result for one segment, on the original (unpadded) timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOutcome {
    pub segment: PaddedSegment,
    pub text: String,
    pub words: Vec<Word>,
    pub status: SegmentStatus,
}

impl SegmentOutcome {
    fn degraded(segment: PaddedSegment, text: String, failure: SegmentFailure) -> Self {
        Self {
            segment,
            text,
            words: Vec::new(),
            status: SegmentStatus::Degraded(failure),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, SegmentStatus::Degraded(_))
    }

    /// Degraded with nothing left to contribute.
    pub fn is_failed(&self) -> bool {
        self.is_degraded() && self.text.is_empty()
    }
}

#[derive(Clone)]
pub struct ParallelSegmentProcessor {
    transcriber: Arc<dyn Transcriber>,
    aligner: Arc<dyn Aligner>,
    reporter: Arc<dyn ErrorReporter>,
    workers: usize,
    min_segment_for_alignment: f64,
    timeout: Duration,
}

impl ParallelSegmentProcessor {
    pub fn new(transcriber: Arc<dyn Transcriber>, aligner: Arc<dyn Aligner>) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            transcriber,
            aligner,
            reporter: Arc::new(TracingReporter),
            workers: defaults.worker_concurrency,
            min_segment_for_alignment: defaults.min_segment_for_alignment,
            timeout: defaults.collaborator_timeout(),
        }
    }

    /// Take worker count, alignment threshold and timeout from `config`.
    pub fn with_config(mut self, config: &PipelineConfig) -> Self {
        self.workers = config.worker_concurrency.max(1);
        self.min_segment_for_alignment = config.min_segment_for_alignment;
        self.timeout = config.collaborator_timeout();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_min_segment_for_alignment(mut self, seconds: f64) -> Self {
        self.min_segment_for_alignment = seconds;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Process every segment, returning one outcome per input in input order.
    ///
    /// Returns [`DiarscribeError::Cancelled`] if `cancel` fires first; the
    /// in-flight workers are aborted and their clips and child processes are
    /// released.
    pub async fn process(
        &self,
        audio: Arc<AudioBuffer>,
        segments: Vec<PaddedSegment>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SegmentOutcome>> {
        let total = segments.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let jobs: Arc<[PaddedSegment]> = segments.into();
        let slots: Arc<[OnceLock<SegmentOutcome>]> = (0..total).map(|_| OnceLock::new()).collect();
        let cursor = Arc::new(AtomicUsize::new(0));
        let worker_count = self.workers.min(total);

        tracing::debug!(segments = total, workers = worker_count, "Starting segment workers");

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let processor = self.clone();
            let audio = Arc::clone(&audio);
            let jobs = Arc::clone(&jobs);
            let slots = Arc::clone(&slots);
            let cursor = Arc::clone(&cursor);
            workers.spawn(async move {
                processor
                    .work(worker_id, &audio, &jobs, &slots, &cursor)
                    .await;
            });
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    workers.abort_all();
                    while workers.join_next().await.is_some() {}
                    tracing::debug!("Segment workers cancelled");
                    return Err(DiarscribeError::Cancelled);
                }
                joined = workers.join_next() => match joined {
                    None => break,
                    Some(Ok(())) => {}
                    Some(Err(e)) => {
                        tracing::error!("Segment worker stopped abnormally: {}", e);
                    }
                },
            }
        }

        let outcomes = jobs
            .iter()
            .zip(slots.iter())
            .map(|(job, slot)| match slot.get() {
                Some(outcome) => outcome.clone(),
                None => {
                    // Only reachable if a worker panicked mid-segment
                    let failure = SegmentFailure::new(
                        job.index,
                        SegmentStage::Transcription,
                        &DiarscribeError::Other("segment worker stopped".to_string()),
                    );
                    self.reporter.report(&failure);
                    SegmentOutcome::degraded(*job, String::new(), failure)
                }
            })
            .collect();
        Ok(outcomes)
    }

    async fn work(
        &self,
        worker_id: usize,
        audio: &AudioBuffer,
        jobs: &[PaddedSegment],
        slots: &[OnceLock<SegmentOutcome>],
        cursor: &AtomicUsize,
    ) {
        loop {
            let slot = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(job) = jobs.get(slot) else {
                break;
            };

            tracing::trace!(worker = worker_id, segment = job.index, "Processing segment");
            let outcome = self.process_one(audio, *job).await;
            if slots[slot].set(outcome).is_err() {
                tracing::warn!(segment = job.index, "Segment slot was already filled");
            }
        }
    }

    async fn process_one(&self, audio: &AudioBuffer, job: PaddedSegment) -> SegmentOutcome {
        let fail = |stage: SegmentStage, error: &DiarscribeError, text: String| {
            let failure = SegmentFailure::new(job.index, stage, error);
            self.reporter.report(&failure);
            SegmentOutcome::degraded(job, text, failure)
        };

        let clip = match AudioClip::extract(audio, job.window_start, job.window_end) {
            Ok(clip) => clip,
            Err(e) => return fail(SegmentStage::Extraction, &e, String::new()),
        };

        let text = match with_timeout(
            "transcription",
            self.timeout,
            self.transcriber.transcribe(clip.wav_bytes()),
        )
        .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => return fail(SegmentStage::Transcription, &e, String::new()),
        };

        if text.is_empty() {
            return SegmentOutcome {
                segment: job,
                text,
                words: Vec::new(),
                status: SegmentStatus::Complete,
            };
        }

        if job.duration() < self.min_segment_for_alignment {
            tracing::debug!(
                segment = job.index,
                duration = job.duration(),
                "Segment too short for alignment"
            );
            return SegmentOutcome {
                segment: job,
                text,
                words: Vec::new(),
                status: SegmentStatus::AlignmentSkipped,
            };
        }

        match with_timeout(
            "alignment",
            self.timeout,
            self.aligner.align(clip.path(), &text),
        )
        .await
        {
            Ok(alignment) => SegmentOutcome {
                segment: job,
                words: job.own_words(normalize(&alignment, job.time_offset())),
                text,
                status: SegmentStatus::Complete,
            },
            Err(e) => fail(SegmentStage::Alignment, &e, text),
        }
    }
}
