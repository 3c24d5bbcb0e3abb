//! Pipeline orchestration: strategy dispatch, phase sequencing and result
//! assembly.
//!
//! Both strategies end in the same tail (speaker mapping, aggregation,
//! post-processing), so callers get an identical result shape whichever one
//! ran.

use crate::audio::clip::AudioClip;
use crate::audio::wav::AudioBuffer;
use crate::config::{PipelineConfig, Strategy};
use crate::error::{DiarscribeError, Result};
use crate::pipeline::aggregator::{
    Placeholder, aggregate_with_placeholders, distinct_speakers, plain_text, render,
};
use crate::pipeline::error::{ErrorReporter, TracingReporter};
use crate::pipeline::mapper::WordSpeakerMapper;
use crate::pipeline::merger::{SegmentMerger, fixed_windows};
use crate::pipeline::normalizer::normalize;
use crate::pipeline::padding::ContextPadder;
use crate::pipeline::post_processor::PostProcessor;
use crate::pipeline::processor::{ParallelSegmentProcessor, SegmentStatus};
use crate::pipeline::state::{PipelineState, PipelineStep, RunLog};
use crate::pipeline::types::{PipelineRequest, PipelineResult, SpeakerSegment, Word};
use crate::stt::aligner::Aligner;
use crate::stt::diarizer::Diarizer;
use crate::stt::text::{Denormalizer, Punctuator};
use crate::stt::transcriber::Transcriber;
use crate::stt::with_timeout;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Collaborator handles injected into a [`Pipeline`].
///
/// Construct these once at startup and share them across runs.
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub aligner: Arc<dyn Aligner>,
    pub diarizer: Option<Arc<dyn Diarizer>>,
    pub punctuator: Option<Arc<dyn Punctuator>>,
    pub denormalizer: Option<Arc<dyn Denormalizer>>,
}

impl Collaborators {
    pub fn new(transcriber: Arc<dyn Transcriber>, aligner: Arc<dyn Aligner>) -> Self {
        Self {
            transcriber,
            aligner,
            diarizer: None,
            punctuator: None,
            denormalizer: None,
        }
    }

    pub fn with_diarizer(mut self, diarizer: Arc<dyn Diarizer>) -> Self {
        self.diarizer = Some(diarizer);
        self
    }

    pub fn with_punctuator(mut self, punctuator: Arc<dyn Punctuator>) -> Self {
        self.punctuator = Some(punctuator);
        self
    }

    pub fn with_denormalizer(mut self, denormalizer: Arc<dyn Denormalizer>) -> Self {
        self.denormalizer = Some(denormalizer);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("transcriber", &self.transcriber.model_name())
            .field("aligner", &self.aligner.name())
            .field("diarizer", &self.diarizer.as_ref().map(|d| d.name().to_string()))
            .field("punctuator", &self.punctuator.as_ref().map(|p| p.name().to_string()))
            .field(
                "denormalizer",
                &self.denormalizer.as_ref().map(|d| d.name().to_string()),
            )
            .finish()
    }
}

/// Timed words plus the speaker turns they are to be mapped against.
struct Attributed {
    words: Vec<Word>,
    turns: Vec<SpeakerSegment>,
    /// Failed segments, positioned in `words`.
    placeholders: Vec<Placeholder>,
    word_level: bool,
}

/// Speaker-attribution pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    collaborators: Collaborators,
    reporter: Arc<dyn ErrorReporter>,
    mapper: WordSpeakerMapper,
}

impl Pipeline {
    /// Build a pipeline; fails if `config` does not validate.
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            collaborators,
            reporter: Arc::new(TracingReporter),
            mapper: WordSpeakerMapper::default(),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineResult> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Run the pipeline, aborting with [`DiarscribeError::Cancelled`] as soon
    /// as `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        request: &PipelineRequest,
        cancel: CancellationToken,
    ) -> Result<PipelineResult> {
        let started = Instant::now();
        let mut log = RunLog::new();
        let span = tracing::info_span!("pipeline", strategy = self.config.strategy.as_str());

        tracing::info!(
            parent: &span,
            bytes = request.audio_bytes.len(),
            diarization = request.enable_diarization,
            "Starting pipeline run"
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DiarscribeError::Cancelled),
            result = self.execute(request, &mut log, &cancel).instrument(span.clone()) => result,
        };

        match outcome {
            Ok(mut result) => {
                log.advance(PipelineState::Done);
                result.processing_time_seconds = started.elapsed().as_secs_f64();
                result.pipeline_steps = log.step_names();
                tracing::info!(
                    parent: &span,
                    segments = result.segments.len(),
                    speakers = result.speaker_count_detected,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pipeline run finished"
                );
                Ok(result)
            }
            Err(e) => {
                log.advance(PipelineState::Failed);
                if matches!(e, DiarscribeError::Cancelled) {
                    tracing::info!(parent: &span, "Pipeline run cancelled");
                } else {
                    tracing::error!(parent: &span, "Pipeline run failed: {}", e);
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        request: &PipelineRequest,
        log: &mut RunLog,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        let audio = Arc::new(AudioBuffer::from_wav_bytes(&request.audio_bytes)?);
        tracing::debug!(seconds = audio.duration(), "Decoded input audio");

        let attributed = match self.config.strategy {
            Strategy::SegmentFirst => self.segment_first(request, audio, log, cancel).await?,
            Strategy::WholeAudioFirst => self.whole_audio_first(request, &audio, log).await?,
        };

        self.finish(request, attributed, log).await
    }

    async fn segment_first(
        &self,
        request: &PipelineRequest,
        audio: Arc<AudioBuffer>,
        log: &mut RunLog,
        cancel: &CancellationToken,
    ) -> Result<Attributed> {
        let duration = audio.duration();

        let turns = match self.diarizer_for(request, log) {
            Some(diarizer) => {
                let clip = AudioClip::whole(&audio)?;
                self.diarize(diarizer, request, &clip, log).await
            }
            None => Vec::new(),
        };

        let mut bounds: Vec<(f64, f64)> = Vec::new();
        if !turns.is_empty() {
            bounds = SegmentMerger::from_config(&self.config)
                .merge(&turns)
                .iter()
                .map(|s| (s.start.max(0.0), s.end().min(duration)))
                .filter(|(start, end)| end > start)
                .collect();
            log.record(PipelineStep::SegmentMerge);
        }
        if bounds.is_empty() {
            bounds = fixed_windows(duration, self.config.max_segment_for_transcription);
            log.record(PipelineStep::FixedWindows);
        }

        let padded = ContextPadder::from_config(&self.config).pad_all(&bounds, duration);
        log.record(PipelineStep::ContextPadding);

        log.advance(PipelineState::Transcribing);
        let processor = ParallelSegmentProcessor::new(
            Arc::clone(&self.collaborators.transcriber),
            Arc::clone(&self.collaborators.aligner),
        )
        .with_config(&self.config)
        .with_reporter(Arc::clone(&self.reporter));
        let outcomes = processor.process(audio, padded, cancel).await?;
        log.record(PipelineStep::ParallelProcessing);

        for outcome in &outcomes {
            match outcome.status {
                SegmentStatus::Complete => {}
                SegmentStatus::AlignmentSkipped => {
                    log.record(PipelineStep::AlignmentSkipped(outcome.segment.index))
                }
                SegmentStatus::Degraded(_) => {
                    log.record(PipelineStep::SegmentDegraded(outcome.segment.index))
                }
            }
        }

        if outcomes.iter().all(|o| o.is_failed()) {
            return Err(DiarscribeError::AllSegmentsFailed {
                count: outcomes.len(),
            });
        }

        let mut words = Vec::new();
        let mut placeholders = Vec::new();
        let mut word_level = true;
        for outcome in outcomes {
            if outcome.is_failed() {
                placeholders.push(Placeholder {
                    position: words.len(),
                    start: outcome.segment.start,
                    end: outcome.segment.end,
                });
            } else if !outcome.words.is_empty() {
                words.extend(outcome.words);
            } else if !outcome.text.is_empty() {
                // Text without timings still has to land in the transcript
                word_level = false;
                words.push(Word::new(
                    outcome.text,
                    outcome.segment.start,
                    outcome.segment.end,
                ));
            }
        }

        if words.is_empty() {
            return Err(DiarscribeError::EmptyTranscription);
        }

        Ok(Attributed {
            words,
            turns,
            placeholders,
            word_level,
        })
    }

    async fn whole_audio_first(
        &self,
        request: &PipelineRequest,
        audio: &AudioBuffer,
        log: &mut RunLog,
    ) -> Result<Attributed> {
        let timeout = self.config.collaborator_timeout();
        let clip = AudioClip::whole(audio)?;

        log.advance(PipelineState::Transcribing);
        let text = with_timeout(
            "transcription",
            timeout,
            self.collaborators.transcriber.transcribe(clip.wav_bytes()),
        )
        .await
        .map_err(fatal)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(DiarscribeError::EmptyTranscription);
        }
        log.record(PipelineStep::Transcription);

        log.advance(PipelineState::Aligning);
        let alignment = with_timeout(
            "alignment",
            timeout,
            self.collaborators.aligner.align(clip.path(), text),
        )
        .await
        .map_err(fatal)?;

        let mut words = normalize(&alignment, 0.0);
        let word_level = !words.is_empty();
        if word_level {
            log.record(PipelineStep::Alignment);
        } else {
            tracing::warn!("Alignment returned no words, keeping the transcript untimed");
            log.record(PipelineStep::AlignmentUnavailable);
            words.push(Word::new(text, 0.0, audio.duration()));
        }

        let turns = match self.diarizer_for(request, log) {
            Some(diarizer) => self.diarize(diarizer, request, &clip, log).await,
            None => Vec::new(),
        };

        Ok(Attributed {
            words,
            turns,
            placeholders: Vec::new(),
            word_level,
        })
    }

    /// The diarizer to call for this request, recording why there is none.
    fn diarizer_for(&self, request: &PipelineRequest, log: &mut RunLog) -> Option<Arc<dyn Diarizer>> {
        if !request.enable_diarization {
            tracing::debug!("Diarization disabled for this run");
            log.record(PipelineStep::DiarizationUnavailable);
            return None;
        }
        match &self.collaborators.diarizer {
            Some(diarizer) => Some(Arc::clone(diarizer)),
            None => {
                tracing::warn!("Diarization requested but no diarizer is configured");
                log.record(PipelineStep::DiarizationUnavailable);
                None
            }
        }
    }

    /// Speaker turns for the whole recording; empty when unavailable.
    async fn diarize(
        &self,
        diarizer: Arc<dyn Diarizer>,
        request: &PipelineRequest,
        clip: &AudioClip,
        log: &mut RunLog,
    ) -> Vec<SpeakerSegment> {
        log.advance(PipelineState::Diarizing);
        let result = with_timeout(
            "diarization",
            self.config.collaborator_timeout(),
            diarizer.diarize(clip.path(), request.speaker_count_hint, request.max_speakers),
        )
        .await;

        match result {
            Ok(mut turns) => {
                turns.retain(|t| t.start.is_finite() && t.duration.is_finite() && t.duration > 0.0);
                if turns.is_empty() {
                    tracing::info!("Diarization found no speaker turns");
                    log.record(PipelineStep::DiarizationUnavailable);
                } else {
                    tracing::debug!(turns = turns.len(), "Diarization finished");
                    log.record(PipelineStep::Diarization);
                }
                turns
            }
            Err(e) => {
                tracing::warn!("Diarization unavailable: {}", e);
                log.record(PipelineStep::DiarizationUnavailable);
                Vec::new()
            }
        }
    }

    async fn finish(
        &self,
        request: &PipelineRequest,
        attributed: Attributed,
        log: &mut RunLog,
    ) -> Result<PipelineResult> {
        let diarization_applied = !attributed.turns.is_empty();

        log.advance(PipelineState::Mapping);
        let words = self.mapper.map(attributed.words, &attributed.turns);
        if diarization_applied {
            log.record(PipelineStep::SpeakerMapping);
        }

        log.advance(PipelineState::Aggregating);
        let mut segments = aggregate_with_placeholders(words, &attributed.placeholders);
        log.record(PipelineStep::Aggregation);
        let raw_text = plain_text(&segments);

        log.advance(PipelineState::PostProcessing);
        let post_processor = self.post_processor(request, log);
        if post_processor.is_empty() {
            tracing::debug!("No text post-processing requested");
        } else {
            for step in post_processor.apply(&mut segments).await {
                log.record(step);
            }
        }

        Ok(PipelineResult {
            text: render(&segments, diarization_applied),
            raw_text,
            processing_time_seconds: 0.0,
            pipeline_steps: Vec::new(),
            diarization_applied,
            word_level_timestamps: attributed.word_level,
            speaker_count_detected: distinct_speakers(&segments),
            segments,
        })
    }

    fn post_processor(&self, request: &PipelineRequest, log: &mut RunLog) -> PostProcessor {
        let mut chain = PostProcessor::new(self.config.collaborator_timeout());

        if request.punctuate {
            match &self.collaborators.punctuator {
                Some(p) => chain = chain.with_punctuator(Arc::clone(p)),
                None => {
                    tracing::warn!("Punctuation requested but no punctuator is configured");
                    log.record(PipelineStep::PunctuationFailed);
                }
            }
        }
        if request.denormalize {
            match &self.collaborators.denormalizer {
                Some(d) => {
                    chain = chain.with_denormalizer(Arc::clone(d), &request.denormalize_style)
                }
                None => {
                    tracing::warn!("Denormalization requested but no denormalizer is configured");
                    log.record(PipelineStep::DenormalizationFailed);
                }
            }
        }

        chain
    }
}

/// Whole-audio runs have no smaller unit to degrade to.
fn fatal(error: DiarscribeError) -> DiarscribeError {
    DiarscribeError::FatalInput {
        message: error.to_string(),
    }
}
