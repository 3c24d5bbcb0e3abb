//! Orchestrator state machine and the step log exposed as `pipelineSteps`.

use std::fmt;
use std::time::Instant;

/// Phases a pipeline run moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Transcribing,
    Aligning,
    Diarizing,
    Mapping,
    Aggregating,
    PostProcessing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "init",
            PipelineState::Transcribing => "transcribing",
            PipelineState::Aligning => "aligning",
            PipelineState::Diarizing => "diarizing",
            PipelineState::Mapping => "mapping",
            PipelineState::Aggregating => "aggregating",
            PipelineState::PostProcessing => "post_processing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One entry of the step log. `Display` gives the stable string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStep {
    Diarization,
    DiarizationUnavailable,
    SegmentMerge,
    FixedWindows,
    ContextPadding,
    ParallelProcessing,
    AlignmentSkipped(usize),
    SegmentDegraded(usize),
    Transcription,
    Alignment,
    AlignmentUnavailable,
    SpeakerMapping,
    Aggregation,
    Punctuation,
    PunctuationFailed,
    Denormalization,
    DenormalizationFailed,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::Diarization => f.write_str("diarization"),
            PipelineStep::DiarizationUnavailable => f.write_str("diarization_unavailable"),
            PipelineStep::SegmentMerge => f.write_str("segment_merge"),
            PipelineStep::FixedWindows => f.write_str("fixed_windows"),
            PipelineStep::ContextPadding => f.write_str("context_padding"),
            PipelineStep::ParallelProcessing => f.write_str("parallel_segment_processing"),
            PipelineStep::AlignmentSkipped(i) => write!(f, "alignment_skipped:{}", i),
            PipelineStep::SegmentDegraded(i) => write!(f, "segment_degraded:{}", i),
            PipelineStep::Transcription => f.write_str("transcription"),
            PipelineStep::Alignment => f.write_str("alignment"),
            PipelineStep::AlignmentUnavailable => f.write_str("alignment_unavailable"),
            PipelineStep::SpeakerMapping => f.write_str("speaker_mapping"),
            PipelineStep::Aggregation => f.write_str("aggregation"),
            PipelineStep::Punctuation => f.write_str("punctuation"),
            PipelineStep::PunctuationFailed => f.write_str("punctuation_failed"),
            PipelineStep::Denormalization => f.write_str("denormalization"),
            PipelineStep::DenormalizationFailed => f.write_str("denormalization_failed"),
        }
    }
}

/// Current state plus the steps recorded so far in one run.
#[derive(Debug)]
pub struct RunLog {
    state: PipelineState,
    entered: Instant,
    steps: Vec<PipelineStep>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Init,
            entered: Instant::now(),
            steps: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Move to `next`. Terminal states are never left.
    pub fn advance(&mut self, next: PipelineState) {
        if self.state.is_terminal() {
            tracing::debug!(from = %self.state, to = %next, "Ignoring transition out of terminal state");
            return;
        }
        tracing::debug!(
            from = %self.state,
            to = %next,
            elapsed_ms = self.entered.elapsed().as_millis() as u64,
            "Pipeline state change"
        );
        self.state = next;
        self.entered = Instant::now();
    }

    pub fn record(&mut self, step: PipelineStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(ToString::to_string).collect()
    }
}
