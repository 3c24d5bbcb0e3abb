//! Speaker-attribution pipeline.
//!
//! Reconciles a transcript, per-word alignment timestamps and diarization
//! turns into ordered, speaker-labeled transcript segments. Stages run leaves
//! first: merge → pad → transcribe/align per segment → map → aggregate →
//! post-process.

pub mod aggregator;
pub mod error;
pub mod mapper;
pub mod merger;
pub mod normalizer;
pub mod orchestrator;
pub mod padding;
pub mod post_processor;
pub mod processor;
pub mod state;
pub mod types;

pub use aggregator::{Placeholder, aggregate, aggregate_with_placeholders, render};
pub use error::{ErrorReporter, SegmentFailure, SegmentStage, TracingReporter};
pub use mapper::WordSpeakerMapper;
pub use merger::SegmentMerger;
pub use normalizer::normalize;
pub use orchestrator::{Collaborators, Pipeline};
pub use padding::{ContextPadder, PaddedSegment};
pub use post_processor::PostProcessor;
pub use processor::{ParallelSegmentProcessor, SegmentOutcome, SegmentStatus};
pub use state::{PipelineState, PipelineStep};
pub use types::{PipelineRequest, PipelineResult, SpeakerSegment, TranscriptSegment, Word};
