//! Default configuration constants for diarscribe.
//!
//! Shared by `PipelineConfig`, the CLI and the tests so every default lives
//! in exactly one place.

/// Sample rate every collaborator receives, in Hz.
///
/// Input audio of any rate is resampled to this before segmentation.
pub const SAMPLE_RATE: u32 = 16000;

/// Number of segments transcribed and aligned concurrently.
pub const WORKER_CONCURRENCY: usize = 4;

/// Diarization runs shorter than this (seconds) are merged with their
/// same-speaker neighbours before transcription.
///
/// Acoustic models lose accuracy sharply on very short spans.
pub const MIN_SEGMENT_FOR_TRANSCRIPTION: f64 = 2.0;

/// Upper bound (seconds) on a merged segment handed to transcription.
pub const MAX_SEGMENT_FOR_TRANSCRIPTION: f64 = 30.0;

/// Segments shorter than this (seconds, unpadded) are transcribed but not
/// aligned; they come back text-only.
pub const MIN_SEGMENT_FOR_ALIGNMENT: f64 = 0.5;

/// Audio context (seconds) added on both sides of a segment before extraction.
pub const CONTEXT_PADDING: f64 = 0.5;

/// Per-call timeout for any external collaborator, in seconds.
pub const COLLABORATOR_TIMEOUT_SECS: u64 = 120;

/// Denormalization style used when none is requested.
pub const DENORMALIZE_STYLE: &str = "default";

/// Prefix for display labels assigned in order of first appearance.
pub const SPEAKER_LABEL_PREFIX: &str = "Speaker";

/// Default tracing filter for the binary.
pub const LOG_FILTER: &str = "diarscribe=info";
