//! diarscribe - speaker-attributed transcription
//!
//! Reconciles a transcript, forced-alignment word timestamps and diarization
//! turns into ordered, speaker-labeled transcript segments.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod stt;

// Collaborator traits
pub use stt::aligner::Aligner;
pub use stt::diarizer::Diarizer;
pub use stt::text::{Denormalizer, Punctuator};
pub use stt::transcriber::Transcriber;

// Pipeline
pub use pipeline::orchestrator::{Collaborators, Pipeline};
pub use pipeline::types::{PipelineRequest, PipelineResult, TranscriptSegment, Word};

// Error handling
pub use error::{DiarscribeError, Result};

// Config
pub use config::{Config, PipelineConfig, Strategy};

// Observability seam
pub use pipeline::error::{ErrorReporter, SegmentFailure};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
