//! Per-segment failure records and their reporting.
//!
//! A segment failure never aborts a segment-first run; it is turned into a
//! degraded result and handed to an [`ErrorReporter`].

use crate::error::DiarscribeError;
use std::fmt;

/// Which step of per-segment processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStage {
    Extraction,
    Transcription,
    Alignment,
}

impl SegmentStage {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentStage::Extraction => "extraction",
            SegmentStage::Transcription => "transcription",
            SegmentStage::Alignment => "alignment",
        }
    }
}

/// A recovered failure of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFailure {
    pub index: usize,
    pub stage: SegmentStage,
    pub message: String,
    pub timed_out: bool,
}

impl SegmentFailure {
    pub fn new(index: usize, stage: SegmentStage, error: &DiarscribeError) -> Self {
        Self {
            index,
            stage,
            message: error.to_string(),
            timed_out: matches!(error, DiarscribeError::CollaboratorTimeout { .. }),
        }
    }
}

impl fmt::Display for SegmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "segment {} {} failed: {}",
            self.index,
            self.stage.as_str(),
            self.message
        )
    }
}

impl std::error::Error for SegmentFailure {}

/// Trait for reporting recovered segment failures.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, failure: &SegmentFailure);
}

/// Reporter that logs through `tracing` at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, failure: &SegmentFailure) {
        tracing::warn!(
            segment = failure.index,
            stage = failure.stage.as_str(),
            timed_out = failure.timed_out,
            "{}",
            failure.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_failure_display() {
        let failure = SegmentFailure::new(
            3,
            SegmentStage::Transcription,
            &DiarscribeError::Transcription {
                message: "model crashed".to_string(),
            },
        );
        assert_eq!(
            failure.to_string(),
            "segment 3 transcription failed: Transcription failed: model crashed"
        );
        assert!(!failure.timed_out);
    }

    #[test]
    fn test_timeout_is_flagged() {
        let failure = SegmentFailure::new(
            0,
            SegmentStage::Alignment,
            &DiarscribeError::CollaboratorTimeout {
                collaborator: "alignment",
                seconds: 5,
            },
        );
        assert!(failure.timed_out);
        assert_eq!(failure.stage.as_str(), "alignment");
    }

    #[test]
    fn test_tracing_reporter() {
        let failure = SegmentFailure::new(
            1,
            SegmentStage::Extraction,
            &DiarscribeError::Other("bad window".to_string()),
        );
        // Just ensure it doesn't panic without a subscriber
        TracingReporter.report(&failure);
    }
}
