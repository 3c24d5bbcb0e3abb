//! Error types for diarscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiarscribeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Input errors
    #[error("Unreadable audio input: {message}")]
    FatalInput { message: String },

    #[error("Transcription returned no text")]
    EmptyTranscription,

    // Collaborator errors
    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    #[error("Alignment failed: {message}")]
    Alignment { message: String },

    #[error("Diarization failed: {message}")]
    Diarization { message: String },

    #[error("Post-processing failed: {message}")]
    PostProcess { message: String },

    #[error("{collaborator} call timed out after {seconds}s")]
    CollaboratorTimeout {
        collaborator: &'static str,
        seconds: u64,
    },

    #[error("Collaborator program not found: {program}")]
    CollaboratorNotFound { program: String },

    // Job-level outcomes
    #[error("All {count} segments failed to process")]
    AllSegmentsFailed { count: usize },

    #[error("Pipeline run was cancelled")]
    Cancelled,

    // Wrapped library errors
    #[error("Invalid WAV data: {0}")]
    Wav(#[from] hound::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl DiarscribeError {
    /// Whether this error aborts a whole pipeline run.
    ///
    /// Collaborator errors are recoverable inside segment-first runs; the
    /// orchestrator decides their fate per strategy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DiarscribeError::FatalInput { .. }
                | DiarscribeError::EmptyTranscription
                | DiarscribeError::AllSegmentsFailed { .. }
                | DiarscribeError::Cancelled
                | DiarscribeError::ConfigFileNotFound { .. }
                | DiarscribeError::ConfigInvalidValue { .. }
                | DiarscribeError::Config(_)
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DiarscribeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_invalid_value_display() {
        let error = DiarscribeError::ConfigInvalidValue {
            key: "worker_concurrency".to_string(),
            message: "must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for worker_concurrency: must be at least 1"
        );
    }

    #[test]
    fn test_fatal_input_display() {
        let error = DiarscribeError::FatalInput {
            message: "no samples".to_string(),
        };
        assert_eq!(error.to_string(), "Unreadable audio input: no samples");
    }

    #[test]
    fn test_empty_transcription_display() {
        assert_eq!(
            DiarscribeError::EmptyTranscription.to_string(),
            "Transcription returned no text"
        );
    }

    #[test]
    fn test_timeout_display() {
        let error = DiarscribeError::CollaboratorTimeout {
            collaborator: "alignment",
            seconds: 30,
        };
        assert_eq!(error.to_string(), "alignment call timed out after 30s");
    }

    #[test]
    fn test_all_segments_failed_display() {
        let error = DiarscribeError::AllSegmentsFailed { count: 8 };
        assert_eq!(error.to_string(), "All 8 segments failed to process");
    }

    #[test]
    fn test_collaborator_errors_are_not_fatal() {
        assert!(
            !DiarscribeError::Transcription {
                message: "boom".to_string()
            }
            .is_fatal()
        );
        assert!(
            !DiarscribeError::CollaboratorTimeout {
                collaborator: "transcription",
                seconds: 1
            }
            .is_fatal()
        );
        assert!(
            !DiarscribeError::Diarization {
                message: "boom".to_string()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_job_level_errors_are_fatal() {
        assert!(DiarscribeError::Cancelled.is_fatal());
        assert!(DiarscribeError::EmptyTranscription.is_fatal());
        assert!(DiarscribeError::AllSegmentsFailed { count: 2 }.is_fatal());
        assert!(
            DiarscribeError::FatalInput {
                message: "bad".to_string()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: DiarscribeError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: DiarscribeError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: DiarscribeError = json_error.into();
        assert!(error.to_string().starts_with("Invalid JSON"));
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: DiarscribeError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<DiarscribeError>();
        assert_sync::<DiarscribeError>();
    }
}
