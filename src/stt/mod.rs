//! External collaborators: transcription, alignment, diarization and text
//! post-processing.
//!
//! Every collaborator is a trait so the pipeline can run against models,
//! external programs or mocks without changing.

pub mod aligner;
pub mod command;
pub mod diarizer;
pub mod text;
pub mod transcriber;

use crate::error::{DiarscribeError, Result};
use std::future::Future;
use std::time::Duration;

/// Bound a collaborator call by `timeout`.
///
/// An elapsed timer drops the call's future (killing any child process it
/// spawned) and yields [`DiarscribeError::CollaboratorTimeout`].
pub(crate) async fn with_timeout<T, F>(
    collaborator: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(DiarscribeError::CollaboratorTimeout {
            collaborator,
            seconds: timeout.as_secs(),
        }),
    }
}
