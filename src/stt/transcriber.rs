use crate::error::{DiarscribeError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (model-backed, external
/// process, mock).
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio to text.
    ///
    /// # Arguments
    /// * `wav` - Complete WAV file contents (16kHz mono, 16-bit PCM)
    ///
    /// # Returns
    /// Transcribed text, possibly blank, or an error for unreadable audio
    async fn transcribe(&self, wav: &[u8]) -> Result<String>;

    /// Get the name of the backing model or program
    fn model_name(&self) -> &str;
}

/// Implement Transcriber for Arc<T> to allow sharing across workers.
#[async_trait]
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        (**self).transcribe(wav).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

type TranscribeHandler = Arc<dyn Fn(&[u8]) -> Result<String> + Send + Sync>;

/// Mock transcriber for testing
#[derive(Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    delay: Option<Duration>,
    handler: Option<TranscribeHandler>,
    calls: Arc<AtomicUsize>,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            delay: None,
            handler: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Sleep before answering, to simulate a slow model
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Compute the answer from the audio itself; overrides response/failure.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[u8]) -> Result<String> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Number of transcribe calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTranscriber")
            .field("model_name", &self.model_name)
            .field("response", &self.response)
            .field("should_fail", &self.should_fail)
            .field("delay", &self.delay)
            .finish()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(handler) = &self.handler {
            return handler(wav);
        }

        if self.should_fail {
            Err(DiarscribeError::Transcription {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
