//! Text post-processing collaborators: punctuation and denormalization.
//!
//! Both run per output segment after speaker attribution, so a failure here
//! can only ever cost formatting, never words or speakers.

use crate::error::{DiarscribeError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Restores punctuation and casing in unpunctuated transcript text.
#[async_trait]
pub trait Punctuator: Send + Sync {
    async fn punctuate(&self, text: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// Rewrites spoken forms ("twenty one") into written ones ("21").
#[async_trait]
pub trait Denormalizer: Send + Sync {
    async fn denormalize(&self, text: &str, style: &str) -> Result<String>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Punctuator + ?Sized> Punctuator for Arc<T> {
    async fn punctuate(&self, text: &str) -> Result<String> {
        (**self).punctuate(text).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: Denormalizer + ?Sized> Denormalizer for Arc<T> {
    async fn denormalize(&self, text: &str, style: &str) -> Result<String> {
        (**self).denormalize(text, style).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Mock punctuator: capitalises the first letter and closes with a period.
#[derive(Debug, Clone, Default)]
pub struct MockPunctuator {
    should_fail: bool,
}

impl MockPunctuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[async_trait]
impl Punctuator for MockPunctuator {
    async fn punctuate(&self, text: &str) -> Result<String> {
        if self.should_fail {
            return Err(DiarscribeError::PostProcess {
                message: "mock punctuation failure".to_string(),
            });
        }

        let trimmed = text.trim();
        let mut chars = trimmed.chars();
        let mut out: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => return Ok(String::new()),
        };
        if !out.ends_with(['.', '?', '!']) {
            out.push('.');
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "mock-punctuator"
    }
}

/// Mock denormalizer: whole-word replacements from a fixed table.
///
/// The style is recorded in the output only when it is not "default", which
/// lets tests see that it was forwarded.
#[derive(Debug, Clone, Default)]
pub struct MockDenormalizer {
    replacements: HashMap<String, String>,
    should_fail: bool,
}

impl MockDenormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replacement(mut self, spoken: &str, written: &str) -> Self {
        self.replacements
            .insert(spoken.to_lowercase(), written.to_string());
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[async_trait]
impl Denormalizer for MockDenormalizer {
    async fn denormalize(&self, text: &str, style: &str) -> Result<String> {
        if self.should_fail {
            return Err(DiarscribeError::PostProcess {
                message: "mock denormalization failure".to_string(),
            });
        }

        let rewritten = text
            .split_whitespace()
            .map(|w| {
                self.replacements
                    .get(&w.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| w.to_string())
            })
            .collect::<Vec<_>>()
            .join(" ");

        if style == crate::defaults::DENORMALIZE_STYLE {
            Ok(rewritten)
        } else {
            Ok(format!("{} [{}]", rewritten, style))
        }
    }

    fn name(&self) -> &str {
        "mock-denormalizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_punctuator_capitalises_and_closes() {
        let p = MockPunctuator::new();
        assert_eq!(p.punctuate("hello there").await.unwrap(), "Hello there.");
        assert_eq!(p.punctuate("really?").await.unwrap(), "Really?");
        assert_eq!(p.punctuate("   ").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_mock_denormalizer_replaces_whole_words() {
        let d = MockDenormalizer::new()
            .with_replacement("two", "2")
            .with_replacement("percent", "%");
        assert_eq!(
            d.denormalize("Two percent of two", "default").await.unwrap(),
            "2 % of 2"
        );
        assert_eq!(
            d.denormalize("two", "spoken").await.unwrap(),
            "2 [spoken]"
        );
    }

    #[tokio::test]
    async fn test_failures_are_post_process_errors() {
        let p: Arc<dyn Punctuator> = Arc::new(MockPunctuator::new().with_failure());
        assert!(matches!(
            p.punctuate("x").await,
            Err(DiarscribeError::PostProcess { .. })
        ));

        let d: Arc<dyn Denormalizer> = Arc::new(MockDenormalizer::new().with_failure());
        assert!(matches!(
            d.denormalize("x", "default").await,
            Err(DiarscribeError::PostProcess { .. })
        ));
    }
}
