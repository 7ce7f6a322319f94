use async_trait::async_trait;

use crate::error::AugmentError;

/// Supplies extra search tokens for a question, e.g. translated keywords.
///
/// Best effort: callers treat any error as "no extra tokens".
#[async_trait]
pub trait KeywordAugmenter: Send + Sync {
    async fn augment(&self, question: &str) -> Result<Vec<String>, AugmentError>;
}

/// Augmenter that never adds tokens
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAugmenter;

#[async_trait]
impl KeywordAugmenter for NoopAugmenter {
    async fn augment(&self, _question: &str) -> Result<Vec<String>, AugmentError> {
        Ok(Vec::new())
    }
}

/// Augmenter returning a fixed token list, handy for tests and offline runs
#[derive(Debug, Default, Clone)]
pub struct StaticAugmenter {
    tokens: Vec<String>,
}

impl StaticAugmenter {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl KeywordAugmenter for StaticAugmenter {
    async fn augment(&self, _question: &str) -> Result<Vec<String>, AugmentError> {
        Ok(self.tokens.clone())
    }
}
