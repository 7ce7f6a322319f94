use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::augment::{KeywordAugmenter, NoopAugmenter};
use super::expander::expand;
use super::keywords;
use super::seeds::select_seeds;
use crate::config::{RetrievalOptions, DEFAULT_AUGMENT_TIMEOUT};
use crate::error::{AugmentError, RetrievalError};
use crate::graph::context::{assemble, GraphContext};
use crate::graph::store::GraphStore;

/// Retrieves the schema subgraph relevant to a natural-language question.
///
/// Holds no per-request state, so one instance can serve concurrent
/// retrievals; the store is the only shared resource.
#[derive(Clone)]
pub struct SchemaRetriever {
    store: Arc<dyn GraphStore>,
    augmenter: Arc<dyn KeywordAugmenter>,
    augment_timeout: Duration,
}

impl std::fmt::Debug for SchemaRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRetriever")
            .field("augment_timeout", &self.augment_timeout)
            .finish_non_exhaustive()
    }
}

impl SchemaRetriever {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            augmenter: Arc::new(NoopAugmenter),
            augment_timeout: DEFAULT_AUGMENT_TIMEOUT,
        }
    }

    pub fn with_augmenter(mut self, augmenter: Arc<dyn KeywordAugmenter>) -> Self {
        self.augmenter = augmenter;
        self
    }

    pub fn with_augment_timeout(mut self, timeout: Duration) -> Self {
        self.augment_timeout = timeout;
        self
    }

    /// Local tokens merged with whatever the augmenter supplies.
    ///
    /// Augmentation is best effort: errors and timeouts are logged and the
    /// local tokens are used alone.
    pub async fn tokens_for(&self, question: &str, deadline: Option<Instant>) -> BTreeSet<String> {
        let local = keywords::extract(question);

        let mut budget = Instant::now() + self.augment_timeout;
        if let Some(deadline) = deadline {
            budget = budget.min(deadline);
        }

        let external = match tokio::time::timeout_at(budget, self.augmenter.augment(question)).await
        {
            Ok(Ok(tokens)) => tokens,
            Ok(Err(e)) => {
                warn!("Keyword augmentation failed, using local tokens only: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Keyword augmentation failed, using local tokens only: {}",
                    AugmentError::Timeout
                );
                Vec::new()
            }
        };

        let tokens = keywords::merge(local, external);
        debug!("Search tokens: {:?}", tokens);
        tokens
    }

    /// Retrieve the subgraph for `question`.
    ///
    /// Seed-stage failures are returned as errors. A failure or timeout
    /// during expansion yields the hops completed so far, with
    /// `GraphContext::partial` describing what cut it short.
    pub async fn retrieve_subgraph(
        &self,
        question: &str,
        options: &RetrievalOptions,
    ) -> Result<GraphContext, RetrievalError> {
        if options.top_k == 0 {
            return Err(RetrievalError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }

        let deadline = options.timeout.map(|t| Instant::now() + t);
        let tokens = self.tokens_for(question, deadline).await;
        self.retrieve_with_tokens(&tokens, options, deadline).await
    }

    /// Retrieve from an already computed token set
    pub async fn retrieve_with_tokens(
        &self,
        tokens: &BTreeSet<String>,
        options: &RetrievalOptions,
        deadline: Option<Instant>,
    ) -> Result<GraphContext, RetrievalError> {
        let seeds = select_seeds(self.store.as_ref(), tokens, options.top_k, deadline).await?;
        info!("Selected {} seed nodes", seeds.len());

        if seeds.is_empty() {
            return Ok(GraphContext::empty());
        }

        let expansion = expand(self.store.as_ref(), seeds, options.max_hops, deadline).await;
        let context = assemble(expansion.nodes, expansion.edges).with_partial(expansion.interrupted);

        info!(
            "Retrieved {} nodes and {} edges after {} hops{}",
            context.nodes().len(),
            context.edges().len(),
            expansion.hops_completed,
            if context.partial().is_some() { " (partial)" } else { "" }
        );
        Ok(context)
    }
}
