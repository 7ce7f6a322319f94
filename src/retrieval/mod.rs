pub mod augment;
pub mod engine;
pub mod expander;
pub mod keywords;
pub mod seeds;

pub use augment::{KeywordAugmenter, NoopAugmenter, StaticAugmenter};
pub use engine::SchemaRetriever;
pub use expander::{expand, Expansion};
pub use seeds::select_seeds;

use std::future::Future;
use tokio::time::Instant;

use crate::error::{RetrievalError, StoreError};

/// Await a store call, bounded by `deadline` when one is set
pub(crate) async fn within_deadline<T, F>(
    deadline: Option<Instant>,
    stage: &'static str,
    call: F,
) -> Result<T, RetrievalError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, call)
            .await
            .map_err(|_| RetrievalError::Timeout { stage })?
            .map_err(RetrievalError::from),
        None => call.await.map_err(RetrievalError::from),
    }
}
