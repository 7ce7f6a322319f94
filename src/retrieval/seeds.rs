use std::collections::{BTreeSet, HashSet};
use tokio::time::Instant;
use tracing::debug;

use super::within_deadline;
use crate::error::RetrievalError;
use crate::graph::node::{GraphNode, NodeLabel};
use crate::graph::store::{GraphStore, PageRequest};

/// Select up to `top_k` seed nodes whose names contain any of `tokens`.
///
/// With no tokens every table and column is a candidate. Pages are read
/// until the store reports exhaustion or `top_k` nodes have accumulated.
/// Store failures propagate: an empty seed set must mean "nothing matched",
/// never "the store was down".
pub async fn select_seeds(
    store: &dyn GraphStore,
    tokens: &BTreeSet<String>,
    top_k: usize,
    deadline: Option<Instant>,
) -> Result<Vec<GraphNode>, RetrievalError> {
    if top_k == 0 {
        return Err(RetrievalError::InvalidArgument(
            "top_k must be at least 1".to_string(),
        ));
    }

    let tokens: Vec<String> = tokens.iter().cloned().collect();
    if tokens.is_empty() {
        debug!("No keywords, falling back to sampling all schema nodes");
    } else {
        debug!("Selecting seeds for tokens {:?}", tokens);
    }

    let mut seeds: Vec<GraphNode> = Vec::new();
    let mut seen = HashSet::new();
    let mut page = PageRequest::first(top_k);

    loop {
        let result = if tokens.is_empty() {
            within_deadline(
                deadline,
                "seed selection",
                store.query_all_by_label(&NodeLabel::SCHEMA, page),
            )
            .await?
        } else {
            within_deadline(
                deadline,
                "seed selection",
                store.query_nodes_by_name_contains_any(&tokens, &NodeLabel::SCHEMA, page),
            )
            .await?
        };

        seeds.extend(
            result
                .nodes
                .into_iter()
                .filter(|n| seen.insert(n.id.clone())),
        );

        if seeds.len() >= top_k {
            break;
        }
        match result.continuation {
            Some(continuation) => page = PageRequest::next(top_k - seeds.len(), continuation),
            None => break,
        }
    }

    seeds.truncate(top_k);
    Ok(seeds)
}
