use async_trait::async_trait;

use super::edge::{EdgeLabel, GraphEdge};
use super::node::{GraphNode, NodeId, NodeLabel};
use crate::error::StoreError;

/// One page of a paged node query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    /// Opaque token from the previous page, `None` for the first page
    pub continuation: Option<String>,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self {
            limit,
            continuation: None,
        }
    }

    pub fn next(limit: usize, continuation: String) -> Self {
        Self {
            limit,
            continuation: Some(continuation),
        }
    }
}

/// Result page; a missing continuation means the query is exhausted
#[derive(Debug, Clone, Default)]
pub struct NodePage {
    pub nodes: Vec<GraphNode>,
    pub continuation: Option<String>,
}

/// Read-only query interface over the schema graph.
///
/// Implementations must tolerate concurrent calls from independent
/// retrievals without external locking.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Nodes whose label is in `labels` and whose name contains any token
    async fn query_nodes_by_name_contains_any(
        &self,
        tokens: &[String],
        labels: &[NodeLabel],
        page: PageRequest,
    ) -> Result<NodePage, StoreError>;

    /// Nodes whose label is in `labels`
    async fn query_all_by_label(
        &self,
        labels: &[NodeLabel],
        page: PageRequest,
    ) -> Result<NodePage, StoreError>;

    async fn query_nodes_by_id_in(&self, ids: &[NodeId]) -> Result<Vec<GraphNode>, StoreError>;

    /// Edges with a label in `labels` whose source or target is in `ids`
    async fn query_edges_by_endpoint_in(
        &self,
        ids: &[NodeId],
        labels: &[EdgeLabel],
    ) -> Result<Vec<GraphEdge>, StoreError>;
}
