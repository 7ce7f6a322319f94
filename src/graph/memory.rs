use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::edge::{EdgeLabel, GraphEdge};
use super::node::{GraphNode, NodeId, NodeLabel};
use super::store::{GraphStore, NodePage, PageRequest};
use crate::error::StoreError;

/// Number of calls made to each store query
#[derive(Debug, Default)]
pub struct QueryCounters {
    name_contains: AtomicUsize,
    all_by_label: AtomicUsize,
    id_in: AtomicUsize,
    edges_by_endpoint: AtomicUsize,
}

impl QueryCounters {
    pub fn name_contains(&self) -> usize {
        self.name_contains.load(Ordering::SeqCst)
    }

    pub fn all_by_label(&self) -> usize {
        self.all_by_label.load(Ordering::SeqCst)
    }

    pub fn id_in(&self) -> usize {
        self.id_in.load(Ordering::SeqCst)
    }

    pub fn edges_by_endpoint(&self) -> usize {
        self.edges_by_endpoint.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.name_contains() + self.all_by_label() + self.id_in() + self.edges_by_endpoint()
    }
}

/// Graph store held entirely in memory.
///
/// Used by tests and benchmarks; supports a forced page size, artificial
/// latency, and failing a chosen call of a given query.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    page_size: Option<usize>,
    delay: Option<Duration>,
    fail_seed_queries: bool,
    fail_edge_query_at: Option<usize>,
    fail_node_query_at: Option<usize>,
    counters: QueryCounters,
}

impl InMemoryGraphStore {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self {
            nodes,
            edges,
            ..Default::default()
        }
    }

    /// Cap every page at `size` nodes regardless of the requested limit
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    /// Sleep before answering each query
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make seed-stage queries report the store as unavailable
    pub fn failing_seed_queries(mut self) -> Self {
        self.fail_seed_queries = true;
        self
    }

    /// Fail the `n`-th (1-based) edge query
    pub fn failing_edge_query_at(mut self, n: usize) -> Self {
        self.fail_edge_query_at = Some(n);
        self
    }

    /// Fail the `n`-th (1-based) node-by-id query
    pub fn failing_node_query_at(mut self, n: usize) -> Self {
        self.fail_node_query_at = Some(n);
        self
    }

    pub fn counters(&self) -> &QueryCounters {
        &self.counters
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn paginate<'a>(
        &self,
        matches: impl Iterator<Item = &'a GraphNode>,
        page: &PageRequest,
    ) -> Result<NodePage, StoreError> {
        let offset = match &page.continuation {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::Query(format!("invalid continuation '{}'", token)))?,
            None => 0,
        };
        let limit = match self.page_size {
            Some(size) => size.min(page.limit),
            None => page.limit,
        };

        let mut rest = matches.skip(offset);
        let nodes: Vec<GraphNode> = rest.by_ref().take(limit).cloned().collect();
        let continuation = if rest.next().is_some() {
            Some((offset + nodes.len()).to_string())
        } else {
            None
        };

        Ok(NodePage {
            nodes,
            continuation,
        })
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn query_nodes_by_name_contains_any(
        &self,
        tokens: &[String],
        labels: &[NodeLabel],
        page: PageRequest,
    ) -> Result<NodePage, StoreError> {
        self.counters.name_contains.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_seed_queries {
            return Err(StoreError::Unavailable("injected seed failure".into()));
        }

        let matches = self.nodes.iter().filter(|n| {
            let name = n.name.to_lowercase();
            labels.contains(&n.label()) && tokens.iter().any(|t| name.contains(t.as_str()))
        });
        self.paginate(matches, &page)
    }

    async fn query_all_by_label(
        &self,
        labels: &[NodeLabel],
        page: PageRequest,
    ) -> Result<NodePage, StoreError> {
        self.counters.all_by_label.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_seed_queries {
            return Err(StoreError::Unavailable("injected seed failure".into()));
        }

        let matches = self.nodes.iter().filter(|n| labels.contains(&n.label()));
        self.paginate(matches, &page)
    }

    async fn query_nodes_by_id_in(&self, ids: &[NodeId]) -> Result<Vec<GraphNode>, StoreError> {
        let call = self.counters.id_in.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_latency().await;
        if self.fail_node_query_at == Some(call) {
            return Err(StoreError::Unavailable(format!(
                "injected failure on node query {}",
                call
            )));
        }

        let wanted: HashSet<&NodeId> = ids.iter().collect();
        Ok(self
            .nodes
            .iter()
            .filter(|n| wanted.contains(&n.id))
            .cloned()
            .collect())
    }

    async fn query_edges_by_endpoint_in(
        &self,
        ids: &[NodeId],
        labels: &[EdgeLabel],
    ) -> Result<Vec<GraphEdge>, StoreError> {
        let call = self.counters.edges_by_endpoint.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_latency().await;
        if self.fail_edge_query_at == Some(call) {
            return Err(StoreError::Unavailable(format!(
                "injected failure on edge query {}",
                call
            )));
        }

        let wanted: HashSet<&NodeId> = ids.iter().collect();
        Ok(self
            .edges
            .iter()
            .filter(|e| {
                labels.contains(&e.label) && (wanted.contains(&e.from) || wanted.contains(&e.to))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_nodes() -> Vec<GraphNode> {
        (0..5)
            .map(|i| {
                GraphNode::table(
                    NodeId::table(&format!("orders_{}", i)),
                    format!("shop.orders_{}", i),
                    "p",
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_paging_reports_exhaustion() {
        let store = InMemoryGraphStore::new(sample_nodes(), vec![]).with_page_size(2);
        let tokens = vec!["orders".to_string()];

        let first = store
            .query_nodes_by_name_contains_any(&tokens, &NodeLabel::SCHEMA, PageRequest::first(10))
            .await
            .unwrap();
        assert_eq!(first.nodes.len(), 2);
        let token = first.continuation.clone().unwrap();

        let second = store
            .query_nodes_by_name_contains_any(
                &tokens,
                &NodeLabel::SCHEMA,
                PageRequest::next(10, token),
            )
            .await
            .unwrap();
        assert_eq!(second.nodes[0].name, "shop.orders_2");

        let last = store
            .query_nodes_by_name_contains_any(
                &tokens,
                &NodeLabel::SCHEMA,
                PageRequest::next(10, "4".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(last.nodes.len(), 1);
        assert!(last.continuation.is_none());
        assert_eq!(store.counters().name_contains(), 3);
    }

    #[tokio::test]
    async fn test_injected_edge_failure() {
        let store = InMemoryGraphStore::new(sample_nodes(), vec![]).failing_edge_query_at(2);
        let ids = vec![NodeId::table("orders_0")];

        assert!(store
            .query_edges_by_endpoint_in(&ids, &EdgeLabel::SCHEMA)
            .await
            .is_ok());
        let err = store
            .query_edges_by_endpoint_in(&ids, &EdgeLabel::SCHEMA)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_bad_continuation_is_query_error() {
        let store = InMemoryGraphStore::new(sample_nodes(), vec![]);
        let err = store
            .query_all_by_label(&NodeLabel::SCHEMA, PageRequest::next(3, "x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }
}
