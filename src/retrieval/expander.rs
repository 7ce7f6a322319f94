use std::collections::HashSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::within_deadline;
use crate::error::RetrievalError;
use crate::graph::context::PartialExpansion;
use crate::graph::edge::{EdgeLabel, GraphEdge};
use crate::graph::node::{GraphNode, NodeId};
use crate::graph::store::GraphStore;

/// Nodes and edges collected by breadth-first expansion from the seeds
#[derive(Debug, Default)]
pub struct Expansion {
    /// Seeds first, then neighbors in hop order; may contain duplicates
    pub nodes: Vec<GraphNode>,
    /// May contain duplicates across hops
    pub edges: Vec<GraphEdge>,
    pub hops_completed: usize,
    pub visited: usize,
    /// Set when a hop failed or the deadline passed
    pub interrupted: Option<PartialExpansion>,
}

/// Expand `seeds` by up to `max_hops` rounds over `has_column` and `fk` edges.
///
/// Each hop issues one edge query over the whole visited set and at most one
/// node query for the newly reached ids, so store round-trips grow with the
/// hop count rather than the node count. Expansion stops early once a hop
/// reaches no unvisited node.
///
/// A failed or timed-out hop is dropped as a whole; everything from earlier
/// hops is kept and the failure is reported in `interrupted`.
pub async fn expand(
    store: &dyn GraphStore,
    seeds: Vec<GraphNode>,
    max_hops: usize,
    deadline: Option<Instant>,
) -> Expansion {
    let mut visited: HashSet<NodeId> = seeds.iter().map(|n| n.id.clone()).collect();
    let mut expansion = Expansion {
        nodes: seeds,
        ..Default::default()
    };

    for hop in 0..max_hops {
        if visited.is_empty() {
            debug!("No seeds to expand from");
            break;
        }
        if deadline.map_or(false, |d| Instant::now() >= d) {
            expansion.interrupted = Some(interruption(
                hop,
                &RetrievalError::Timeout {
                    stage: "neighbor expansion",
                },
            ));
            break;
        }

        let mut frontier: Vec<NodeId> = visited.iter().cloned().collect();
        frontier.sort();

        let fetched = match within_deadline(
            deadline,
            "neighbor expansion",
            store.query_edges_by_endpoint_in(&frontier, &EdgeLabel::SCHEMA),
        )
        .await
        {
            Ok(edges) => edges,
            Err(e) => {
                expansion.interrupted = Some(interruption(hop, &e));
                break;
            }
        };

        let mut seen = HashSet::new();
        let neighbor_ids: Vec<NodeId> = fetched
            .iter()
            .flat_map(|e| [&e.from, &e.to])
            .filter(|id| !visited.contains(*id) && seen.insert(*id))
            .cloned()
            .collect();

        debug!(
            "Hop {}: {} edges, {} new neighbors",
            hop + 1,
            fetched.len(),
            neighbor_ids.len()
        );

        if neighbor_ids.is_empty() {
            expansion.edges.extend(fetched);
            expansion.hops_completed += 1;
            debug!("Frontier stabilized after {} hops", hop + 1);
            break;
        }

        let neighbors = match within_deadline(
            deadline,
            "neighbor expansion",
            store.query_nodes_by_id_in(&neighbor_ids),
        )
        .await
        {
            Ok(nodes) => nodes,
            Err(e) => {
                expansion.interrupted = Some(interruption(hop, &e));
                break;
            }
        };

        expansion.edges.extend(fetched);
        expansion.nodes.extend(neighbors);
        visited.extend(neighbor_ids);
        expansion.hops_completed += 1;
    }

    expansion.visited = visited.len();
    expansion
}

fn interruption(hop: usize, error: &RetrievalError) -> PartialExpansion {
    warn!(
        "Expansion interrupted at hop {}, keeping earlier hops: {}",
        hop + 1,
        error
    );
    PartialExpansion {
        hop,
        kind: error.kind(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::graph::edge::EdgeId;
    use crate::graph::memory::InMemoryGraphStore;
    use std::time::Duration;

    /// A chain t:a -> c:a:x -fk-> c:b:x <- t:b, plus an isolated table
    fn chain_store() -> InMemoryGraphStore {
        let nodes = vec![
            GraphNode::table(NodeId::table("a"), "s.a", "p"),
            GraphNode::column(NodeId::column("a", "x"), "x", "s.a", "p"),
            GraphNode::column(NodeId::column("b", "x"), "x", "s.b", "p"),
            GraphNode::table(NodeId::table("b"), "s.b", "p"),
            GraphNode::table(NodeId::table("lonely"), "s.lonely", "p"),
        ];
        let edges = vec![
            GraphEdge::new(
                EdgeId::has_column("s.a", "x"),
                EdgeLabel::HasColumn,
                NodeId::table("a"),
                NodeId::column("a", "x"),
                "p",
            ),
            GraphEdge::new(
                EdgeId::fk("a", "x", "b", "x"),
                EdgeLabel::Fk,
                NodeId::column("a", "x"),
                NodeId::column("b", "x"),
                "p",
            ),
            GraphEdge::new(
                EdgeId::has_column("s.b", "x"),
                EdgeLabel::HasColumn,
                NodeId::table("b"),
                NodeId::column("b", "x"),
                "p",
            ),
        ];
        InMemoryGraphStore::new(nodes, edges)
    }

    fn seed(id: &str, name: &str) -> GraphNode {
        GraphNode::table(NodeId::new(id), name, "p")
    }

    fn ids(nodes: &[GraphNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_zero_hops_returns_seeds_only() {
        let store = chain_store();

        let expansion = expand(&store, vec![seed("t:a", "s.a")], 0, None).await;

        assert_eq!(ids(&expansion.nodes), vec!["t:a"]);
        assert!(expansion.edges.is_empty());
        assert_eq!(store.counters().total(), 0);
    }

    #[tokio::test]
    async fn test_empty_seeds_issue_no_queries() {
        let store = chain_store();

        let expansion = expand(&store, vec![], 3, None).await;

        assert!(expansion.nodes.is_empty());
        assert_eq!(store.counters().total(), 0);
    }

    #[tokio::test]
    async fn test_hops_walk_the_chain() {
        let store = chain_store();

        let one = expand(&store, vec![seed("t:a", "s.a")], 1, None).await;
        assert_eq!(ids(&one.nodes), vec!["t:a", "c:a:x"]);
        assert_eq!(one.edges.len(), 1);

        let three = expand(&store, vec![seed("t:a", "s.a")], 3, None).await;
        assert_eq!(ids(&three.nodes), vec!["t:a", "c:a:x", "c:b:x", "t:b"]);
        assert_eq!(three.hops_completed, 3);
        assert_eq!(three.visited, 4);
        assert!(three.interrupted.is_none());
    }

    #[tokio::test]
    async fn test_visited_set_never_shrinks() {
        let mut previous = 0;
        for hops in 0..6 {
            let store = chain_store();
            let expansion = expand(&store, vec![seed("t:a", "s.a")], hops, None).await;
            assert!(expansion.visited >= previous);
            assert!(expansion.hops_completed <= hops);
            previous = expansion.visited;
        }
    }

    #[tokio::test]
    async fn test_stops_when_frontier_stabilizes() {
        let store = chain_store();

        // Hops 1-3 reach every node, hop 4 finds nothing new
        let expansion = expand(&store, vec![seed("t:a", "s.a")], 10, None).await;

        assert_eq!(expansion.hops_completed, 4);
        assert_eq!(store.counters().edges_by_endpoint(), 4);
        assert_eq!(store.counters().id_in(), 3);
    }

    #[tokio::test]
    async fn test_isolated_seed_stops_after_first_hop() {
        let store = chain_store();

        let expansion = expand(&store, vec![seed("t:lonely", "s.lonely")], 5, None).await;

        assert_eq!(ids(&expansion.nodes), vec!["t:lonely"]);
        assert_eq!(store.counters().edges_by_endpoint(), 1);
        assert_eq!(store.counters().id_in(), 0);
    }

    #[tokio::test]
    async fn test_terminates_on_fully_connected_graph() {
        let n = 12;
        let nodes: Vec<GraphNode> = (0..n)
            .map(|i| GraphNode::column(NodeId::new(&format!("c:{}", i)), "c", "s.t", "p"))
            .collect();
        let mut edges = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    edges.push(GraphEdge::new(
                        EdgeId::new(&format!("e:{}:{}", i, j)),
                        EdgeLabel::Fk,
                        NodeId::new(&format!("c:{}", i)),
                        NodeId::new(&format!("c:{}", j)),
                        "p",
                    ));
                }
            }
        }
        let store = InMemoryGraphStore::new(nodes.clone(), edges);

        let expansion = expand(&store, vec![nodes[0].clone()], 50, None).await;

        assert_eq!(expansion.visited, n);
        assert_eq!(expansion.hops_completed, 2);
    }

    #[tokio::test]
    async fn test_edge_failure_keeps_completed_hops() {
        let store = chain_store().failing_edge_query_at(2);

        let expansion = expand(&store, vec![seed("t:a", "s.a")], 3, None).await;

        assert_eq!(ids(&expansion.nodes), vec!["t:a", "c:a:x"]);
        assert_eq!(expansion.edges.len(), 1);
        assert_eq!(expansion.hops_completed, 1);
        let partial = expansion.interrupted.unwrap();
        assert_eq!(partial.hop, 1);
        assert_eq!(partial.kind, ErrorKind::StoreUnavailable);
        // No further hops after the failure
        assert_eq!(store.counters().edges_by_endpoint(), 2);
    }

    #[tokio::test]
    async fn test_node_failure_drops_the_whole_hop() {
        let store = chain_store().failing_node_query_at(2);

        let expansion = expand(&store, vec![seed("t:a", "s.a")], 3, None).await;

        assert_eq!(ids(&expansion.nodes), vec!["t:a", "c:a:x"]);
        // The hop-2 fk edge was fetched but its endpoint never loaded
        assert_eq!(expansion.edges.len(), 1);
        assert_eq!(expansion.interrupted.unwrap().hop, 1);
    }

    #[tokio::test]
    async fn test_expired_deadline_stops_before_next_hop() {
        let store = chain_store();
        let deadline = Instant::now() - Duration::from_millis(1);

        let expansion = expand(&store, vec![seed("t:a", "s.a")], 3, Some(deadline)).await;

        assert_eq!(ids(&expansion.nodes), vec!["t:a"]);
        assert_eq!(expansion.interrupted.unwrap().kind, ErrorKind::Timeout);
        assert_eq!(store.counters().total(), 0);
    }

    #[tokio::test]
    async fn test_slow_store_times_out_mid_expansion() {
        let store = chain_store().with_delay(Duration::from_millis(40));
        let deadline = Instant::now() + Duration::from_millis(100);

        let expansion = expand(&store, vec![seed("t:a", "s.a")], 5, Some(deadline)).await;

        let partial = expansion.interrupted.expect("deadline should interrupt");
        assert_eq!(partial.kind, ErrorKind::Timeout);
        assert!(expansion.hops_completed < 5);
    }
}
