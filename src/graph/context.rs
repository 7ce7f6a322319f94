use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use super::edge::GraphEdge;
use super::node::GraphNode;
use crate::error::ErrorKind;

/// Marks a context whose expansion stopped early on a store failure or deadline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartialExpansion {
    /// Zero-based hop that failed; every earlier hop completed
    pub hop: usize,
    pub kind: ErrorKind,
    pub reason: String,
}

/// The subgraph returned by one retrieval call
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphContext {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    partial: Option<PartialExpansion>,
}

impl GraphContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Set when expansion was interrupted and the subgraph is best-effort
    pub fn partial(&self) -> Option<&PartialExpansion> {
        self.partial.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn with_partial(mut self, partial: Option<PartialExpansion>) -> Self {
        self.partial = partial;
        self
    }

    /// Distinct qualified table names, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.is_table())
            .map(|n| n.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Deduplicate nodes and edges by id, keeping the first occurrence of each
pub fn assemble(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> GraphContext {
    let mut seen_nodes = HashSet::new();
    let nodes: Vec<GraphNode> = nodes
        .into_iter()
        .filter(|n| seen_nodes.insert(n.id.clone()))
        .collect();

    let mut seen_edges = HashSet::new();
    let edges: Vec<GraphEdge> = edges
        .into_iter()
        .filter(|e| seen_edges.insert(e.id.clone()))
        .collect();

    GraphContext {
        nodes,
        edges,
        partial: None,
    }
}
