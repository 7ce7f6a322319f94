pub mod context;
pub mod edge;
pub mod memory;
pub mod node;
pub mod store;

// Re-export the graph model for convenience
pub use context::{assemble, GraphContext, PartialExpansion};
pub use edge::{EdgeId, EdgeLabel, GraphEdge};
pub use memory::InMemoryGraphStore;
pub use node::{GraphNode, NodeId, NodeKind, NodeLabel};
pub use store::{GraphStore, NodePage, PageRequest};
