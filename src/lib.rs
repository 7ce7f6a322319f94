// Expose modules as public for use by other crates
pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod prompt;
pub mod retrieval;
pub mod seed;
#[cfg(feature = "http")]
pub mod server;
pub mod sql_executor;

// Re-export core types for convenience
pub use config::{AppConfig, RetrievalOptions};
pub use error::{ErrorKind, RetrievalError, StoreError};
pub use graph::{GraphContext, GraphEdge, GraphNode, GraphStore};
pub use prompt::{render_relationships, render_schema};
pub use retrieval::SchemaRetriever;
