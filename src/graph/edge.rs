use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::node::NodeId;

/// Unique identifier for an edge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: &str) -> Self {
        EdgeId(id.to_string())
    }

    /// Id of the containment edge from `qualified_table` to one of its columns
    pub fn has_column(qualified_table: &str, column: &str) -> Self {
        EdgeId(format!("e:hascol:{}:{}", qualified_table, column))
    }

    /// Id of a foreign key edge, referencing column first
    pub fn fk(from_table: &str, from_column: &str, to_table: &str, to_column: &str) -> Self {
        EdgeId(format!(
            "e:fk:{}:{}->{}:{}",
            from_table, from_column, to_table, to_column
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Edge label enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EdgeLabel {
    HasColumn, // table -> column
    Fk,        // referencing column -> referenced column
}

impl EdgeLabel {
    /// Labels followed during neighbor expansion
    pub const SCHEMA: [EdgeLabel; 2] = [EdgeLabel::HasColumn, EdgeLabel::Fk];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::HasColumn => "has_column",
            EdgeLabel::Fk => "fk",
        }
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "has_column" => Ok(EdgeLabel::HasColumn),
            "fk" => Ok(EdgeLabel::Fk),
            other => Err(format!("unknown edge label '{}'", other)),
        }
    }
}

/// Directed relation between two schema nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub label: EdgeLabel,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "pk")]
    pub partition_key: String,
}

impl GraphEdge {
    pub fn new(
        id: EdgeId,
        label: EdgeLabel,
        from: NodeId,
        to: NodeId,
        partition_key: impl Into<String>,
    ) -> Self {
        Self {
            id,
            label,
            from,
            to,
            partition_key: partition_key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_ids() {
        assert_eq!(
            EdgeId::has_column("ecommerce.orders", "order_id").as_str(),
            "e:hascol:ecommerce.orders:order_id"
        );
        assert_eq!(
            EdgeId::fk("orders", "customer_id", "customers", "customer_id").as_str(),
            "e:fk:orders:customer_id->customers:customer_id"
        );
    }

    #[test]
    fn test_label_ordering_matches_rendering_order() {
        assert!(EdgeLabel::Fk.as_str() < EdgeLabel::HasColumn.as_str());
        assert_eq!("fk".parse::<EdgeLabel>().unwrap(), EdgeLabel::Fk);
        assert!("calls".parse::<EdgeLabel>().is_err());
    }

    #[test]
    fn test_edge_json_shape() {
        let edge = GraphEdge::new(
            EdgeId::new("e1"),
            EdgeLabel::HasColumn,
            NodeId::table("orders"),
            NodeId::column("orders", "order_id"),
            "ecommerce",
        );
        let json = serde_json::to_string(&edge).unwrap();
        assert!(json.contains(r#""label":"has_column""#));
        assert!(json.contains(r#""from":"t:orders""#));
    }
}
