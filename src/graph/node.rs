use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a schema node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: &str) -> Self {
        NodeId(id.to_string())
    }

    /// Deterministic id for a table node, keyed by the unqualified table name
    pub fn table(table: &str) -> Self {
        NodeId(format!("t:{}", table))
    }

    /// Deterministic id for a column node
    pub fn column(table: &str, column: &str) -> Self {
        NodeId(format!("c:{}:{}", table, column))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node label as stored in the graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NodeLabel {
    Table,
    Column,
}

impl NodeLabel {
    /// Labels the retrieval engine is allowed to seed from
    pub const SCHEMA: [NodeLabel; 2] = [NodeLabel::Table, NodeLabel::Column];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Table => "table",
            NodeLabel::Column => "column",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(NodeLabel::Table),
            "column" => Ok(NodeLabel::Column),
            other => Err(format!("unknown node label '{}'", other)),
        }
    }
}

/// Variant-specific attributes of a node.
///
/// A column normally carries its owning table's qualified name. The field
/// stays optional so records written without it can still be loaded and
/// rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum NodeKind {
    Table,
    Column {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table: Option<String>,
    },
}

/// A table or column in the schema graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphNode {
    pub id: NodeId,
    /// Qualified name for tables (`schema.table`), bare name for columns
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Store routing key only
    #[serde(rename = "pk")]
    pub partition_key: String,
}

impl GraphNode {
    pub fn table(id: NodeId, name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: NodeKind::Table,
            partition_key: partition_key.into(),
        }
    }

    pub fn column(
        id: NodeId,
        name: impl Into<String>,
        table: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind: NodeKind::Column {
                table: Some(table.into()),
            },
            partition_key: partition_key.into(),
        }
    }

    pub fn label(&self) -> NodeLabel {
        match self.kind {
            NodeKind::Table => NodeLabel::Table,
            NodeKind::Column { .. } => NodeLabel::Column,
        }
    }

    /// Owning table of a column node, `None` for tables and malformed columns
    pub fn owning_table(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Column { table } => table.as_deref(),
            NodeKind::Table => None,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self.kind, NodeKind::Table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deterministic_ids() {
        assert_eq!(NodeId::table("orders").as_str(), "t:orders");
        assert_eq!(
            NodeId::column("orders", "customer_id").as_str(),
            "c:orders:customer_id"
        );
        assert_eq!(NodeId::table("orders"), NodeId::table("orders"));
    }

    #[test]
    fn test_node_serializes_flat() {
        let node = GraphNode::column(
            NodeId::column("orders", "order_id"),
            "order_id",
            "ecommerce.orders",
            "ecommerce",
        );
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "c:orders:order_id",
                "label": "column",
                "name": "order_id",
                "table": "ecommerce.orders",
                "pk": "ecommerce"
            })
        );
    }

    #[test]
    fn test_column_without_table_deserializes() {
        let node: GraphNode = serde_json::from_value(json!({
            "id": "c:x:y",
            "label": "column",
            "name": "y",
            "pk": "p"
        }))
        .unwrap();
        assert_eq!(node.label(), NodeLabel::Column);
        assert_eq!(node.owning_table(), None);
    }

    #[test]
    fn test_label_parse() {
        assert_eq!("table".parse::<NodeLabel>().unwrap(), NodeLabel::Table);
        assert_eq!("column".parse::<NodeLabel>().unwrap(), NodeLabel::Column);
        assert!("view".parse::<NodeLabel>().is_err());
    }
}
