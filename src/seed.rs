use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::db::Database;
use crate::graph::edge::{EdgeId, EdgeLabel, GraphEdge};
use crate::graph::node::{GraphNode, NodeId};

pub const DEFAULT_PARTITION_KEY: &str = "ecommerce";

/// A table and its column names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// A foreign key, from the referencing column to the referenced one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForeignKeySpec {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Relational schema description the graph is built from.
///
/// Table names are bare; the graph stores them qualified by the partition
/// key, e.g. `ecommerce.orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaSpec {
    pub partition_key: String,
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySpec>,
}

impl SchemaSpec {
    /// Load a schema description from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file {}", path.display()))?;
        let spec: SchemaSpec = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse schema file {}", path.display()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check that every foreign key points at declared tables and columns
    pub fn validate(&self) -> Result<()> {
        if self.partition_key.trim().is_empty() {
            return Err(anyhow!("Schema partition_key must not be empty"));
        }

        let mut columns = HashSet::new();
        for table in &self.tables {
            if table.name.trim().is_empty() {
                return Err(anyhow!("Schema contains a table with an empty name"));
            }
            for column in &table.columns {
                columns.insert((table.name.as_str(), column.as_str()));
            }
        }

        for fk in &self.foreign_keys {
            for (table, column) in [(&fk.from_table, &fk.from_column), (&fk.to_table, &fk.to_column)] {
                if !columns.contains(&(table.as_str(), column.as_str())) {
                    return Err(anyhow!(
                        "Foreign key {}.{} -> {}.{} references unknown column {}.{}",
                        fk.from_table,
                        fk.from_column,
                        fk.to_table,
                        fk.to_column,
                        table,
                        column
                    ));
                }
            }
        }
        Ok(())
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", self.partition_key, table)
    }
}

/// Builds the schema graph from a `SchemaSpec` and writes it to the store
#[derive(Debug, Clone)]
pub struct SchemaSeeder {
    schema: SchemaSpec,
}

impl Default for SchemaSeeder {
    fn default() -> Self {
        Self::new(ecommerce_schema())
    }
}

impl SchemaSeeder {
    pub fn new(schema: SchemaSpec) -> Self {
        Self { schema }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(SchemaSpec::from_file(path)?))
    }

    pub fn schema(&self) -> &SchemaSpec {
        &self.schema
    }

    /// Table and column nodes, tables first
    pub fn nodes(&self) -> Vec<GraphNode> {
        let pk = &self.schema.partition_key;
        let mut nodes: Vec<GraphNode> = self
            .schema
            .tables
            .iter()
            .map(|t| GraphNode::table(NodeId::table(&t.name), self.schema.qualified(&t.name), pk))
            .collect();

        for table in &self.schema.tables {
            let qualified = self.schema.qualified(&table.name);
            nodes.extend(table.columns.iter().map(|c| {
                GraphNode::column(NodeId::column(&table.name, c), c, &qualified, pk)
            }));
        }
        nodes
    }

    /// `has_column` edges (table -> column) followed by `fk` edges
    /// (referencing column -> referenced column)
    pub fn edges(&self) -> Vec<GraphEdge> {
        let pk = &self.schema.partition_key;
        let mut edges = Vec::new();

        for table in &self.schema.tables {
            let qualified = self.schema.qualified(&table.name);
            for column in &table.columns {
                edges.push(GraphEdge::new(
                    EdgeId::has_column(&qualified, column),
                    EdgeLabel::HasColumn,
                    NodeId::table(&table.name),
                    NodeId::column(&table.name, column),
                    pk,
                ));
            }
        }

        for fk in &self.schema.foreign_keys {
            edges.push(GraphEdge::new(
                EdgeId::fk(&fk.from_table, &fk.from_column, &fk.to_table, &fk.to_column),
                EdgeLabel::Fk,
                NodeId::column(&fk.from_table, &fk.from_column),
                NodeId::column(&fk.to_table, &fk.to_column),
                pk,
            ));
        }
        edges
    }

    /// Write the graph to `db`. Ids are deterministic, so reseeding replaces
    /// rows instead of duplicating them.
    pub fn seed(&self, db: &Database) -> Result<SeedSummary> {
        let nodes = self.nodes();
        let edges = self.edges();
        db.upsert_all(&nodes, &edges)
            .context("Failed to write schema graph")?;

        let summary = SeedSummary {
            partition_key: self.schema.partition_key.clone(),
            tables: self.schema.tables.len(),
            nodes: nodes.len(),
            edges: edges.len(),
        };
        info!(
            "Seeded partition '{}': {} tables, {} nodes, {} edges",
            summary.partition_key, summary.tables, summary.nodes, summary.edges
        );
        Ok(summary)
    }
}

/// Counts of what a seed run wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub partition_key: String,
    pub tables: usize,
    pub nodes: usize,
    pub edges: usize,
}

fn table(name: &str, columns: &[&str]) -> TableSpec {
    TableSpec {
        name: name.to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
    }
}

fn fk(from_table: &str, from_column: &str, to_table: &str, to_column: &str) -> ForeignKeySpec {
    ForeignKeySpec {
        from_table: from_table.to_string(),
        from_column: from_column.to_string(),
        to_table: to_table.to_string(),
        to_column: to_column.to_string(),
    }
}

/// The built-in e-commerce sample schema
pub fn ecommerce_schema() -> SchemaSpec {
    SchemaSpec {
        partition_key: DEFAULT_PARTITION_KEY.to_string(),
        tables: vec![
            table("customers", &["customer_id", "email", "full_name", "created_at"]),
            table(
                "addresses",
                &["address_id", "customer_id", "address_type", "prefecture", "city"],
            ),
            table("categories", &["category_id", "name", "parent_id"]),
            table(
                "products",
                &["product_id", "sku", "name", "category_id", "price", "status", "created_at"],
            ),
            table("product_images", &["image_id", "product_id", "url"]),
            table("warehouses", &["warehouse_id", "name"]),
            table("inventory", &["product_id", "warehouse_id", "qty_on_hand"]),
            table(
                "orders",
                &[
                    "order_id",
                    "order_number",
                    "customer_id",
                    "status",
                    "subtotal",
                    "total_amount",
                    "placed_at",
                ],
            ),
            table(
                "order_items",
                &["order_item_id", "order_id", "product_id", "unit_price", "quantity", "line_total"],
            ),
            table(
                "payments",
                &["payment_id", "order_id", "method", "amount", "status", "paid_at"],
            ),
            table(
                "shipments",
                &[
                    "shipment_id",
                    "order_id",
                    "carrier",
                    "tracking_number",
                    "status",
                    "shipped_at",
                    "delivered_at",
                ],
            ),
            table(
                "reviews",
                &["review_id", "product_id", "customer_id", "rating", "created_at"],
            ),
            // Reporting view, no column metadata
            table("v_sales_daily", &[]),
        ],
        foreign_keys: vec![
            fk("addresses", "customer_id", "customers", "customer_id"),
            fk("products", "category_id", "categories", "category_id"),
            fk("product_images", "product_id", "products", "product_id"),
            fk("inventory", "product_id", "products", "product_id"),
            fk("inventory", "warehouse_id", "warehouses", "warehouse_id"),
            fk("orders", "customer_id", "customers", "customer_id"),
            fk("order_items", "order_id", "orders", "order_id"),
            fk("order_items", "product_id", "products", "product_id"),
            fk("payments", "order_id", "orders", "order_id"),
            fk("shipments", "order_id", "orders", "order_id"),
            fk("reviews", "product_id", "products", "product_id"),
            fk("reviews", "customer_id", "customers", "customer_id"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_ecommerce_graph_shape() {
        let seeder = SchemaSeeder::default();
        let nodes = seeder.nodes();
        let edges = seeder.edges();

        let tables = nodes.iter().filter(|n| n.is_table()).count();
        let columns = nodes.len() - tables;
        assert_eq!(tables, 13);
        assert_eq!(columns, 58);

        let fks = edges.iter().filter(|e| e.label == EdgeLabel::Fk).count();
        assert_eq!(fks, 12);
        assert_eq!(edges.len() - fks, columns);
        assert!(seeder.schema().validate().is_ok());
    }

    #[test]
    fn test_ids_follow_naming_scheme() {
        let seeder = SchemaSeeder::default();
        let nodes = seeder.nodes();
        let edges = seeder.edges();

        let orders = nodes.iter().find(|n| n.id.as_str() == "t:orders").unwrap();
        assert_eq!(orders.name, "ecommerce.orders");

        let column = nodes
            .iter()
            .find(|n| n.id.as_str() == "c:orders:customer_id")
            .unwrap();
        assert_eq!(column.owning_table(), Some("ecommerce.orders"));

        assert!(edges
            .iter()
            .any(|e| e.id.as_str() == "e:hascol:ecommerce.orders:customer_id"
                && e.from.as_str() == "t:orders"));

        let fk = edges
            .iter()
            .find(|e| e.id.as_str() == "e:fk:orders:customer_id->customers:customer_id")
            .unwrap();
        assert_eq!(fk.from.as_str(), "c:orders:customer_id");
        assert_eq!(fk.to.as_str(), "c:customers:customer_id");
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("graph.db")).unwrap();
        let seeder = SchemaSeeder::default();

        let first = seeder.seed(&db).unwrap();
        let second = seeder.seed(&db).unwrap();

        assert_eq!(first, second);
        assert_eq!(db.node_count().unwrap(), first.nodes);
        assert_eq!(db.edge_count().unwrap(), first.edges);
    }

    #[test]
    fn test_load_schema_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "partition_key": "hr",
                "tables": [
                    {{"name": "employees", "columns": ["employee_id", "dept_id"]}},
                    {{"name": "departments", "columns": ["dept_id", "name"]}}
                ],
                "foreign_keys": [
                    {{"from_table": "employees", "from_column": "dept_id",
                      "to_table": "departments", "to_column": "dept_id"}}
                ]
            }}"#
        )
        .unwrap();

        let seeder = SchemaSeeder::from_file(file.path()).unwrap();

        assert_eq!(seeder.schema().partition_key, "hr");
        assert_eq!(seeder.nodes().len(), 6);
        assert_eq!(seeder.edges().len(), 5);
        assert!(seeder.nodes().iter().any(|n| n.name == "hr.employees"));
    }

    #[test]
    fn test_unknown_fk_column_rejected() {
        let mut schema = ecommerce_schema();
        schema
            .foreign_keys
            .push(fk("orders", "coupon_id", "coupons", "coupon_id"));

        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("orders.coupon_id"));
    }
}
