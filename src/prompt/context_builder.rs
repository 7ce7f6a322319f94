use std::collections::HashMap;

use crate::graph::context::GraphContext;
use crate::graph::node::NodeKind;

/// Render one `TABLE <name> (columns: <c1, c2, ...>)` line per table node.
///
/// Tables are sorted by name, columns by column name, so equivalent contexts
/// render byte-identically whatever order they were collected in. A table
/// with no columns in the context still gets a line. Columns without an
/// owning table are grouped under the empty name.
pub fn render_schema(ctx: &GraphContext) -> String {
    let mut columns_by_table: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in ctx.nodes() {
        if let NodeKind::Column { table } = &node.kind {
            columns_by_table
                .entry(table.as_deref().unwrap_or(""))
                .or_default()
                .push(node.name.as_str());
        }
    }

    let mut tables: Vec<_> = ctx.nodes().iter().filter(|n| n.is_table()).collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    let mut out = String::new();
    for table in tables {
        let mut columns = columns_by_table
            .get(table.name.as_str())
            .cloned()
            .unwrap_or_default();
        columns.sort_unstable();

        out.push_str(&format!(
            "TABLE {} (columns: {})\n",
            table.name,
            columns.join(", ")
        ));
    }
    out
}

/// Render one `<label>: <from> -> <to>` line per edge, grouped by label.
///
/// The sort is stable, so edges sharing a label keep their encounter order.
pub fn render_relationships(ctx: &GraphContext) -> String {
    let mut edges: Vec<_> = ctx.edges().iter().collect();
    edges.sort_by_key(|e| e.label.as_str());

    let mut out = String::new();
    for edge in edges {
        out.push_str(&format!("{}: {} -> {}\n", edge.label, edge.from, edge.to));
    }
    out
}
