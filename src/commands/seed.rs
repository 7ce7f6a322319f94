use anyhow::Result;
use std::time::Instant;

use schemarag::db::Database;
use schemarag::seed::SchemaSeeder;
use schemarag::AppConfig;

/// Write the schema graph to the graph database
pub fn run(config: &AppConfig, schema_path: Option<&str>) -> Result<()> {
    let start_time = Instant::now();

    let seeder = match schema_path {
        Some(path) => {
            tracing::info!("Loading schema description from {}", path);
            SchemaSeeder::from_file(path)?
        }
        None => SchemaSeeder::default(),
    };

    let db = Database::new(&config.graph_db)?;
    let summary = seeder.seed(&db)?;

    tracing::info!("Seeding complete in {:.2?}", start_time.elapsed());
    println!(
        "Seeded {} tables ({} nodes, {} edges) into {}",
        summary.tables, summary.nodes, summary.edges, config.graph_db
    );
    Ok(())
}
