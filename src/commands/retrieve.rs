use anyhow::Result;
use serde_json::json;

use schemarag::{render_relationships, render_schema, AppConfig};

use super::{build_retriever, language_model, open_graph_db};
use crate::cli::{OutputFormat, RetrievalArgs};

/// Print the schema subgraph retrieved for `question`
pub async fn run(
    config: &AppConfig,
    question: &str,
    args: &RetrievalArgs,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Retrieving schema for: {}", question);

    let db = open_graph_db(config)?;
    let model = language_model(args)?;
    let retriever = build_retriever(&db, config, args, &model);
    let options = config.retrieval.resolve(args.top_k, args.max_hops);

    let ctx = retriever.retrieve_subgraph(question, &options).await?;

    if let Some(partial) = ctx.partial() {
        eprintln!(
            "Warning: expansion stopped at hop {} ({}); result is partial",
            partial.hop + 1,
            partial.reason
        );
    }

    match format {
        OutputFormat::Json => {
            let output = json!({
                "tables": ctx.table_names(),
                "nodes": ctx.nodes(),
                "edges": ctx.edges(),
                "schema": render_schema(&ctx),
                "relationships": render_relationships(&ctx),
                "partial": ctx.partial(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            if ctx.is_empty() {
                println!("No relevant schema found.");
                eprintln!("\nTips:");
                eprintln!(" - Use table or column names from your schema in the question");
                eprintln!(" - Enable LLM keyword augmentation for non-English questions");
                return Ok(());
            }
            println!("## Schema");
            print!("{}", render_schema(&ctx));
            println!("\n## Relationships");
            print!("{}", render_relationships(&ctx));
        }
    }
    Ok(())
}
