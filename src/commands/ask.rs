use anyhow::Result;

use schemarag::agent::{AskAgent, AskRequest};
use schemarag::sql_executor::SqlExecutor;
use schemarag::AppConfig;

use super::{build_retriever, language_model, open_graph_db};
use crate::cli::{OutputFormat, RetrievalArgs};

/// Answer `question` against the data database
pub async fn run(
    config: &AppConfig,
    question: &str,
    args: &RetrievalArgs,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Answering: {}", question);

    let db = open_graph_db(config)?;
    let model = language_model(args)?;
    let retriever = build_retriever(&db, config, args, &model);
    let agent = AskAgent::new(
        retriever,
        model,
        SqlExecutor::new(&config.data_db),
        config.retrieval.clone(),
    );

    let response = agent
        .answer(&AskRequest {
            question: question.to_string(),
            top_k: args.top_k,
            max_hops: args.max_hops,
        })
        .await?;

    if let Some(partial) = &response.partial {
        eprintln!(
            "Warning: expansion stopped at hop {} ({}); result is partial",
            partial.hop + 1,
            partial.reason
        );
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Text => {
            println!("Tables: {}", response.context_tables.join(", "));
            println!("\nSQL:\n{}", response.sql);
            println!("\nRows ({}):", response.rows.len());
            for row in &response.rows {
                println!("  {}", row);
            }
            println!("\n{}", response.summary);
        }
    }
    Ok(())
}
