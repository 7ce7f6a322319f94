use anyhow::Result;
use std::sync::Arc;

use schemarag::agent::AskAgent;
use schemarag::db::Database;
use schemarag::server::{run_server, AppState};
use schemarag::sql_executor::SqlExecutor;
use schemarag::AppConfig;

use super::{build_retriever, language_model};
use crate::cli::RetrievalArgs;

/// Run the HTTP API server
pub async fn run(config: &AppConfig, host: &str, port: u16) -> Result<()> {
    tracing::info!("Starting schemarag server");

    // The seed endpoint may populate a fresh database
    let db = Database::new(&config.graph_db)?;
    let node_count = db.node_count()?;
    if node_count == 0 {
        tracing::warn!("Graph database is empty, POST /api/seed to populate it");
    } else {
        tracing::info!("Graph database holds {} nodes", node_count);
    }

    let args = RetrievalArgs {
        top_k: None,
        max_hops: None,
        no_llm: false,
        llm_provider: None,
        llm_model: None,
    };
    let model = language_model(&args)?;
    let retriever = build_retriever(&db, config, &args, &model);
    let agent = AskAgent::new(
        retriever,
        model,
        SqlExecutor::new(&config.data_db),
        config.retrieval.clone(),
    );

    let state = AppState {
        agent: Arc::new(agent),
        db,
    };
    run_server(host, port, state).await
}
