pub mod ask;
pub mod retrieve;
pub mod seed;
#[cfg(feature = "http")]
pub mod serve;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use schemarag::db::Database;
use schemarag::prompt::{get_llm_config, LanguageModel, LlmClient, LlmKeywordAugmenter, LlmProvider};
use schemarag::{AppConfig, SchemaRetriever};

use crate::cli::RetrievalArgs;

/// Open the graph database, refusing to create an empty one for read commands
pub fn open_graph_db(config: &AppConfig) -> Result<Database> {
    if !Path::new(&config.graph_db).exists() {
        return Err(anyhow::anyhow!(
            "Graph database {} not found, please run `schemarag seed` first",
            config.graph_db
        ));
    }
    Database::new(&config.graph_db)
        .with_context(|| format!("Failed to open graph database {}", config.graph_db))
}

/// Language model selected by the command line flags and environment
pub fn language_model(args: &RetrievalArgs) -> Result<Arc<LlmClient>> {
    let config = get_llm_config(args.llm_provider.as_deref(), args.llm_model.as_deref());
    tracing::debug!("Using LLM configuration {:?}", config);
    Ok(Arc::new(LlmClient::new(config)?))
}

/// Retriever over `db`, with LLM keyword augmentation unless disabled
pub fn build_retriever(
    db: &Database,
    config: &AppConfig,
    args: &RetrievalArgs,
    model: &Arc<LlmClient>,
) -> SchemaRetriever {
    let retriever = SchemaRetriever::new(Arc::new(db.clone()))
        .with_augment_timeout(config.augment_timeout);

    if args.no_llm || model.config().provider == LlmProvider::Mock {
        tracing::info!("Keyword augmentation disabled");
        return retriever;
    }
    let model: Arc<dyn LanguageModel> = model.clone();
    retriever.with_augmenter(Arc::new(LlmKeywordAugmenter::new(model)))
}
