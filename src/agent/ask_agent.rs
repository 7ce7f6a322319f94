use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RetrievalOptions;
use crate::error::AskError;
use crate::graph::context::PartialExpansion;
use crate::prompt::llm_integration::LanguageModel;
use crate::prompt::sql_generation::{SqlGenerator, Summarizer};
use crate::retrieval::SchemaRetriever;
use crate::sql_executor::SqlExecutor;

/// A natural-language question, with optional retrieval overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub max_hops: Option<usize>,
}

/// Everything produced while answering a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub sql: String,
    pub rows: Vec<Value>,
    pub summary: String,
    /// Sorted, distinct names of the tables the SQL was generated from
    pub context_tables: Vec<String>,
    pub prompt_used: String,
    /// Set when expansion stopped early and the schema context is truncated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialExpansion>,
}

/// Answers questions: retrieve schema, generate SQL, run it, summarize
pub struct AskAgent {
    retriever: SchemaRetriever,
    generator: SqlGenerator,
    executor: SqlExecutor,
    summarizer: Summarizer,
    defaults: RetrievalOptions,
}

impl AskAgent {
    pub fn new(
        retriever: SchemaRetriever,
        model: Arc<dyn LanguageModel>,
        executor: SqlExecutor,
        defaults: RetrievalOptions,
    ) -> Self {
        Self {
            retriever,
            generator: SqlGenerator::new(model.clone()),
            executor,
            summarizer: Summarizer::new(model),
            defaults,
        }
    }

    pub fn retriever(&self) -> &SchemaRetriever {
        &self.retriever
    }

    pub fn defaults(&self) -> &RetrievalOptions {
        &self.defaults
    }

    pub async fn answer(&self, request: &AskRequest) -> Result<AskResponse, AskError> {
        let options = self.defaults.resolve(request.top_k, request.max_hops);

        let ctx = self
            .retriever
            .retrieve_subgraph(&request.question, &options)
            .await?;
        let context_tables = ctx.table_names();
        let partial = ctx.partial().cloned();
        info!("Schema context covers {} tables", context_tables.len());
        if let Some(p) = &partial {
            warn!("Generating SQL from a partial schema context: {}", p.reason);
        }

        let (sql, prompt_used) = self.generator.generate(&request.question, &ctx).await?;
        info!("Generated SQL: {}", sql);

        let rows = self.executor.execute(&sql).await?;
        let summary = self
            .summarizer
            .summarize(&request.question, &sql, &rows)
            .await?;

        Ok(AskResponse {
            sql,
            rows,
            summary,
            context_tables,
            prompt_used,
            partial,
        })
    }
}
