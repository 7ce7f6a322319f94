use indoc::indoc;
use serde_json::Value;
use std::sync::Arc;

use crate::error::AskError;
use crate::graph::context::GraphContext;
use crate::prompt::context_builder::{render_relationships, render_schema};
use crate::prompt::llm_integration::LanguageModel;

const SQL_PROMPT: &str = indoc! {"
    You translate questions into a single SQLite SELECT statement.

    Use only the tables and columns listed below. Join tables through the
    listed foreign keys (fk: referencing column -> referenced column).
    Return only the SQL, without explanations or markdown.

    ## Schema
    {{schema_context}}
    ## Relationships
    {{relationships}}
    ## Question
    {{question}}
"};

const SUMMARY_PROMPT: &str = indoc! {"
    Answer the question in two or three sentences using the query result.
    Answer in the language of the question. If the result is empty, say so.

    ## Question
    {{question}}

    ## SQL
    {{sql}}

    ## Result rows (JSON)
    {{rows_json}}
"};

/// Generates SQL for a question from the retrieved schema subgraph
pub struct SqlGenerator {
    model: Arc<dyn LanguageModel>,
}

impl SqlGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn build_prompt(question: &str, ctx: &GraphContext) -> String {
        SQL_PROMPT
            .replace("{{schema_context}}", &render_schema(ctx))
            .replace("{{relationships}}", &render_relationships(ctx))
            .replace("{{question}}", question)
    }

    /// Returns the generated statement and the prompt that produced it
    pub async fn generate(
        &self,
        question: &str,
        ctx: &GraphContext,
    ) -> Result<(String, String), AskError> {
        let prompt = Self::build_prompt(question, ctx);
        let reply = self
            .model
            .complete(&prompt, None)
            .await
            .map_err(|e| AskError::Generation(e.to_string()))?;

        let sql = strip_code_fence(&reply);
        if sql.is_empty() {
            return Err(AskError::Generation("model returned no SQL".to_string()));
        }
        Ok((sql, prompt))
    }
}

/// Writes a short natural-language answer from the query result
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn build_prompt(question: &str, sql: &str, rows: &[Value]) -> String {
        let rows_json = serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string());
        SUMMARY_PROMPT
            .replace("{{question}}", question)
            .replace("{{sql}}", sql)
            .replace("{{rows_json}}", &rows_json)
    }

    pub async fn summarize(&self, question: &str, sql: &str, rows: &[Value]) -> Result<String, AskError> {
        let reply = self
            .model
            .complete(&Self::build_prompt(question, sql, rows), None)
            .await
            .map_err(|e| AskError::Summary(e.to_string()))?;
        Ok(reply.trim().to_string())
    }
}

/// Remove a surrounding markdown code fence and trailing semicolons
fn strip_code_fence(reply: &str) -> String {
    let mut sql = reply.trim();
    if let Some(rest) = sql.strip_prefix("```") {
        // Drop the language tag line
        sql = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        sql = sql.trim_end().strip_suffix("```").unwrap_or(sql);
    }
    sql.trim().trim_end_matches(';').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::context::assemble;
    use crate::graph::node::{GraphNode, NodeId};
    use crate::prompt::llm_integration::ScriptedModel;

    fn orders_context() -> GraphContext {
        assemble(
            vec![
                GraphNode::table(NodeId::table("orders"), "ecommerce.orders", "ecommerce"),
                GraphNode::column(
                    NodeId::column("orders", "total_amount"),
                    "total_amount",
                    "ecommerce.orders",
                    "ecommerce",
                ),
            ],
            vec![],
        )
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```sql\nSELECT 1;\n```"), "SELECT 1");
        assert_eq!(strip_code_fence("```\nSELECT 2\n```\n"), "SELECT 2");
        assert_eq!(strip_code_fence("  SELECT 3  "), "SELECT 3");
        assert_eq!(strip_code_fence("```"), "");
    }

    #[test]
    fn test_sql_prompt_fills_placeholders() {
        let prompt = SqlGenerator::build_prompt("total sales?", &orders_context());

        assert!(prompt.contains("TABLE ecommerce.orders (columns: total_amount)"));
        assert!(prompt.contains("total sales?"));
        assert!(!prompt.contains("{{"));
    }

    #[tokio::test]
    async fn test_generate_returns_sql_and_prompt() {
        let model = Arc::new(ScriptedModel::replying(&[
            "```sql\nSELECT SUM(total_amount) FROM orders;\n```",
        ]));
        let generator = SqlGenerator::new(model);

        let (sql, prompt) = generator
            .generate("total sales?", &orders_context())
            .await
            .unwrap();

        assert_eq!(sql, "SELECT SUM(total_amount) FROM orders");
        assert!(prompt.contains("ecommerce.orders"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_a_generation_error() {
        let generator = SqlGenerator::new(Arc::new(ScriptedModel::replying(&["   "])));

        let err = generator
            .generate("total sales?", &orders_context())
            .await
            .unwrap_err();

        assert!(matches!(err, AskError::Generation(_)));
    }

    #[tokio::test]
    async fn test_summarize_includes_rows() {
        let model = Arc::new(ScriptedModel::replying(&["  Sales were 42.  "]));
        let summarizer = Summarizer::new(model.clone());
        let rows = vec![serde_json::json!({"total": 42})];

        let summary = summarizer
            .summarize("total sales?", "SELECT 42 AS total", &rows)
            .await
            .unwrap();

        assert_eq!(summary, "Sales were 42.");
        assert!(model.prompts()[0].0.contains(r#"[{"total":42}]"#));
    }
}
