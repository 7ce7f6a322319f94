use async_trait::async_trait;
use indoc::formatdoc;
use std::sync::Arc;

use crate::error::AugmentError;
use crate::prompt::llm_integration::LanguageModel;
use crate::retrieval::augment::KeywordAugmenter;

/// Asks the language model for English keywords matching table and column
/// vocabulary, so questions in other languages still find seeds.
pub struct LlmKeywordAugmenter {
    model: Arc<dyn LanguageModel>,
}

impl LlmKeywordAugmenter {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    fn build_prompt(question: &str) -> String {
        formatdoc! {"
            Extract 3-10 short English keywords (comma separated) relevant to SQL tables/columns from the given question. No explanations.

            Question: {question}",
            question = question,
        }
    }
}

#[async_trait]
impl KeywordAugmenter for LlmKeywordAugmenter {
    async fn augment(&self, question: &str) -> Result<Vec<String>, AugmentError> {
        let reply = self
            .model
            .complete(&Self::build_prompt(question), Some(0.0))
            .await?;
        Ok(parse_keyword_list(&reply))
    }
}

/// Split a comma or newline separated reply into trimmed, non-empty keywords
pub fn parse_keyword_list(reply: &str) -> Vec<String> {
    reply
        .split(|c| c == ',' || c == '\n')
        .map(|k| k.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '-' | '*')))
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
