pub mod context_builder;
pub mod keyword_expander;
pub mod llm_integration;
pub mod sql_generation;

pub use context_builder::{render_relationships, render_schema};
pub use keyword_expander::LlmKeywordAugmenter;
pub use llm_integration::{get_llm_config, LanguageModel, LlmClient, LlmConfig, LlmProvider};
pub use sql_generation::{SqlGenerator, Summarizer};
