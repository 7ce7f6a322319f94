use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const SYSTEM_PROMPT: &str = "You are an expert SQL analyst for a relational database.";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Chat completion backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenRouter,
    OpenAI,
    /// Offline stand-in that answers every prompt with an empty string
    Mock,
}

impl LlmProvider {
    fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => "openai/gpt-4o-mini",
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Mock => "mock",
        }
    }

    fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenRouter => Some(OPENROUTER_ENDPOINT),
            LlmProvider::OpenAI => Some(OPENAI_ENDPOINT),
            LlmProvider::Mock => None,
        }
    }

    fn api_key_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenRouter => Some("OPENROUTER_API_KEY"),
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Mock => None,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::OpenAI => "openai",
            LlmProvider::Mock => "mock",
        };
        f.write_str(name)
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openrouter" => Ok(LlmProvider::OpenRouter),
            "openai" => Ok(LlmProvider::OpenAI),
            "mock" => Ok(LlmProvider::Mock),
            other => Err(anyhow!("Unknown LLM provider: {}", other)),
        }
    }
}

/// Connection and sampling settings for the language model
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub endpoint_url: Option<String>,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

impl LlmConfig {
    pub fn mock() -> Self {
        Self {
            provider: LlmProvider::Mock,
            model: LlmProvider::Mock.default_model().to_string(),
            api_key: String::new(),
            temperature: 0.0,
            max_tokens: 1000,
            endpoint_url: None,
        }
    }

    fn endpoint(&self) -> Option<&str> {
        self.endpoint_url
            .as_deref()
            .or_else(|| self.provider.default_endpoint())
    }
}

/// Build the LLM configuration from explicit overrides and the environment.
///
/// Falls back to the mock provider when the selected provider has no API
/// key, so offline runs still work.
pub fn get_llm_config(provider: Option<&str>, model: Option<&str>) -> LlmConfig {
    llm_config_from(provider, model, |key| std::env::var(key).ok())
}

fn llm_config_from<F>(provider: Option<&str>, model: Option<&str>, lookup: F) -> LlmConfig
where
    F: Fn(&str) -> Option<String>,
{
    let requested = provider
        .map(str::to_string)
        .or_else(|| lookup("LLM_PROVIDER"))
        .unwrap_or_else(|| "openrouter".to_string());

    let provider = match requested.parse::<LlmProvider>() {
        Ok(provider) => provider,
        Err(e) => {
            warn!("{}, using mock provider", e);
            LlmProvider::Mock
        }
    };

    let api_key = provider
        .api_key_var()
        .and_then(|var| lookup(var))
        .filter(|key| !key.trim().is_empty());

    let provider = match (provider, &api_key) {
        (LlmProvider::Mock, _) => LlmProvider::Mock,
        (p, None) => {
            warn!("No API key set for {}, using mock provider", p);
            LlmProvider::Mock
        }
        (p, Some(_)) => p,
    };

    LlmConfig {
        provider,
        model: model
            .map(str::to_string)
            .or_else(|| lookup("LLM_MODEL"))
            .unwrap_or_else(|| provider.default_model().to_string()),
        api_key: api_key.unwrap_or_default(),
        temperature: 0.0,
        max_tokens: 1000,
        endpoint_url: lookup("LLM_ENDPOINT"),
    }
}

/// Something that turns a prompt into a completion
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// `temperature` overrides the configured value for this call
    async fn complete(&self, prompt: &str, temperature: Option<f32>) -> Result<String>;
}

/// `LanguageModel` backed by an OpenAI-compatible chat completions API
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, prompt: &str, temperature: Option<f32>) -> Result<String> {
        query_llm(&self.client, &self.config, prompt, temperature).await
    }
}

/// Send `prompt` to the configured provider, retrying with exponential backoff
pub async fn query_llm(
    client: &Client,
    config: &LlmConfig,
    prompt: &str,
    temperature: Option<f32>,
) -> Result<String> {
    let endpoint = match (config.provider, config.endpoint()) {
        (LlmProvider::Mock, _) => {
            debug!("Mock LLM provider, returning empty completion");
            return Ok(String::new());
        }
        (_, Some(endpoint)) => endpoint,
        (provider, None) => return Err(anyhow!("No endpoint configured for {}", provider)),
    };

    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": prompt}
        ],
        "temperature": temperature.unwrap_or(config.temperature),
        "max_tokens": config.max_tokens
    });

    let mut attempt = 0;
    loop {
        attempt += 1;
        debug!("LLM API call attempt {}/{}", attempt, MAX_RETRIES);

        match try_llm_query(client, endpoint, &config.api_key, &body).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    return Err(anyhow!("Failed after {} attempts: {}", MAX_RETRIES, e));
                }
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                warn!("LLM API call failed: {}. Retrying in {:?}", e, backoff);
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

async fn try_llm_query(client: &Client, endpoint: &str, api_key: &str, body: &Value) -> Result<String> {
    let res = client
        .post(endpoint)
        .header("Content-Type", "application/json")
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await?;

    if !res.status().is_success() {
        let status = res.status();
        let error_text = res
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow!("HTTP error {}: {}", status, error_text));
    }

    let json: Value = res.json().await?;
    extract_completion(&json)
}

fn extract_completion(json: &Value) -> Result<String> {
    if let Some(choice) = json["choices"].as_array().and_then(|arr| arr.first()) {
        if let Some(msg) = choice["message"]["content"].as_str() {
            return Ok(msg.to_string());
        }
    }

    if let Some(message) = json["error"]["message"].as_str() {
        return Err(anyhow!("API error: {}", message));
    }

    Err(anyhow!("Invalid response format from LLM API"))
}

/// Canned completions for tests, one per call in order
#[cfg(test)]
pub(crate) struct ScriptedModel {
    replies: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
    pub prompts: std::sync::Mutex<Vec<(String, Option<f32>)>>,
}

#[cfg(test)]
impl ScriptedModel {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into()),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<(String, Option<f32>)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str, temperature: Option<f32>) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted reply left")))
    }
}
