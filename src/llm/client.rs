//! LLM client for API communication

use super::prompts::REPAIR_SYSTEM_PROMPT;
use crate::workspace::{LlmSettings, Provider};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Response from LLM
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The generated content
    pub content: String,
    /// Number of tokens used
    pub tokens_used: Option<usize>,
}

/// Anything that can answer a repair prompt
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for a user message
    async fn complete(&self, prompt: &str) -> Result<LlmResponse>;

    /// Generate completion with retry
    async fn complete_with_retry(&self, prompt: &str, max_retries: usize) -> Result<LlmResponse> {
        let mut last_error = None;

        for attempt in 0..max_retries {
            match self.complete(prompt).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("LLM request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(e);

                    tokio::time::sleep(tokio::time::Duration::from_millis(
                        500 * (attempt as u64 + 1),
                    ))
                    .await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error")))
    }
}

/// Configuration for LLM client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Service to call
    pub provider: Provider,
    /// API base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// API key
    pub api_key: Option<String>,
    /// Maximum tokens for response
    pub max_tokens: usize,
    /// Temperature for generation
    pub temperature: f32,
}

impl LlmConfig {
    /// Defaults for a provider
    pub fn for_provider(provider: Provider) -> Self {
        let (endpoint, model) = match provider {
            Provider::OpenAi => ("https://api.openai.com", "gpt-3.5-turbo"),
            Provider::Anthropic => ("https://api.anthropic.com", "claude-3-5-sonnet-20240620"),
        };

        Self {
            provider,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: None,
            max_tokens: 800,
            temperature: 0.0,
        }
    }

    /// Build from workspace settings, overriding provider defaults
    pub fn from_settings(settings: &LlmSettings, api_key: Option<String>) -> Self {
        let mut config = Self::for_provider(settings.provider);
        if let Some(ref endpoint) = settings.endpoint {
            config.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(ref model) = settings.model {
            config.model = model.clone();
        }
        config.api_key = api_key;
        config.max_tokens = settings.max_tokens;
        config.temperature = settings.temperature;
        config
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::for_provider(Provider::OpenAi)
    }
}

/// LLM client for repair suggestions
pub struct LlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Generate completion using the OpenAI chat API
    async fn complete_openai(&self, prompt: &str) -> Result<LlmResponse> {
        let url = format!("{}/v1/chat/completions", self.config.endpoint);

        let request = OpenAIChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: REPAIR_SYSTEM_PROMPT.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let mut req_builder = self.client.post(&url).json(&request);

        if let Some(ref key) = self.config.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = req_builder
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI request failed: {} - {}", status, body);
        }

        let result: OpenAIChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let content = result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        let tokens_used = result.usage.map(|u| u.total_tokens as usize);

        Ok(LlmResponse {
            content,
            tokens_used,
        })
    }

    /// Generate completion using the Anthropic messages API
    async fn complete_anthropic(&self, prompt: &str) -> Result<LlmResponse> {
        let url = format!("{}/v1/messages", self.config.endpoint);

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            system: REPAIR_SYSTEM_PROMPT.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut req_builder = self
            .client
            .post(&url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request);

        if let Some(ref key) = self.config.api_key {
            req_builder = req_builder.header("x-api-key", key);
        }

        let response = req_builder
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic request failed: {} - {}", status, body);
        }

        let result: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        Ok(LlmResponse {
            content: result.text(),
            tokens_used: result
                .usage
                .map(|u| (u.input_tokens + u.output_tokens) as usize),
        })
    }
}

#[async_trait::async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        if self.config.api_key.is_none() {
            tracing::warn!("No API key configured for {}", self.config.provider);
        }

        match self.config.provider {
            Provider::OpenAi => self.complete_openai(prompt).await,
            Provider::Anthropic => self.complete_anthropic(prompt).await,
        }
    }
}

const ANTHROPIC_VERSION: &str = "2023-06-01";

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: i32,
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    system: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

impl AnthropicResponse {
    /// Text of the first text block
    fn text(&self) -> String {
        self.content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: i32,
    output_tokens: i32,
}

/// Mock LLM client for testing
pub struct MockLlmClient {
    responses: std::collections::HashMap<String, String>,
}

impl MockLlmClient {
    /// Create a new mock client
    pub fn new() -> Self {
        Self {
            responses: std::collections::HashMap::new(),
        }
    }

    /// Add a mock response
    pub fn add_response(&mut self, prompt_contains: &str, response: &str) {
        self.responses
            .insert(prompt_contains.to_string(), response.to_string());
    }
}

#[async_trait::async_trait]
impl CompletionProvider for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        for (key, response) in &self.responses {
            if prompt.contains(key) {
                return Ok(LlmResponse {
                    content: response.clone(),
                    tokens_used: Some(100),
                });
            }
        }

        Ok(LlmResponse {
            content: "1. Error Analysis: mock\n2. Code Correction: mock".to_string(),
            tokens_used: Some(50),
        })
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}
