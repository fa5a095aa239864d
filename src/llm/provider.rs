//! LLM Provider implementations

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

/// The fixed set of upstream models that answer every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Gemini,
    Cypher,
    DeepSeek,
}

impl Source {
    /// Display and query order
    pub const ALL: [Source; 3] = [Source::Gemini, Source::Cypher, Source::DeepSeek];

    pub fn name(&self) -> &'static str {
        match self {
            Source::Gemini => "Gemini",
            Source::Cypher => "Cypher",
            Source::DeepSeek => "DeepSeek",
        }
    }

    /// Key used in the `[providers.*]` config tables
    pub fn key(&self) -> &'static str {
        match self {
            Source::Gemini => "gemini",
            Source::Cypher => "cypher",
            Source::DeepSeek => "deepseek",
        }
    }

    pub fn from_key(key: &str) -> Option<Source> {
        Source::ALL.into_iter().find(|s| s.key() == key)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generic LLM provider trait
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a single-turn prompt and return the trimmed completion text.
    async fn ask(&self, prompt: &str) -> Result<String, ProviderError>;
    fn source(&self) -> Source;
}

/// Longest upstream error body kept in a [`ProviderError`]
const MAX_ERROR_BODY: usize = 300;

/// Map a non-2xx response onto the provider error taxonomy.
async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = truncate_chars(body.trim(), MAX_ERROR_BODY).to_string();

    Err(match status.as_u16() {
        401 | 403 => ProviderError::Auth(body),
        429 => ProviderError::RateLimited(body),
        code => ProviderError::Status { code, body },
    })
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn non_empty(text: &str) -> Result<String, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Google Gemini provider (Generative Language REST API)
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    pub fn new(client: Client, config: ProviderConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            config,
            api_key,
        }
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GeminiRequest<'a> {
        let generation_config =
            if self.config.max_tokens.is_some() || self.config.temperature.is_some() {
                Some(GeminiGenerationConfig {
                    max_output_tokens: self.config.max_tokens,
                    temperature: self.config.temperature,
                })
            } else {
                None
            };

        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config,
        }
    }
}

/// Join the text parts of the first candidate.
fn gemini_text(response: GeminiResponse) -> Result<String, ProviderError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("no candidates".to_string()))?;

    let content = candidate
        .content
        .ok_or_else(|| ProviderError::MalformedResponse("candidate has no content".to_string()))?;

    let text: String = content.parts.into_iter().map(|p| p.text).collect();
    non_empty(&text)
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn ask(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        debug!(model = %self.config.model, "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&self.request(prompt))
            .send()
            .await?;

        let response: GeminiResponse = check_status(response).await?.json().await?;
        gemini_text(response)
    }

    fn source(&self) -> Source {
        Source::Gemini
    }
}

/// OpenAI-compatible chat completions provider
///
/// Serves both the OpenRouter gateway (Cypher) and the Together
/// inference API (DeepSeek); they differ only in endpoint, model and
/// a pair of attribution headers.
pub struct ChatCompletionsProvider {
    source: Source,
    client: Client,
    config: ProviderConfig,
    api_key: Option<String>,
    extra_headers: Vec<(&'static str, &'static str)>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

impl ChatCompletionsProvider {
    /// Cypher, served through the OpenRouter gateway
    pub fn openrouter(client: Client, config: ProviderConfig, api_key: Option<String>) -> Self {
        Self {
            source: Source::Cypher,
            client,
            config,
            api_key,
            extra_headers: vec![
                ("HTTP-Referer", "https://chatbot.com"),
                ("X-Title", "ChatbotCompare"),
            ],
        }
    }

    /// DeepSeek, served through the Together inference API
    pub fn together(client: Client, config: ProviderConfig, api_key: Option<String>) -> Self {
        Self {
            source: Source::DeepSeek,
            client,
            config,
            api_key,
            extra_headers: Vec::new(),
        }
    }
}

fn chat_text(response: ChatResponse) -> Result<String, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("no choices".to_string()))?;

    let content = choice
        .message
        .content
        .ok_or_else(|| ProviderError::MalformedResponse("choice has no content".to_string()))?;

    non_empty(&content)
}

#[async_trait::async_trait]
impl LlmProvider for ChatCompletionsProvider {
    async fn ask(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        debug!(source = %self.source, model = %self.config.model, "Calling chat completions");

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json");
        for (name, value) in &self.extra_headers {
            builder = builder.header(*name, *value);
        }

        let response = builder.json(&request).send().await?;
        let response: ChatResponse = check_status(response).await?.json().await?;
        chat_text(response)
    }

    fn source(&self) -> Source {
        self.source
    }
}

/// Stand-in for a provider switched off in the config
pub struct DisabledProvider {
    source: Source,
}

impl DisabledProvider {
    pub fn new(source: Source) -> Self {
        Self { source }
    }
}

#[async_trait::async_trait]
impl LlmProvider for DisabledProvider {
    async fn ask(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Disabled)
    }

    fn source(&self) -> Source {
        self.source
    }
}

/// Factory function to create provider from config
///
/// A missing key does not fail here; the provider reports
/// [`ProviderError::MissingApiKey`] when it is asked.
pub fn create_provider(
    source: Source,
    client: Client,
    config: ProviderConfig,
    api_key: Option<String>,
) -> Box<dyn LlmProvider> {
    if !config.enabled {
        return Box::new(DisabledProvider::new(source));
    }

    match source {
        Source::Gemini => Box::new(GeminiProvider::new(client, config, api_key)),
        Source::Cypher => Box::new(ChatCompletionsProvider::openrouter(client, config, api_key)),
        Source::DeepSeek => Box::new(ChatCompletionsProvider::together(client, config, api_key)),
    }
}
