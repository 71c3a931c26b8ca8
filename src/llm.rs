//! Text generation collaborator.
//!
//! The pipeline only needs "system + user prompt in, text out". Providers are
//! all reached through their OpenAI-compatible chat completions endpoint.

use crate::config::{LlmConfig, ModelSettings, Provider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

/// What a generation call is for; selects the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Page analysis and test case synthesis, answered as JSON
    Analysis,
    /// Script synthesis, answered as fenced source code
    Script,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str, purpose: Purpose) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat completions client for any OpenAI-compatible provider
pub struct ChatClient {
    http: reqwest::Client,
    provider: Provider,
    api_key: Option<String>,
    base_url: String,
    settings: ModelSettings,
}

impl ChatClient {
    pub fn new(provider: Provider, settings: ModelSettings, api_key: Option<String>) -> Self {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string());
        Self {
            http: reqwest::Client::new(),
            provider,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
        }
    }

    /// Builds a client for the configured provider, reading its API key from
    /// the environment. A provider that needs a key and has none is a
    /// configuration error.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let (provider, settings) = config.resolve()?;
        let api_key = match provider.api_key_env() {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                Error::Config(format!(
                    "{} is not set (required for provider {})",
                    var,
                    provider.as_str()
                ))
            })?),
            None => None,
        };
        ::log::info!(
            "Using {} (analysis: {}, scripts: {})",
            provider.as_str(),
            settings.analysis_model,
            settings.script_model
        );
        Ok(Self::new(provider, settings, api_key))
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| Error::Config(format!("invalid API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn model(&self, purpose: Purpose) -> &str {
        match purpose {
            Purpose::Analysis => &self.settings.analysis_model,
            Purpose::Script => &self.settings.script_model,
        }
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, system: &str, user: &str, purpose: Purpose) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = self.model(purpose);
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.settings.temperature,
            response_format: match purpose {
                Purpose::Analysis => Some(ResponseFormat {
                    kind: "json_object",
                }),
                Purpose::Script => None,
            },
        };

        ::log::debug!("{} chat request ({:?}, model {})", self.provider.as_str(), purpose, model);

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(Error::Generation(format!(
                "{} API error ({}): {}",
                self.provider.as_str(),
                status,
                error_text
            )));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                Error::Generation(format!("No response from {}", self.provider.as_str()))
            })
    }
}
