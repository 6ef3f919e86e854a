//! OpenRouter-compatible chat completions client
//!
//! Sends the phase or verdict prompt as the system message and the debate
//! context as the user message, and returns the first choice's content.

use async_trait::async_trait;
use rostrum_core::config::AiConfig;
use rostrum_core::{Analyst, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatTurn<'a>; 2],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

pub struct OpenRouter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl OpenRouter {
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key,
        })
    }

    fn request<'a>(&'a self, system_prompt: &'a str, context: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatTurn {
                    role: "system",
                    content: system_prompt,
                },
                ChatTurn {
                    role: "user",
                    content: context,
                },
            ],
            max_tokens: self.max_tokens,
        }
    }
}

/// First choice's content, or `AiUnavailable` when there is none
fn first_choice(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::AiUnavailable(format!("unreadable response: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| Error::AiUnavailable("no response choices received".into()))
}

#[async_trait]
impl Analyst for OpenRouter {
    async fn analyze(&self, system_prompt: &str, context: &str) -> Result<String> {
        debug!(model = %self.model, context_len = context.len(), "Sending analysis request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(system_prompt, context))
            .send()
            .await
            .map_err(|e| Error::AiUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::AiUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::AiUnavailable(format!("API error ({}): {}", status, body)));
        }

        first_choice(&body)
    }
}
