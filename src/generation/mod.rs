// Answer generation
// Chat-completion client for an Azure OpenAI chat deployment


use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::azure::AzureClient;
use crate::config::AzureConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Produces a completion for a single prompt
pub trait ChatModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct AzureChat {
    client: AzureClient,
    url: Url,
    deployment: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
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

impl AzureChat {
    #[inline]
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let client = AzureClient::new(config, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))?;
        let deployment = config.chat_deployment()?.to_string();
        let url = client.deployment_url(&deployment, "chat/completions", &config.chat_api_version)?;

        Ok(Self {
            client,
            url,
            deployment,
            temperature: 0.0,
        })
    }

    #[inline]
    pub fn deployment(&self) -> &str {
        &self.deployment
    }
}

impl ChatModel for AzureChat {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} (prompt length: {})",
            self.deployment,
            prompt.len()
        );

        let request = ChatRequest {
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response_text = self
            .client
            .post_json(&self.url, &request)
            .context("Failed to generate answer")?;

        let response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Chat response contained no answer"))?;

        debug!("Received answer ({} chars)", answer.len());
        Ok(answer)
    }
}
