// Azure OpenAI HTTP plumbing shared by the embedding and chat clients


use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::AzureConfig;

#[derive(Clone)]
pub struct AzureClient {
    base_url: Url,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl fmt::Debug for AzureClient {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"****")
            .finish_non_exhaustive()
    }
}

impl AzureClient {
    #[inline]
    pub fn new(config: &AzureConfig, timeout: Duration) -> Result<Self> {
        let mut base_url = config
            .endpoint_url()
            .context("Failed to parse Azure OpenAI endpoint")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let api_key = config
            .api_key()
            .context("Azure OpenAI API key is not configured")?
            .to_string();

        Ok(Self {
            base_url,
            api_key,
            agent: build_agent(timeout),
        })
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{endpoint}/openai/deployments/{deployment}/{operation}?api-version={api_version}`
    #[inline]
    pub fn deployment_url(
        &self,
        deployment: &str,
        operation: &str,
        api_version: &str,
    ) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("openai/deployments/{}/{}", deployment, operation))
            .with_context(|| format!("Failed to build {} URL", operation))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    /// POST a JSON body and return the raw response text of a successful call
    #[inline]
    pub fn post_json<T: Serialize>(&self, url: &Url, body: &T) -> Result<String> {
        let request_json = serde_json::to_string(body).context("Failed to serialize request")?;

        debug!("POST {}", url.path());

        match self.send(url, &request_json) {
            Ok((status, text)) if (200..300).contains(&status) => Ok(text),
            Ok((status, text)) => {
                let message = describe_error_body(&text);
                warn!("Azure OpenAI request failed (status {}): {}", status, message);
                Err(anyhow!(
                    "Azure OpenAI returned HTTP {}: {}",
                    status,
                    message
                ))
            }
            Err(error) => {
                warn!("Request to {} failed: {}", url.path(), error);
                Err(anyhow!("Request error: {}", error))
            }
        }
    }

    fn send(&self, url: &Url, request_json: &str) -> Result<(u16, String), ureq::Error> {
        let mut response = self
            .agent
            .post(url.as_str())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(request_json)?;
        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string()?;
        Ok((status, text))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Pull the message out of an Azure error payload, falling back to the raw body
fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error: ErrorBody {
                code: Some(code),
                message,
            },
        }) => format!("{} ({})", message, code),
        Ok(ErrorResponse { error }) => error.message,
        Err(_) if body.trim().is_empty() => "<empty response body>".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
