#[cfg(test)]
mod tests;

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::azure::AzureClient;
use crate::config::AzureConfig;
use crate::embeddings::Embedder;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Client for an Azure OpenAI embedding deployment
#[derive(Debug, Clone)]
pub struct AzureEmbeddings {
    client: AzureClient,
    url: Url,
    deployment: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl AzureEmbeddings {
    #[inline]
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let client = AzureClient::new(config, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))?;
        let deployment = config.embedding_deployment()?.to_string();
        let url = client.deployment_url(&deployment, "embeddings", &config.embedding_api_version)?;

        Ok(Self {
            client,
            url,
            deployment,
        })
    }

    #[inline]
    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response_text = self
            .client
            .post_json(&self.url, &EmbedRequest { input: texts })
            .context("Failed to generate embeddings")?;

        let mut response: EmbedResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embedding response")?;

        if response.data.len() != texts.len() {
            return Err(anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            ));
        }

        // Azure does not promise response order
        response.data.sort_by_key(|item| item.index);
        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }
}

impl Embedder for AzureEmbeddings {
    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Generating embeddings for {} texts with deployment {}",
            texts.len(),
            self.deployment
        );

        self.embed_batch(texts)
            .with_context(|| format!("Failed to process batch of {} texts", texts.len()))
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Embedding query (length: {})", text.len());
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow!("Embedding response contained no vectors"))
    }

    #[inline]
    fn health_check(&self) -> Result<()> {
        let probe = self
            .embed_query("health check")
            .context("Embedding deployment health check failed")?;
        info!(
            "Health check passed for embedding deployment {} ({} dimensions)",
            self.deployment,
            probe.len()
        );
        Ok(())
    }
}
