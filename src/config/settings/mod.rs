
use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_DATA_DIRECTORY: &str = "./Data";
pub const DEFAULT_PERSIST_DIRECTORY: &str = "./chroma_db";
pub const DEFAULT_COLLECTION_NAME: &str = "my_rag_collection";

pub const ENDPOINT_VAR: &str = "AZURE_OPENAI_ENDPOINT";
pub const API_KEY_VAR: &str = "AZURE_OPENAI_API_KEY";
pub const CHAT_DEPLOYMENT_VAR: &str = "AZURE_OPENAI_LLM_DEPLOYMENT";
pub const CHAT_API_VERSION_VAR: &str = "AZURE_OPENAI_API_LLM_VERSION";
pub const EMBEDDING_DEPLOYMENT_VAR: &str = "AZURE_OPENAI_EMBEDDING_DEPLOYMENT";
pub const EMBEDDING_API_VERSION_VAR: &str = "AZURE_OPENAI_API_EMBEDDING_VERSION";
pub const DATA_DIR_VAR: &str = "RAG_DATA_DIR";
pub const PERSIST_DIR_VAR: &str = "RAG_PERSIST_DIR";
pub const COLLECTION_VAR: &str = "RAG_COLLECTION";

/// Process-wide settings, read once at startup and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub azure: AzureConfig,
    /// Directory scanned for `*.pdf` and `*.txt` files
    pub data_dir: PathBuf,
    /// Directory holding the LanceDB store; wiped on every ingestion
    pub persist_dir: PathBuf,
    /// Table name used inside the store
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub chat_deployment: Option<String>,
    pub chat_api_version: String,
    pub embedding_deployment: Option<String>,
    pub embedding_api_version: String,
}

impl Default for AzureConfig {
    #[inline]
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            chat_deployment: None,
            chat_api_version: DEFAULT_API_VERSION.to_string(),
            embedding_deployment: None,
            embedding_api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl Default for Settings {
    #[inline]
    fn default() -> Self {
        Self {
            azure: AzureConfig::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIRECTORY),
            persist_dir: PathBuf::from(DEFAULT_PERSIST_DIRECTORY),
            collection: DEFAULT_COLLECTION_NAME.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "Azure OpenAI configuration missing: {}. Please set these environment variables (or add them to a .env file).",
        .0.join(", ")
    )]
    MissingSettings(Vec<&'static str>),
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
    #[error("Invalid endpoint protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid collection name: {0:?} (cannot be empty)")]
    InvalidCollection(String),
}

impl Settings {
    /// Load `.env` (if present) and read settings from the process environment
    #[inline]
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => debug!("No .env file found, using process environment"),
            Err(e) => warn!("Failed to read .env file: {}", e),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup. Blank values count as unset.
    #[inline]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            azure: AzureConfig {
                endpoint: get(ENDPOINT_VAR),
                api_key: get(API_KEY_VAR),
                chat_deployment: get(CHAT_DEPLOYMENT_VAR),
                chat_api_version: get(CHAT_API_VERSION_VAR)
                    .unwrap_or(defaults.azure.chat_api_version),
                embedding_deployment: get(EMBEDDING_DEPLOYMENT_VAR),
                embedding_api_version: get(EMBEDDING_API_VERSION_VAR)
                    .unwrap_or(defaults.azure.embedding_api_version),
            },
            data_dir: get(DATA_DIR_VAR).map_or(defaults.data_dir, PathBuf::from),
            persist_dir: get(PERSIST_DIR_VAR).map_or(defaults.persist_dir, PathBuf::from),
            collection: get(COLLECTION_VAR).unwrap_or(defaults.collection),
        }
    }

    /// Settings the chat shell cannot start without
    #[inline]
    pub fn require_chat(&self) -> Result<(), ConfigError> {
        self.require(&[
            (ENDPOINT_VAR, self.azure.endpoint.is_some()),
            (API_KEY_VAR, self.azure.api_key.is_some()),
            (CHAT_DEPLOYMENT_VAR, self.azure.chat_deployment.is_some()),
            (CHAT_API_VERSION_VAR, !self.azure.chat_api_version.is_empty()),
        ])
    }

    /// Settings the ingestion run cannot start without
    #[inline]
    pub fn require_ingest(&self) -> Result<(), ConfigError> {
        self.require(&[
            (ENDPOINT_VAR, self.azure.endpoint.is_some()),
            (API_KEY_VAR, self.azure.api_key.is_some()),
            (
                EMBEDDING_DEPLOYMENT_VAR,
                self.azure.embedding_deployment.is_some(),
            ),
        ])
    }

    fn require(&self, present: &[(&'static str, bool)]) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = present
            .iter()
            .filter(|(_, is_set)| !is_set)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingSettings(missing));
        }

        self.azure.endpoint_url()?;

        if self.collection.trim().is_empty() {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }

        Ok(())
    }
}

impl AzureConfig {
    #[inline]
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .endpoint
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSettings(vec![ENDPOINT_VAR]))?;
        let url = Url::parse(raw).map_err(|_| ConfigError::InvalidEndpoint(raw.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }

        Ok(url)
    }

    #[inline]
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSettings(vec![API_KEY_VAR]))
    }

    #[inline]
    pub fn chat_deployment(&self) -> Result<&str, ConfigError> {
        self.chat_deployment
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSettings(vec![CHAT_DEPLOYMENT_VAR]))
    }

    #[inline]
    pub fn embedding_deployment(&self) -> Result<&str, ConfigError> {
        self.embedding_deployment
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSettings(vec![EMBEDDING_DEPLOYMENT_VAR]))
    }

    /// The API key with everything but the last four characters masked
    #[inline]
    pub fn redacted_api_key(&self) -> Option<String> {
        self.api_key.as_deref().map(|key| {
            let len = key.chars().count();
            if len <= 4 {
                return "****".to_string();
            }
            let tail: String = key.chars().skip(len - 4).collect();
            format!("****{}", tail)
        })
    }
}
