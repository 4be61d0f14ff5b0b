// Configuration module
// Environment-sourced settings shared by the ingestion and chat commands

pub mod display;
pub mod settings;

pub use display::show_config;
pub use settings::{AzureConfig, ConfigError, Settings};
