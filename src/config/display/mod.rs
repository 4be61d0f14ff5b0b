
use console::style;

use super::Settings;

const UNSET: &str = "<not set>";

/// Print the effective configuration with the API key masked
#[inline]
pub fn show_config(settings: &Settings) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Azure OpenAI Settings:").bold().yellow());
    for (label, value) in azure_entries(settings) {
        if value == UNSET {
            eprintln!("  {}: {}", label, style(value).red());
        } else {
            eprintln!("  {}: {}", label, style(value).cyan());
        }
    }

    eprintln!();
    eprintln!("{}", style("Storage:").bold().yellow());
    eprintln!(
        "  Data directory: {}",
        style(settings.data_dir.display()).cyan()
    );
    eprintln!(
        "  Vector store: {}",
        style(settings.persist_dir.display()).cyan()
    );
    eprintln!("  Collection: {}", style(&settings.collection).cyan());

    eprintln!();
    match (settings.require_ingest(), settings.require_chat()) {
        (Ok(()), Ok(())) => eprintln!("{}", style("✓ Ready for ingest and chat").green()),
        (Ok(()), Err(e)) => eprintln!("{} {}", style("⚠ Chat unavailable:").yellow(), e),
        (Err(e), Ok(())) => eprintln!("{} {}", style("⚠ Ingest unavailable:").yellow(), e),
        (Err(e), Err(_)) => eprintln!("{} {}", style("✗").red(), e),
    }
}

fn azure_entries(settings: &Settings) -> Vec<(&'static str, String)> {
    let azure = &settings.azure;
    let or_unset = |value: Option<&str>| value.unwrap_or(UNSET).to_string();

    vec![
        ("Endpoint", or_unset(azure.endpoint.as_deref())),
        (
            "API key",
            azure
                .redacted_api_key()
                .unwrap_or_else(|| UNSET.to_string()),
        ),
        ("Chat deployment", or_unset(azure.chat_deployment.as_deref())),
        ("Chat API version", azure.chat_api_version.clone()),
        (
            "Embedding deployment",
            or_unset(azure.embedding_deployment.as_deref()),
        ),
        ("Embedding API version", azure.embedding_api_version.clone()),
    ]
}
