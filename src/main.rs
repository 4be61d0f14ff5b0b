use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use doc_rag::Result;
use doc_rag::commands::{run_chat, run_ingest};
use doc_rag::config::{Settings, show_config};

#[derive(Parser)]
#[command(name = "doc-rag")]
#[command(about = "Ask questions about your PDF and text documents using Azure OpenAI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the vector store from every PDF and text file in the data directory
    Ingest,
    /// Start an interactive question-and-answer session over the ingested documents
    Chat,
    /// Show the effective configuration with the API key masked
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load();

    match cli.command {
        Commands::Ingest => {
            run_ingest(&settings).await?;
        }
        Commands::Chat => {
            run_chat(&settings).await?;
        }
        Commands::Config => {
            show_config(&settings);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn ingest_command() {
        let cli = Cli::try_parse_from(["doc-rag", "ingest"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Ingest));
        }
    }

    #[test]
    fn chat_command() {
        let cli = Cli::try_parse_from(["doc-rag", "chat"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Chat));
        }
    }

    #[test]
    fn config_command() {
        let cli = Cli::try_parse_from(["doc-rag", "config"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Config));
        }
    }

    #[test]
    fn ingest_takes_no_flags() {
        let cli = Cli::try_parse_from(["doc-rag", "ingest", "--force"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        }
    }

    #[test]
    fn missing_subcommand() {
        let cli = Cli::try_parse_from(["doc-rag"]);
        assert!(cli.is_err());
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["doc-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["doc-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
