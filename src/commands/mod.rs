
use std::fmt::Write as _;

use console::style;
use tracing::info;

use crate::Result;
use crate::chat::{ChatSession, run_interactive};
use crate::config::Settings;
use crate::ingest::{IngestReport, Ingestor};
use crate::query::QueryPipeline;

/// Rebuild the vector store from the data directory
#[inline]
pub async fn run_ingest(settings: &Settings) -> Result<IngestReport> {
    info!(
        "Ingesting {} into {}",
        settings.data_dir.display(),
        settings.persist_dir.display()
    );

    let ingestor = Ingestor::from_settings(settings)?;
    let report = ingestor.run().await?;

    print!("{}", render_ingest_summary(&report, settings));

    Ok(report)
}

/// Open the stored documents and start the interactive chat shell
#[inline]
pub async fn run_chat(settings: &Settings) -> Result<()> {
    let pipeline = QueryPipeline::open(settings).await?;
    let mut session = ChatSession::new(pipeline);
    run_interactive(&mut session).await?;

    info!(
        "Chat session ended after {} turns",
        session.transcript().len()
    );
    Ok(())
}

/// Counts for a finished ingestion, followed by each skipped file and why
#[inline]
pub fn render_ingest_summary(report: &IngestReport, settings: &Settings) -> String {
    let mut out = format!("{}\n", style("✓ Ingestion complete").green().bold());
    let _ = writeln!(out, "  Files loaded: {}", style(report.files_loaded).cyan());
    if !report.skipped.is_empty() {
        let _ = writeln!(
            out,
            "  Files skipped: {}",
            style(report.skipped.len()).yellow()
        );
        for file in &report.skipped {
            let _ = writeln!(
                out,
                "    {} {}",
                style(file.path.display()).yellow(),
                style(format!("({})", file.reason)).dim()
            );
        }
    }
    let _ = writeln!(out, "  Documents: {}", style(report.documents).cyan());
    let _ = writeln!(out, "  Chunks: {}", style(report.chunks).cyan());
    let _ = writeln!(
        out,
        "  Stored {} records in collection {} at {}",
        style(report.records).cyan(),
        style(&settings.collection).cyan(),
        style(settings.persist_dir.display()).dim()
    );
    out
}
