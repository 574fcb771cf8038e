//! Stats command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the stats command.
pub async fn run_stats(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let stats = orchestrator.index_stats().await?;

    Output::header("Index");
    Output::kv("PDF chunks", &stats.pdf_chunks.to_string());
    Output::kv("Video chunks", &stats.video_chunks.to_string());

    if stats.sources.is_empty() {
        Output::info("No sources indexed yet. Run 'kilde index' first.");
        return Ok(());
    }

    Output::header("Sources");
    for source in &stats.sources {
        Output::source_info(
            &source.source_id,
            &source.kind.to_string(),
            source.chunk_count,
            source.pdf_reference.as_deref(),
        );
    }

    Ok(())
}
