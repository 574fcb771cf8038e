//! Index command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::index::IndexMode;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(rebuild: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::require_api_key() {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let mode = if rebuild {
        IndexMode::Rebuild
    } else {
        IndexMode::Incremental
    };

    let spinner = Output::spinner(match mode {
        IndexMode::Rebuild => "Rebuilding index...",
        IndexMode::Incremental => "Updating index...",
    });

    match orchestrator.build_index(mode).await {
        Ok(report) => {
            spinner.finish_and_clear();

            Output::success(&format!(
                "Indexed {} chunks ({} pdf, {} video)",
                report.total_indexed(),
                report.pdf.indexed,
                report.video.indexed
            ));

            let stale = report.pdf.stale_removed + report.video.stale_removed;
            if stale > 0 {
                Output::info(&format!("Removed {} stale chunks", stale));
            }
            if report.total_failed() > 0 {
                Output::warning(&format!("{} chunks failed to index", report.total_failed()));
            }
            if !report.failed_sources.is_empty() {
                Output::header("Skipped sources");
                for source in &report.failed_sources {
                    Output::kv(&source.path, &source.reason);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Index build failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
