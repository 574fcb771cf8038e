//! Search command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::retrieval::{fuse, FusionWeights, HybridRetriever};
use anyhow::Result;

/// Run the search command: retrieve and fuse, without answer generation.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::require_api_key() {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings.clone())?;
    let retriever = HybridRetriever::new(orchestrator.store(), orchestrator.embedder());

    let spinner = Output::spinner("Searching...");

    let retrieved = retriever.retrieve(query, limit).await;
    spinner.finish_and_clear();

    match retrieved {
        Ok((lexical, vector)) => {
            let ranked = fuse(
                lexical,
                vector,
                &FusionWeights {
                    lexical: settings.retrieval.lexical_weight,
                    vector: settings.retrieval.vector_weight,
                },
                settings.retrieval.relevance_threshold,
                limit,
            );

            if ranked.is_empty() {
                Output::warning("No results above the relevance threshold.");
            } else {
                Output::success(&format!("Found {} results", ranked.len()));

                for result in &ranked {
                    Output::search_result(
                        &result.record.source_id,
                        &result.record.span.format(),
                        result.candidate.fused_score,
                        &result.record.text,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
