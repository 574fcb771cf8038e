//! Ask command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::QueryOutcome;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::require_api_key() {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching the indexed corpus...");

    match orchestrator.answer_question(question).await {
        Ok(QueryOutcome::Answered(answer)) => {
            spinner.finish_and_clear();

            println!("\n{}\n", answer.text);

            if !answer.citations.is_empty() {
                Output::header("Sources");
                for citation in &answer.citations {
                    Output::citation(&citation.format());
                }
            }
        }
        Ok(QueryOutcome::NoRelevantResults { message }) => {
            spinner.finish_and_clear();
            Output::warning(&message);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to answer question: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
