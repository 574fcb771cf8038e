//! Shared OpenAI client construction.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Per-request cap on OpenAI calls so a stalled connection cannot hang the
/// pipeline indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the OpenAI client used by the embedding and generation adapters.
pub fn create_client() -> Client<OpenAIConfig> {
    let http = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("default reqwest client");
    Client::with_config(OpenAIConfig::default()).with_http_client(http)
}
