//! Checks that run before commands touch the OpenAI API.
//!
//! Indexing, asking, and searching all embed text, so they fail fast with a
//! clear message when no API key is configured instead of dying midway
//! through a build.

use crate::error::{KildeError, Result};

const KEY_VAR: &str = "OPENAI_API_KEY";

/// Fail unless an OpenAI API key is present in the environment.
pub fn require_api_key() -> Result<()> {
    match std::env::var(KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(KildeError::Config(format!(
            "{KEY_VAR} is not set; embedding and generation need it. \
             Export it first: export {KEY_VAR}='sk-...'"
        ))),
    }
}
