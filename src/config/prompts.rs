//! Prompt templates for grounded answer generation.
//!
//! The built-in templates can be replaced by dropping a `rag.toml` into the
//! configured custom prompts directory. Templates use `{{name}}` placeholders;
//! `{{question}}` and `{{context}}` are filled per query, and any extra
//! variables from the config apply to every render.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// The prompt set used when answering questions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub rag: RagPrompts,
    #[serde(skip)]
    variables: HashMap<String, String>,
}

/// System and per-question user templates for answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that answers questions about a corpus of documents and video lectures.

Guidelines:
- Answer using only the numbered excerpts provided in the context
- Cite supporting excerpts inline with their bracketed numbers, e.g. [1] or [2]
- Page references point into PDF documents; time ranges point into videos
- If the excerpts do not contain the answer, say so clearly instead of guessing
- Be concise but thorough"#
                .to_string(),

            user: r#"Question: {{question}}

Relevant excerpts from the indexed material:

{{context}}

Answer the question based on the excerpts above, citing them by number."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load the prompt set, applying overrides from `custom_dir` when a
    /// `rag.toml` exists there.
    pub fn load(custom_dir: Option<&str>, variables: Option<&HashMap<String, String>>) -> Result<Self> {
        let mut prompts = Prompts {
            variables: variables.cloned().unwrap_or_default(),
            ..Prompts::default()
        };

        if let Some(dir) = custom_dir {
            let override_file =
                PathBuf::from(shellexpand::tilde(dir).to_string()).join("rag.toml");
            if override_file.exists() {
                prompts.rag = toml::from_str(&std::fs::read_to_string(&override_file)?)?;
            }
        }

        Ok(prompts)
    }

    /// Render the user template for one query. Config-level variables fill
    /// first; the question and context always win on collision.
    pub fn render_answer_prompt(&self, question: &str, context: &str) -> String {
        let mut rendered = self.rag.user.clone();
        for (name, value) in &self.variables {
            rendered = fill(&rendered, name, value);
        }
        rendered = fill(&rendered, "question", question);
        fill(&rendered, "context", context)
    }
}

fn fill(template: &str, name: &str, value: &str) -> String {
    template.replace(&format!("{{{{{name}}}}}"), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates_carry_placeholders() {
        let prompts = Prompts::default();
        assert!(!prompts.rag.system.is_empty());
        assert!(prompts.rag.user.contains("{{question}}"));
        assert!(prompts.rag.user.contains("{{context}}"));
    }

    #[test]
    fn test_render_answer_prompt() {
        let prompts = Prompts::default();
        let rendered =
            prompts.render_answer_prompt("Why is the sky blue?", "[1] p1 (p. 1)\nScattering.");

        assert!(rendered.contains("Question: Why is the sky blue?"));
        assert!(rendered.contains("[1] p1 (p. 1)\nScattering."));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_query_variables_beat_config_variables() {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), "config-level".to_string());
        let mut prompts = Prompts::default();
        prompts.variables = variables;

        let rendered = prompts.render_answer_prompt("query-level", "ctx");
        assert!(rendered.contains("query-level"));
        assert!(!rendered.contains("config-level"));
    }

    #[test]
    fn test_load_without_custom_dir() {
        let prompts = Prompts::load(None, None).unwrap();
        assert_eq!(prompts.rag.user, RagPrompts::default().user);
    }
}
