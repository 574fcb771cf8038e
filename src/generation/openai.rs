//! OpenAI chat-completion generator.

use super::Generator;
use crate::error::{KildeError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based generator.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    system_prompt: String,
}

impl OpenAIGenerator {
    pub fn new(model: &str, system_prompt: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
        }
    }
}

fn unavailable(stage: &str, detail: impl std::fmt::Display) -> KildeError {
    KildeError::GenerationUnavailable(format!("{stage}: {detail}"))
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, prompt), fields(prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(self.system_prompt.as_str())
            .build()
            .map_err(|e| unavailable("system message", e))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| unavailable("user message", e))?;

        let messages: [ChatCompletionRequestMessage; 2] = [system.into(), user.into()];
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.7)
            .build()
            .map_err(|e| unavailable("request build", e))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| unavailable("chat completion", e))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| unavailable("chat completion", "empty response"))?;

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }
}
