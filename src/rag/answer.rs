//! Answer generation with citations attached in context order.

use super::{Answer, Context};
use crate::config::Prompts;
use crate::error::Result;
use crate::generation::Generator;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Turns an assembled context and a question into a cited answer.
pub struct AnswerEngine {
    generator: Arc<dyn Generator>,
    prompts: Prompts,
}

impl AnswerEngine {
    pub fn new(generator: Arc<dyn Generator>, prompts: Prompts) -> Self {
        Self { generator, prompts }
    }

    /// Render the prompt template, call the generator, and attach the
    /// context's citation map to the returned text.
    #[instrument(skip(self, context), fields(question = %question, chunks = context.chunks.len()))]
    pub async fn answer(&self, question: &str, context: &Context) -> Result<Answer> {
        let prompt = self
            .prompts
            .render_answer_prompt(question, context.prompt_text());
        let text = self.generator.generate(&prompt).await?;

        debug!("Generated answer with {} citations", context.citations.len());

        Ok(Answer {
            text,
            citations: context.citations.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KildeError;
    use crate::rag::ContextAssembler;
    use crate::retrieval::{RankedChunk, SearchCandidate};
    use crate::chunking::SourceSpan;
    use crate::source::SourceKind;
    use crate::store::ChunkRecord;
    use async_trait::async_trait;
    use chrono::Utc;

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {}", prompt))
        }
    }

    struct DownGenerator;

    #[async_trait]
    impl Generator for DownGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(KildeError::GenerationUnavailable("503".to_string()))
        }
    }

    fn context_with_one_chunk() -> Context {
        ContextAssembler::new(10_000).assemble(&[RankedChunk {
            candidate: SearchCandidate {
                chunk_id: "p1#0000".to_string(),
                lexical_score: Some(1.0),
                vector_score: Some(0.8),
                fused_score: 0.9,
            },
            record: ChunkRecord {
                chunk_id: "p1#0000".to_string(),
                kind: SourceKind::Pdf,
                source_id: "p1".to_string(),
                ordinal: 0,
                text: "The sky is blue.".to_string(),
                span: SourceSpan::Pages { first: 1, last: 1 },
                embedding: vec![],
                pdf_reference: None,
                generation: 0,
                indexed_at: Utc::now(),
            },
        }])
    }

    #[tokio::test]
    async fn test_answer_embeds_question_and_context() {
        let engine = AnswerEngine::new(Arc::new(EchoGenerator), Prompts::default());
        let context = context_with_one_chunk();

        let answer = engine.answer("What color is the sky?", &context).await.unwrap();

        assert!(answer.text.contains("What color is the sky?"));
        assert!(answer.text.contains("The sky is blue."));
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].chunk_id, "p1#0000");
    }

    #[tokio::test]
    async fn test_generator_failure_is_generation_unavailable() {
        let engine = AnswerEngine::new(Arc::new(DownGenerator), Prompts::default());
        let context = context_with_one_chunk();

        let err = engine.answer("anything", &context).await.unwrap_err();
        assert!(matches!(err, KildeError::GenerationUnavailable(_)));
    }
}
