//! Answer generation through a chat model

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::generation::AnswerGenerator;
use crate::domain::llm::{LlmProvider, LlmRequest, Message};
use crate::domain::pipeline::ScoredFragment;
use crate::domain::DomainError;

const DEFAULT_TEMPERATURE: f32 = 0.75;
const DEFAULT_MAX_TOKENS: u32 = 512;

const SYSTEM_TEMPLATE: &str = "Use the following pieces of context to answer the question \
at the end. If you don't know the answer, just say that you don't know, don't try to make \
up an answer.\n\n${context}";

/// "Stuff" strategy: every retrieved fragment goes into a single system
/// message and the question follows as the user turn.
#[derive(Debug)]
pub struct LlmAnswerGenerator<P>
where
    P: LlmProvider,
{
    provider: Arc<P>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl<P: LlmProvider> LlmAnswerGenerator<P> {
    pub fn new(provider: Arc<P>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, question: &str, context: &[ScoredFragment]) -> LlmRequest {
        let context = context
            .iter()
            .map(|hit| hit.fragment.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n");

        LlmRequest::new(vec![
            Message::system(SYSTEM_TEMPLATE.replace("${context}", &context)),
            Message::user(question),
        ])
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens)
    }
}

#[async_trait]
impl<P: LlmProvider> AnswerGenerator for LlmAnswerGenerator<P> {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn generate(
        &self,
        question: &str,
        context: &[ScoredFragment],
    ) -> Result<String, DomainError> {
        let request = self.build_request(question, context);

        debug!(
            model = %self.model,
            provider = self.provider.provider_name(),
            fragments = context.len(),
            "Generating answer"
        );

        let response = self
            .provider
            .chat(&self.model, request)
            .await
            .map_err(|e| match e {
                DomainError::UpstreamModel { .. } | DomainError::Timeout { .. } => e,
                other => DomainError::upstream(self.provider.provider_name(), other.to_string()),
            })?;

        let answer = response.content().trim();

        if answer.is_empty() {
            return Err(DomainError::upstream(
                self.provider.provider_name(),
                "Empty response from model",
            ));
        }

        Ok(answer.to_string())
    }
}
