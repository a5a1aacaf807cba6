//! Answer generation contract

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::pipeline::ScoredFragment;
use crate::domain::DomainError;

/// Turns a question plus retrieved context into an answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Upstream failures surface as `DomainError::UpstreamModel`.
    async fn generate(
        &self,
        question: &str,
        context: &[ScoredFragment],
    ) -> Result<String, DomainError>;
}
