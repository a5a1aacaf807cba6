//! Offline answer generator

use async_trait::async_trait;

use crate::domain::generation::AnswerGenerator;
use crate::domain::pipeline::ScoredFragment;
use crate::domain::DomainError;

pub const NO_CONTEXT_ANSWER: &str = "No relevant information was found in this pipeline.";

/// Answers with the text of the best-scoring fragment. Needs no model and is
/// deterministic, which makes it the default when no LLM is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveAnswerGenerator;

impl ExtractiveAnswerGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnswerGenerator for ExtractiveAnswerGenerator {
    fn name(&self) -> &'static str {
        "extractive"
    }

    async fn generate(
        &self,
        _question: &str,
        context: &[ScoredFragment],
    ) -> Result<String, DomainError> {
        let best = context.iter().max_by(|a, b| a.score.total_cmp(&b.score));

        Ok(match best {
            Some(hit) => hit.fragment.text.trim().to_string(),
            None => NO_CONTEXT_ANSWER.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline::Fragment;

    fn hit(text: &str, score: f32) -> ScoredFragment {
        ScoredFragment {
            fragment: Fragment::new(text, text),
            score,
        }
    }

    #[tokio::test]
    async fn test_returns_highest_scoring_fragment() {
        let generator = ExtractiveAnswerGenerator::new();
        let context = vec![hit("second best", 0.4), hit("  the answer  ", 0.9)];

        let answer = generator.generate("question?", &context).await.unwrap();

        assert_eq!(answer, "the answer");
    }

    #[tokio::test]
    async fn test_empty_context() {
        let generator = ExtractiveAnswerGenerator::new();

        let answer = generator.generate("question?", &[]).await.unwrap();

        assert_eq!(answer, NO_CONTEXT_ANSWER);
    }
}
