//! Loaded retrieval chain for one pipeline

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{PipelineId, QueryAnswer};
use crate::domain::generation::AnswerGenerator;
use crate::domain::vector_store::VectorIndex;
use crate::domain::DomainError;

/// An opened index wired to an answer generator. This is what the pipeline
/// cache holds.
#[derive(Debug, Clone)]
pub struct RetrievalChain {
    pipeline_id: PipelineId,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn AnswerGenerator>,
    top_k: usize,
    loaded_at: DateTime<Utc>,
}

impl RetrievalChain {
    pub fn new(
        pipeline_id: PipelineId,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn AnswerGenerator>,
        top_k: usize,
    ) -> Self {
        Self {
            pipeline_id,
            index,
            generator,
            top_k: top_k.max(1),
            loaded_at: Utc::now(),
        }
    }

    pub fn pipeline_id(&self) -> PipelineId {
        self.pipeline_id
    }

    pub fn fragment_count(&self) -> usize {
        self.index.fragment_count()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Retrieves the closest fragments and asks the generator to answer from them.
    pub async fn ask(&self, question: &str) -> Result<QueryAnswer, DomainError> {
        let sources = self.index.search(question, self.top_k).await?;
        let answer = self.generator.generate(question, &sources).await?;

        Ok(QueryAnswer { answer, sources })
    }
}
