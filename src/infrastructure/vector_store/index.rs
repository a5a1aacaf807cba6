//! Exact nearest-neighbour search over a loaded namespace

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use super::format::StoredRecord;
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::pipeline::{PipelineId, ScoredFragment};
use crate::domain::vector_store::VectorIndex;
use crate::domain::DomainError;

/// All of a pipeline's records held in memory and scanned linearly by
/// cosine similarity.
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    pipeline_id: PipelineId,
    records: Vec<StoredRecord>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl InMemoryVectorIndex {
    pub fn new(
        pipeline_id: PipelineId,
        records: Vec<StoredRecord>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            pipeline_id,
            records,
            embedder,
        }
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }

    (dot / denom) as f32
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn pipeline_id(&self) -> PipelineId {
        self.pipeline_id
    }

    fn fragment_count(&self) -> usize {
        self.records.len()
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredFragment>, DomainError> {
        if top_k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::upstream(self.embedder.provider_name(), "empty embedding response"))?;

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| (position, cosine_similarity(&query_vector, &record.embedding)))
            .collect();

        // Ties keep insertion order so results are stable across loads.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredFragment {
                fragment: self.records[position].fragment.clone(),
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline::Fragment;
    use crate::infrastructure::embedding::HashingEmbeddingProvider;

    async fn index_of(texts: &[&str]) -> InMemoryVectorIndex {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbeddingProvider::default());
        let inputs: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed(&inputs).await.unwrap();

        let records = texts
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, embedding))| StoredRecord {
                fragment: Fragment::new(format!("f{i}"), *text),
                embedding,
            })
            .collect();

        InMemoryVectorIndex::new(PipelineId::new(1).unwrap(), records, embedder)
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_ranks_matching_fragment_first() {
        let index = index_of(&[
            "Tokio is an asynchronous runtime.",
            "Serde serializes data structures.",
            "Axum routes requests with tower services.",
        ])
        .await;

        let hits = index.search("How does serde serialize data?", 2).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].fragment.id, "f1");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_search_returns_at_most_available() {
        let index = index_of(&["only fragment"]).await;

        let hits = index.search("anything", 5).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(index.fragment_count(), 1);
    }
}
