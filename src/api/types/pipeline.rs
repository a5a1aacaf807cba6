//! Request and response bodies for the pipeline endpoints

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::{
    DeletionSummary, IngestionSummary, PipelineId, QueryAnswer, ScoredFragment, SourceMetadata,
};

/// Returned by create and add-data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionResponse {
    pub pipeline_id: u64,
    /// Fragments indexed from this upload
    pub fragments: usize,
}

impl From<IngestionSummary> for IngestionResponse {
    fn from(summary: IngestionSummary) -> Self {
        Self {
            pipeline_id: summary.pipeline_id.value(),
            fragments: summary.fragments_indexed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFragment {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub metadata: SourceMetadata,
}

impl From<ScoredFragment> for SourceFragment {
    fn from(hit: ScoredFragment) -> Self {
        Self {
            id: hit.fragment.id,
            text: hit.fragment.text,
            score: hit.score,
            metadata: hit.fragment.metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceFragment>,
}

impl From<QueryAnswer> for QueryResponse {
    fn from(answer: QueryAnswer) -> Self {
        Self {
            answer: answer.answer,
            sources: answer.sources.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub pipeline_id: u64,
    pub deleted: bool,
    /// False when on-disk data was left for a later `reclaim`
    pub storage_reclaimed: bool,
}

impl From<DeletionSummary> for DeleteResponse {
    fn from(summary: DeletionSummary) -> Self {
        Self {
            pipeline_id: summary.pipeline_id.value(),
            deleted: true,
            storage_reclaimed: summary.storage_reclaimed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineListResponse {
    pub pipelines: Vec<u64>,
    pub total: usize,
}

impl From<Vec<PipelineId>> for PipelineListResponse {
    fn from(ids: Vec<PipelineId>) -> Self {
        Self {
            total: ids.len(),
            pipelines: ids.into_iter().map(u64::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline::Fragment;

    #[test]
    fn test_query_response_keeps_order_and_scores() {
        let answer = QueryAnswer {
            answer: "Paris".to_string(),
            sources: vec![
                ScoredFragment {
                    fragment: Fragment::new("f1", "The Eiffel Tower is in Paris."),
                    score: 0.9,
                },
                ScoredFragment {
                    fragment: Fragment::new("f2", "Paris is in France."),
                    score: 0.4,
                },
            ],
        };

        let json = serde_json::to_value(QueryResponse::from(answer)).unwrap();

        assert_eq!(json["answer"], "Paris");
        assert_eq!(json["sources"][0]["id"], "f1");
        assert_eq!(json["sources"][1]["id"], "f2");
        assert_eq!(json["sources"][0]["metadata"]["chunk_index"], 0);
    }

    #[test]
    fn test_list_response() {
        let ids = vec![PipelineId::new(3).unwrap(), PipelineId::new(42).unwrap()];
        let response = PipelineListResponse::from(ids);

        assert_eq!(response.pipelines, vec![3, 42]);
        assert_eq!(response.total, 2);
    }
}
