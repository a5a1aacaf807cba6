//! Indexed text fragments

use serde::{Deserialize, Serialize};

/// Where a fragment came from inside its source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Original filename of the uploaded document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Position of the fragment among the document's chunks
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Byte offsets into the extracted document text
    pub offset_start: usize,
    pub offset_end: usize,
}

/// A chunk of document text stored in a pipeline's vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: SourceMetadata,
}

impl Fragment {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: SourceMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A fragment returned by similarity search, with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFragment {
    pub fragment: Fragment,
    pub score: f32,
}
