//! Document processing contract

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::pipeline::Fragment;
use crate::domain::DomainError;

/// An uploaded document as received from a caller.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Turns an uploaded document into indexable fragments.
///
/// Unsupported or empty documents fail with `InvalidInput`.
#[async_trait]
pub trait DocumentProcessor: Send + Sync + Debug {
    async fn process(&self, upload: DocumentUpload) -> Result<Vec<Fragment>, DomainError>;
}
