//! Parse-then-chunk document processor

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ingestion::{
    ChunkingConfig, ChunkingStrategy, DocumentParser, DocumentProcessor, DocumentUpload,
    ParserInput,
};
use crate::domain::pipeline::{Fragment, SourceMetadata};
use crate::domain::DomainError;

use super::chunkers::RecursiveChunker;
use super::parsers::{MarkdownParser, PdfParser, PlainTextParser};

/// Default upper bound on an uploaded document (25 MiB)
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 25 * 1024 * 1024;

/// Picks a parser by filename or content type, extracts the text and splits
/// it into fragments.
#[derive(Debug)]
pub struct ChunkingDocumentProcessor {
    parsers: Vec<Arc<dyn DocumentParser>>,
    chunker: Arc<dyn ChunkingStrategy>,
    chunking: ChunkingConfig,
    max_document_bytes: usize,
}

impl ChunkingDocumentProcessor {
    pub fn new(
        parsers: Vec<Arc<dyn DocumentParser>>,
        chunker: Arc<dyn ChunkingStrategy>,
        chunking: ChunkingConfig,
    ) -> Result<Self, DomainError> {
        chunking.validate()?;

        Ok(Self {
            parsers,
            chunker,
            chunking,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        })
    }

    /// Plain text, Markdown and PDF parsers with the recursive chunker.
    pub fn with_defaults(chunking: ChunkingConfig) -> Result<Self, DomainError> {
        Self::new(
            vec![
                Arc::new(PlainTextParser::new()),
                Arc::new(MarkdownParser::new()),
                Arc::new(PdfParser::new()),
            ],
            Arc::new(RecursiveChunker::new()),
            chunking,
        )
    }

    pub fn with_max_document_bytes(mut self, max: usize) -> Self {
        self.max_document_bytes = max;
        self
    }

    fn select_parser(&self, upload: &DocumentUpload) -> Option<&Arc<dyn DocumentParser>> {
        if let Some(filename) = upload.filename.as_deref() {
            if let Some(parser) = self.parsers.iter().find(|p| p.supports_file(filename)) {
                return Some(parser);
            }
        }

        let mime = upload
            .content_type
            .clone()
            .filter(|m| !m.starts_with("application/octet-stream"))
            .or_else(|| {
                upload
                    .filename
                    .as_deref()
                    .and_then(|f| mime_guess::from_path(f).first_raw().map(str::to_string))
            })?;

        self.parsers.iter().find(|p| p.supports_mime(&mime))
    }
}

#[async_trait]
impl DocumentProcessor for ChunkingDocumentProcessor {
    async fn process(&self, upload: DocumentUpload) -> Result<Vec<Fragment>, DomainError> {
        if upload.is_empty() {
            return Err(DomainError::invalid_input("uploaded document is empty"));
        }

        if upload.len() > self.max_document_bytes {
            return Err(DomainError::invalid_input(format!(
                "uploaded document is {} bytes, limit is {}",
                upload.len(),
                self.max_document_bytes
            )));
        }

        let parser = self.select_parser(&upload).ok_or_else(|| {
            DomainError::invalid_input(format!(
                "unsupported document type: {}",
                upload.filename.as_deref().unwrap_or("<unnamed>")
            ))
        })?;

        let mut input = ParserInput::from_bytes(upload.bytes);
        if let Some(filename) = upload.filename {
            input = input.with_filename(filename);
        }

        let parsed = parser.parse(input).await?;

        if parsed.content.trim().is_empty() {
            return Err(DomainError::invalid_input(
                "document contains no extractable text",
            ));
        }

        let chunks = self.chunker.chunk(&parsed.content, &self.chunking)?;

        debug!(
            source = ?parsed.metadata.source,
            chunker = self.chunker.name(),
            chunks = chunks.len(),
            "Document split into fragments"
        );

        Ok(chunks
            .into_iter()
            .map(|chunk| {
                let metadata = SourceMetadata {
                    source: parsed.metadata.source.clone(),
                    mime_type: parsed.metadata.mime_type.clone(),
                    chunk_index: chunk.metadata.chunk_index,
                    total_chunks: chunk.metadata.total_chunks,
                    offset_start: chunk.metadata.offset_start,
                    offset_end: chunk.metadata.offset_end,
                };

                Fragment::new(Uuid::new_v4().to_string(), chunk.content).with_metadata(metadata)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> ChunkingDocumentProcessor {
        ChunkingDocumentProcessor::with_defaults(ChunkingConfig::new(60, 10)).unwrap()
    }

    #[tokio::test]
    async fn test_text_document_becomes_fragments() {
        let upload = DocumentUpload::new(
            "notes.txt",
            "Alpha paragraph about rust.\n\nBeta paragraph about storage engines and caches.",
        );

        let fragments = processor().process(upload).await.unwrap();

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].metadata.source.as_deref(), Some("notes.txt"));
        assert_eq!(fragments[1].metadata.chunk_index, 1);
        assert_eq!(fragments[1].metadata.total_chunks, 2);
        assert_ne!(fragments[0].id, fragments[1].id);
    }

    #[tokio::test]
    async fn test_content_type_used_without_extension() {
        let upload = DocumentUpload::new("README", "# Title\n\nBody text.")
            .with_content_type("text/markdown");

        let fragments = processor().process(upload).await.unwrap();

        assert_eq!(
            fragments[0].metadata.mime_type.as_deref(),
            Some("text/markdown")
        );
    }

    #[tokio::test]
    async fn test_rejects_empty_upload() {
        let result = processor()
            .process(DocumentUpload::new("empty.txt", Vec::new()))
            .await;

        assert!(matches!(result, Err(DomainError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_rejects_whitespace_only_document() {
        let result = processor()
            .process(DocumentUpload::new("blank.txt", "   \n\n  "))
            .await;

        assert!(matches!(result, Err(DomainError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_type() {
        let result = processor()
            .process(DocumentUpload::new("image.png", vec![0x89, 0x50, 0x4e, 0x47]))
            .await;

        assert!(matches!(result, Err(DomainError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_rejects_oversized_upload() {
        let processor = processor().with_max_document_bytes(8);
        let result = processor
            .process(DocumentUpload::new("big.txt", "more than eight bytes"))
            .await;

        assert!(matches!(result, Err(DomainError::InvalidInput { .. })));
    }

    #[test]
    fn test_invalid_chunking_rejected() {
        let result = ChunkingDocumentProcessor::with_defaults(ChunkingConfig::new(10, 10));
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
