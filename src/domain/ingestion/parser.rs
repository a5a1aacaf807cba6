//! Document parser trait and types

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Content input for document parsing
#[derive(Debug, Clone)]
pub enum ParserContent {
    /// Text content (already decoded)
    Text(String),
    /// Binary content (needs decoding)
    Bytes(Vec<u8>),
}

impl ParserContent {
    /// Get content as text, decoding bytes as UTF-8 if necessary
    pub fn as_text(&self) -> Result<String, DomainError> {
        match self {
            Self::Text(s) => Ok(s.clone()),
            Self::Bytes(b) => String::from_utf8(b.clone())
                .map_err(|e| DomainError::invalid_input(format!("Invalid UTF-8: {}", e))),
        }
    }

    /// Raw bytes of the content
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }
}

/// Input for document parsing
#[derive(Debug, Clone)]
pub struct ParserInput {
    pub content: ParserContent,
    /// Optional filename for type detection
    pub filename: Option<String>,
}

impl ParserInput {
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            content: ParserContent::Text(content.into()),
            filename: None,
        }
    }

    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: ParserContent::Bytes(content.into()),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Metadata extracted from a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    /// Source file or URL
    pub source: Option<String>,
    pub mime_type: Option<String>,
}

impl DocumentMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Result of parsing a document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Extracted text content
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl ParsedDocument {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// Trait for document parsers
#[async_trait]
pub trait DocumentParser: Send + Sync + Debug {
    /// Get supported file extensions (e.g., ["txt", "text"])
    fn supported_extensions(&self) -> &[&str];

    /// Get supported MIME types (e.g., ["text/plain"])
    fn supported_mime_types(&self) -> &[&str];

    /// Parse a document and extract text content and metadata
    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, DomainError>;

    /// Check if this parser supports a given filename
    fn supports_file(&self, filename: &str) -> bool {
        let Some((_, ext)) = filename.rsplit_once('.') else {
            return false;
        };

        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Check if this parser supports a given MIME type
    fn supports_mime(&self, mime: &str) -> bool {
        self.supported_mime_types()
            .iter()
            .any(|m| mime.starts_with(*m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TextOnly;

    #[async_trait]
    impl DocumentParser for TextOnly {
        fn supported_extensions(&self) -> &[&str] {
            &["txt"]
        }

        fn supported_mime_types(&self) -> &[&str] {
            &["text/plain"]
        }

        async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, DomainError> {
            Ok(ParsedDocument::new(
                input.content.as_text()?,
                DocumentMetadata::new(),
            ))
        }
    }

    #[test]
    fn test_parser_content_invalid_utf8() {
        let content = ParserContent::Bytes(vec![0xff, 0xfe]);
        assert!(matches!(
            content.as_text(),
            Err(DomainError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_supports_file_by_extension() {
        assert!(TextOnly.supports_file("notes.TXT"));
        assert!(!TextOnly.supports_file("report.pdf"));
        assert!(!TextOnly.supports_file("txt"));
    }

    #[test]
    fn test_supports_mime_with_parameters() {
        assert!(TextOnly.supports_mime("text/plain; charset=utf-8"));
        assert!(!TextOnly.supports_mime("application/pdf"));
    }
}
