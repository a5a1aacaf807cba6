//! Plain text document parser

use async_trait::async_trait;

use crate::domain::ingestion::{DocumentMetadata, DocumentParser, ParsedDocument, ParserInput};
use crate::domain::DomainError;

/// Parser for plain text files
#[derive(Debug, Clone, Default)]
pub struct PlainTextParser;

impl PlainTextParser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentParser for PlainTextParser {
    fn supported_extensions(&self) -> &[&str] {
        &["txt", "text"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &["text/plain"]
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, DomainError> {
        let content = input.content.as_text()?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let mut metadata = DocumentMetadata::new().with_mime_type("text/plain");

        if let Some(filename) = input.filename {
            metadata = metadata.with_source(filename);
        }

        Ok(ParsedDocument::new(content, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_bytes_content() {
        let parser = PlainTextParser::new();
        let input = ParserInput::from_bytes(b"Hello from bytes".to_vec()).with_filename("a.txt");

        let result = parser.parse(input).await.unwrap();

        assert_eq!(result.content, "Hello from bytes");
        assert_eq!(result.metadata.source.as_deref(), Some("a.txt"));
        assert_eq!(result.metadata.mime_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_strips_byte_order_mark() {
        let parser = PlainTextParser::new();
        let result = parser
            .parse(ParserInput::from_text("\u{feff}body"))
            .await
            .unwrap();

        assert_eq!(result.content, "body");
    }

    #[tokio::test]
    async fn test_rejects_binary_content() {
        let parser = PlainTextParser::new();
        let result = parser.parse(ParserInput::from_bytes(vec![0xff, 0x00, 0xfe])).await;

        assert!(matches!(result, Err(DomainError::InvalidInput { .. })));
    }
}
