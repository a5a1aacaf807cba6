//! PDF document parser

use async_trait::async_trait;

use crate::domain::ingestion::{DocumentMetadata, DocumentParser, ParsedDocument, ParserInput};
use crate::domain::DomainError;

/// Extracts the text layer of a PDF. Scanned documents without a text layer
/// produce empty content and are rejected further up.
#[derive(Debug, Clone, Default)]
pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        Self
    }

    /// Joins hyphenated line breaks and collapses runs of blank lines.
    fn normalize(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut blank_run = 0;

        for line in text.lines().map(str::trim_end) {
            if line.trim().is_empty() {
                blank_run += 1;
                continue;
            }

            if !out.is_empty() {
                if out.ends_with('-') && blank_run == 0 {
                    out.pop();
                } else if blank_run > 0 {
                    out.push_str("\n\n");
                } else {
                    out.push('\n');
                }
            }

            out.push_str(line);
            blank_run = 0;
        }

        out
    }
}

#[async_trait]
impl DocumentParser for PdfParser {
    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &["application/pdf"]
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, DomainError> {
        let bytes = input.content.as_bytes().to_vec();

        if !bytes.starts_with(b"%PDF") {
            return Err(DomainError::invalid_input(
                "document is not a PDF (missing %PDF header)",
            ));
        }

        let extraction = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
        })
        .await
        .map_err(|err| DomainError::invalid_input(format!("PDF extraction aborted: {err}")))?
        .map_err(|err| DomainError::invalid_input(format!("Failed to extract text from PDF: {err}")))?;

        let mut metadata = DocumentMetadata::new().with_mime_type("application/pdf");

        if let Some(filename) = input.filename {
            metadata = metadata.with_source(filename);
        }

        Ok(ParsedDocument::new(Self::normalize(&extraction), metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_joins_hyphenation_and_paragraphs() {
        let raw = "Retrieval aug-\nmented generation\n\n\n\nSecond para   \n";
        assert_eq!(
            PdfParser::normalize(raw),
            "Retrieval augmented generation\n\nSecond para"
        );
    }

    #[tokio::test]
    async fn test_rejects_non_pdf_bytes() {
        let parser = PdfParser::new();
        let input = ParserInput::from_bytes(b"plain text pretending".to_vec()).with_filename("x.pdf");

        let result = parser.parse(input).await;

        assert!(matches!(result, Err(DomainError::InvalidInput { .. })));
    }

    #[test]
    fn test_supports_pdf_only() {
        let parser = PdfParser::new();
        assert!(parser.supports_file("Report.PDF"));
        assert!(parser.supports_mime("application/pdf"));
        assert!(!parser.supports_file("notes.txt"));
    }
}
