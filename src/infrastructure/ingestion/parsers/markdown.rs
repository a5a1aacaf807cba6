//! Markdown document parser

use async_trait::async_trait;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};

use crate::domain::ingestion::{DocumentMetadata, DocumentParser, ParsedDocument, ParserInput};
use crate::domain::DomainError;

/// Parser for Markdown files. Markup is dropped and every block becomes its
/// own paragraph so chunk boundaries follow the document structure.
#[derive(Debug, Clone, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }

    fn end_block(text: &mut String) {
        let trimmed = text.trim_end_matches([' ', '\n']).len();
        text.truncate(trimmed);

        if !text.is_empty() {
            text.push_str("\n\n");
        }
    }

    fn extract_text_and_title(markdown: &str) -> (String, Option<String>) {
        let mut text = String::new();
        let mut title: Option<String> = None;
        let mut heading: Option<(HeadingLevel, String)> = None;

        for event in Parser::new(markdown) {
            match event {
                Event::Start(Tag::Heading(level, ..)) => {
                    Self::end_block(&mut text);
                    heading = Some((level, String::new()));
                }
                Event::End(Tag::Heading(..)) => {
                    if let Some((level, content)) = heading.take() {
                        let content = content.trim();

                        if level == HeadingLevel::H1 && title.is_none() {
                            title = Some(content.to_string());
                        }

                        text.push_str(content);
                        Self::end_block(&mut text);
                    }
                }
                Event::Text(t) | Event::Code(t) => match heading {
                    Some((_, ref mut content)) => content.push_str(&t),
                    None => text.push_str(&t),
                },
                Event::SoftBreak | Event::HardBreak => match heading {
                    Some((_, ref mut content)) => content.push(' '),
                    None => text.push('\n'),
                },
                Event::Start(Tag::Item) => {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                    text.push_str("- ");
                }
                Event::End(Tag::Item) => {
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                Event::End(Tag::Paragraph)
                | Event::End(Tag::CodeBlock(_))
                | Event::End(Tag::List(_))
                | Event::End(Tag::BlockQuote) => Self::end_block(&mut text),
                _ => {}
            }
        }

        (text.trim().to_string(), title)
    }
}

#[async_trait]
impl DocumentParser for MarkdownParser {
    fn supported_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supported_mime_types(&self) -> &[&str] {
        &["text/markdown", "text/x-markdown"]
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, DomainError> {
        let raw_content = input.content.as_text()?;
        let (content, title) = Self::extract_text_and_title(&raw_content);

        let mut metadata = DocumentMetadata::new().with_mime_type("text/markdown");

        if let Some(t) = title {
            metadata = metadata.with_title(t);
        }

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
    async fn test_headings_become_paragraphs() {
        let parser = MarkdownParser::new();
        let input = ParserInput::from_text("# Hello World\n\nThis is a paragraph.\n\n## Next\n\nMore.");

        let result = parser.parse(input).await.unwrap();

        assert_eq!(
            result.content,
            "Hello World\n\nThis is a paragraph.\n\nNext\n\nMore."
        );
        assert_eq!(result.metadata.title.as_deref(), Some("Hello World"));
    }

    #[tokio::test]
    async fn test_formatting_is_stripped() {
        let parser = MarkdownParser::new();
        let input = ParserInput::from_text("**bold** and *italic* with `code`");

        let result = parser.parse(input).await.unwrap();

        assert_eq!(result.content, "bold and italic with code");
    }

    #[tokio::test]
    async fn test_list_items_stay_on_own_lines() {
        let parser = MarkdownParser::new();
        let input = ParserInput::from_text("- Item 1\n- Item 2\n- Item 3");

        let result = parser.parse(input).await.unwrap();

        assert_eq!(result.content.lines().count(), 3);
        assert!(result.content.contains("- Item 2"));
    }

    #[tokio::test]
    async fn test_no_title_without_h1() {
        let parser = MarkdownParser::new();
        let input = ParserInput::from_text("## Secondary Heading\n\nNo H1 here.");

        let result = parser.parse(input).await.unwrap();

        assert!(result.metadata.title.is_none());
    }
}
