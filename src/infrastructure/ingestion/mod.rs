//! Document ingestion: parsers, chunkers and the processor that ties them together

pub mod chunkers;
pub mod parsers;
mod processor;

pub use chunkers::RecursiveChunker;
pub use parsers::{MarkdownParser, PdfParser, PlainTextParser};
pub use processor::{ChunkingDocumentProcessor, DEFAULT_MAX_DOCUMENT_BYTES};
