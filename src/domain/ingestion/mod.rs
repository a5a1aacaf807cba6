//! Document ingestion domain types and traits
//!
//! - `DocumentParser` extracts text from an uploaded file
//! - `ChunkingStrategy` splits text into chunks
//! - `DocumentProcessor` runs both and produces fragments

pub mod chunker;
pub mod parser;
pub mod processor;

pub use chunker::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
pub use parser::{DocumentMetadata, DocumentParser, ParsedDocument, ParserContent, ParserInput};
pub use processor::{DocumentProcessor, DocumentUpload};
