//! Domain layer - pipeline types and the contracts of their collaborators

pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod llm;
pub mod pipeline;
pub mod registry;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use error::DomainError;
pub use generation::AnswerGenerator;
pub use ingestion::{
    Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy, DocumentMetadata, DocumentParser,
    DocumentProcessor, DocumentUpload, ParsedDocument, ParserContent, ParserInput,
};
pub use llm::{FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage};
pub use pipeline::{
    DeletionSummary, Fragment, IngestionSummary, PipelineId, QueryAnswer, RetrievalChain,
    ScoredFragment, SourceMetadata,
};
pub use registry::RegistryIndex;
pub use vector_store::{StorageHandle, VectorIndex, VectorStorage};
