mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, EmbeddingBackend, EmbeddingConfig, GeneratorBackend,
    GeneratorConfig, IngestionConfig, LogFormat, LoggingConfig, RetrievalConfig, ServerConfig,
    StorageConfig, TimeoutConfig,
};
