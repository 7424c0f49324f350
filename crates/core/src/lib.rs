pub mod boilerplate;
pub mod chunking;
pub mod cleaner;
pub mod embeddings;
pub mod error;
pub mod eval;
pub mod fingerprint;
pub mod index;
pub mod loader;
pub mod manager;
pub mod models;
pub mod query;

#[cfg(test)]
pub(crate) mod testutil;

pub use boilerplate::{BoilerplateSet, CorpusProfile};
pub use chunking::{chunk_id, plan_chunks};
pub use cleaner::clean_page;
pub use embeddings::{Embedder, OllamaEmbedder};
pub use error::{IngestError, QueryError};
pub use eval::{export_eval_records, write_eval_records, ContextRecord, EvalRecord};
pub use fingerprint::IndexFingerprint;
pub use index::{EmbeddedChunk, Retrieved, VectorIndex};
pub use loader::{
    discover_document_files, extract_raw_pages, load_corpus, LoadReport, SkippedDocument,
};
pub use manager::{BuildReport, IndexManager, PersistedIndexState};
pub use models::{
    BoilerplateOptions, Chunk, ChunkingOptions, CleanedPage, CleaningConfig, CleaningStats,
    IngestionOptions, RawPage,
};
pub use query::{Answer, LanguageModel, OpenAiCompatibleLlm, QueryEngine, SourceRef};
