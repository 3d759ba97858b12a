//! Embedding document building and a local reference [`VectorSearch`]
//! (spec.md §4.5).

pub mod document;
pub mod embedding;
pub mod local_provider;

pub use document::{build_documents, EmbeddableDocument};
pub use embedding::{embed_repo, EmbeddingReport};
pub use local_provider::{LocalHashingConfig, LocalHashingVectorSearch};
