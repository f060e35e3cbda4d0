pub mod types;
pub mod chunker;
pub mod embedder;
pub mod vectordb;
pub mod cache;

pub use types::*;
pub use chunker::*;
pub use embedder::*;
pub use vectordb::*;
pub use cache::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("No chunks to index: the document set has no usable text")]
    EmptyIndex,

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Invalid index configuration: {0}")]
    InvalidConfig(String),

    #[error("Index cache lock poisoned")]
    LockPoisoned,
}
