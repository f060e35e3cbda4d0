pub mod types;
pub mod sanitize;
pub mod plain_text;
pub mod pdf;
pub mod docx;
pub mod orchestrator;

pub use types::*;
pub use sanitize::*;
pub use orchestrator::*;

use thiserror::Error;

/// Per-document extraction failure. Never fatal to a run: the document is
/// marked failed and excluded from the evidence index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt file: {0}")]
    CorruptFile(String),
}
