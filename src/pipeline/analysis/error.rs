use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::db::DatabaseError;
use crate::pipeline::import::ImportError;
use crate::pipeline::index::IndexError;
use crate::pipeline::scoring::OracleError;
use crate::rubric::RubricError;

/// Run-level failure. Per-document and per-principle failures never surface
/// here; they end up in `excluded_documents` and unscored outcomes.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No usable documents: the evidence index would be empty")]
    EmptyIndex,

    #[error("Company id is required")]
    CompanyRequired,

    #[error("Document {document_id} not found for company {company_id}")]
    DocumentNotFound { company_id: String, document_id: Uuid },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Evaluation store error: {0}")]
    Store(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rubric error: {0}")]
    Rubric(#[from] RubricError),

    #[error("Evidence index error: {0}")]
    Index(IndexError),

    #[error("Oracle setup failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Shared state lock poisoned")]
    StatePoisoned,

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<IndexError> for AnalysisError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::EmptyIndex => Self::EmptyIndex,
            IndexError::LockPoisoned => Self::StatePoisoned,
            other => Self::Index(other),
        }
    }
}

impl From<ImportError> for AnalysisError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::CompanyRequired => Self::CompanyRequired,
            ImportError::DocumentNotFound {
                company_id,
                document_id,
            } => Self::DocumentNotFound {
                company_id,
                document_id,
            },
            ImportError::LockPoisoned => Self::StatePoisoned,
        }
    }
}

impl From<ConfigError> for AnalysisError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AnalysisError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
