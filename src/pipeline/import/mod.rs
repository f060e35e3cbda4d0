pub mod format;
pub mod hash;
pub mod registry;

pub use format::*;
pub use hash::*;
pub use registry::*;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImportError {
    #[error("Company id must not be empty")]
    CompanyRequired,

    #[error("Document not found: {document_id} (company {company_id})")]
    DocumentNotFound { company_id: String, document_id: Uuid },

    #[error("Document registry lock poisoned")]
    LockPoisoned,
}
