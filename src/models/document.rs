use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocumentStatus, SourceFormat};
use crate::pipeline::extraction::types::ExtractedText;

/// An ingested source document for one company.
///
/// The id is derived from the content hash, so the same bytes always map to
/// the same document. Once `status` is `Extracted` the document is immutable;
/// re-extraction is never attempted.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub company_id: String,
    /// Format label as supplied by ingestion (kept for failure reports).
    pub declared_format: String,
    /// `None` when the declared label is not a supported format.
    pub format: Option<SourceFormat>,
    pub content_hash: String,
    pub raw_bytes: Arc<[u8]>,
    pub ingested_at: DateTime<Utc>,
    pub status: DocumentStatus,
    pub extracted: Option<Arc<ExtractedText>>,
    pub failure: Option<String>,
}

impl Document {
    pub fn is_usable(&self) -> bool {
        self.status == DocumentStatus::Extracted && self.extracted.is_some()
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            company_id: self.company_id.clone(),
            declared_format: self.declared_format.clone(),
            status: self.status,
            byte_len: self.raw_bytes.len(),
            failure: self.failure.clone(),
        }
    }
}

/// Serializable view of a document's ingestion/extraction state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub company_id: String,
    pub declared_format: String,
    pub status: DocumentStatus,
    pub byte_len: usize,
    pub failure: Option<String>,
}

/// A document left out of an analysis run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedDocument {
    pub document_id: Uuid,
    pub reason: String,
}
