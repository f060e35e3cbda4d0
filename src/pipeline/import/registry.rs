use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use super::hash::{content_hash, document_id_for};
use super::ImportError;
use crate::models::{Document, DocumentStatus, DocumentSummary, SourceFormat};
use crate::pipeline::extraction::{ExtractedText, ExtractionError};

#[derive(Debug, Default)]
struct CompanyDocuments {
    /// Bumped whenever the document set changes.
    generation: u64,
    documents: BTreeMap<Uuid, Document>,
}

/// Outcome of `DocumentRegistry::ingest`.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub document: Document,
    /// `true` when identical bytes were already registered for the company.
    pub already_present: bool,
}

/// Point-in-time view of part of a company's document set.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub generation: u64,
    /// Requested documents, ordered by id.
    pub documents: Vec<Document>,
}

/// In-process store of ingested documents, partitioned by company.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    companies: RwLock<HashMap<String, CompanyDocuments>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register raw bytes for a company. Idempotent per content: identical
    /// bytes return the existing document without touching the generation.
    pub fn ingest(
        &self,
        company_id: &str,
        format_label: &str,
        bytes: &[u8],
    ) -> Result<IngestResult, ImportError> {
        let company_id = company_id.trim();
        if company_id.is_empty() {
            return Err(ImportError::CompanyRequired);
        }

        let hash = content_hash(bytes);
        let id = document_id_for(&hash);

        let mut companies = self.companies.write().map_err(|_| ImportError::LockPoisoned)?;
        let company = companies.entry(company_id.to_string()).or_default();

        if let Some(existing) = company.documents.get(&id) {
            tracing::debug!(
                company_id,
                document_id = %id,
                "Identical document already registered"
            );
            return Ok(IngestResult {
                document: existing.clone(),
                already_present: true,
            });
        }

        let document = Document {
            id,
            company_id: company_id.to_string(),
            declared_format: format_label.trim().to_string(),
            format: SourceFormat::from_label(format_label),
            content_hash: hash,
            raw_bytes: Arc::from(bytes),
            ingested_at: Utc::now(),
            status: DocumentStatus::Pending,
            extracted: None,
            failure: None,
        };

        company.documents.insert(id, document.clone());
        company.generation += 1;

        tracing::info!(
            company_id,
            document_id = %id,
            format = format_label,
            bytes = bytes.len(),
            generation = company.generation,
            "Document ingested"
        );

        Ok(IngestResult {
            document,
            already_present: false,
        })
    }

    /// Remove a document. Bumps the generation so indexes built over the old
    /// set are no longer served.
    pub fn remove(&self, company_id: &str, document_id: &Uuid) -> Result<(), ImportError> {
        let mut companies = self.companies.write().map_err(|_| ImportError::LockPoisoned)?;
        let company = companies
            .get_mut(company_id)
            .filter(|c| c.documents.contains_key(document_id))
            .ok_or_else(|| ImportError::DocumentNotFound {
                company_id: company_id.to_string(),
                document_id: *document_id,
            })?;

        company.documents.remove(document_id);
        company.generation += 1;

        tracing::info!(
            company_id,
            document_id = %document_id,
            generation = company.generation,
            "Document removed"
        );
        Ok(())
    }

    pub fn get(&self, company_id: &str, document_id: &Uuid) -> Result<Option<Document>, ImportError> {
        let companies = self.companies.read().map_err(|_| ImportError::LockPoisoned)?;
        Ok(companies
            .get(company_id)
            .and_then(|c| c.documents.get(document_id))
            .cloned())
    }

    /// Current document-set generation (0 for unknown companies).
    pub fn generation(&self, company_id: &str) -> Result<u64, ImportError> {
        let companies = self.companies.read().map_err(|_| ImportError::LockPoisoned)?;
        Ok(companies.get(company_id).map_or(0, |c| c.generation))
    }

    pub fn list(&self, company_id: &str) -> Result<Vec<DocumentSummary>, ImportError> {
        let companies = self.companies.read().map_err(|_| ImportError::LockPoisoned)?;
        Ok(companies
            .get(company_id)
            .map(|c| c.documents.values().map(Document::summary).collect())
            .unwrap_or_default())
    }

    /// Resolve the requested documents together with the current generation.
    /// Every id must belong to the company.
    pub fn snapshot(
        &self,
        company_id: &str,
        document_ids: &[Uuid],
    ) -> Result<DocumentSnapshot, ImportError> {
        let companies = self.companies.read().map_err(|_| ImportError::LockPoisoned)?;
        let not_found = |id: &Uuid| ImportError::DocumentNotFound {
            company_id: company_id.to_string(),
            document_id: *id,
        };

        let company = match (companies.get(company_id), document_ids.first()) {
            (Some(company), _) => company,
            (None, Some(first)) => return Err(not_found(first)),
            (None, None) => {
                return Ok(DocumentSnapshot {
                    generation: 0,
                    documents: Vec::new(),
                })
            }
        };

        let mut ids = document_ids.to_vec();
        ids.sort();
        ids.dedup();

        let documents = ids
            .iter()
            .map(|id| company.documents.get(id).cloned().ok_or_else(|| not_found(id)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocumentSnapshot {
            generation: company.generation,
            documents,
        })
    }

    /// Store the result of extracting a pending document.
    ///
    /// Extracted documents are immutable: a second call leaves them as they
    /// are and returns the stored state. Does not change the generation.
    pub fn record_extraction(
        &self,
        company_id: &str,
        document_id: &Uuid,
        result: Result<ExtractedText, ExtractionError>,
    ) -> Result<Document, ImportError> {
        let mut companies = self.companies.write().map_err(|_| ImportError::LockPoisoned)?;
        let document = companies
            .get_mut(company_id)
            .and_then(|c| c.documents.get_mut(document_id))
            .ok_or_else(|| ImportError::DocumentNotFound {
                company_id: company_id.to_string(),
                document_id: *document_id,
            })?;

        if document.status == DocumentStatus::Pending {
            match result {
                Ok(extracted) => {
                    document.status = DocumentStatus::Extracted;
                    document.extracted = Some(Arc::new(extracted));
                }
                Err(e) => {
                    tracing::warn!(
                        company_id,
                        document_id = %document_id,
                        error = %e,
                        "Document extraction failed"
                    );
                    document.status = DocumentStatus::Failed;
                    document.failure = Some(e.to_string());
                }
            }
        }

        Ok(document.clone())
    }
}
