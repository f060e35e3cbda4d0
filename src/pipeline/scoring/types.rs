use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OracleError;
use crate::models::{Category, ChunkId};
use crate::pipeline::index::RetrievedChunk;
use crate::rubric::Principle;

/// The principle being judged, as sent to the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipleBrief {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub probe: String,
}

impl From<&Principle> for PrincipleBrief {
    fn from(p: &Principle) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            category: p.category,
            probe: p.probe.clone(),
        }
    }
}

/// One chunk of the evidence bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub chunk_id: ChunkId,
    pub document_id: Uuid,
    pub text: String,
}

impl From<&RetrievedChunk> for EvidenceItem {
    fn from(r: &RetrievedChunk) -> Self {
        Self {
            chunk_id: r.chunk.id.clone(),
            document_id: r.chunk.document_id,
            text: r.chunk.text.clone(),
        }
    }
}

/// Input to one oracle invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub principle: PrincipleBrief,
    pub evidence: Vec<EvidenceItem>,
    /// Corrective instruction after a structurally invalid response.
    pub correction: Option<String>,
}

/// External reasoning capability: returns the raw response text for a
/// scoring request. Parsing and validation happen on our side.
pub trait ReasoningOracle: Send + Sync {
    fn invoke(
        &self,
        request: &OracleRequest,
    ) -> impl Future<Output = Result<String, OracleError>> + Send;
}
