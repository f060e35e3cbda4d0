use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Evaluation, ExcludedDocument, Fingerprint, Recommendation};

/// Evaluate a company against the rubric using the given documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub company_id: String,
    pub document_ids: Vec<Uuid>,
    /// Re-score even when an evaluation for the same fingerprint exists,
    /// replacing the stored record.
    #[serde(default)]
    pub force_refresh: bool,
}

impl AnalysisRequest {
    pub fn new(company_id: impl Into<String>, document_ids: Vec<Uuid>) -> Self {
        Self {
            company_id: company_id.into(),
            document_ids,
            force_refresh: false,
        }
    }

    pub fn with_force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub evaluation: Evaluation,
    /// `true` when a stored evaluation was returned without scoring.
    pub reused: bool,
    /// Requested documents that contributed no evidence, with the reason.
    pub excluded_documents: Vec<ExcludedDocument>,
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalysisEvent {
    Started {
        company_id: String,
        documents: usize,
    },
    Reused {
        fingerprint: Fingerprint,
    },
    DocumentExcluded {
        document_id: Uuid,
        reason: String,
    },
    ExtractionFinished {
        usable: usize,
        excluded: usize,
    },
    IndexReady {
        chunks: usize,
        reused: bool,
        principles: usize,
    },
    PrincipleFinished {
        principle_id: String,
        scored: bool,
        completed: usize,
        total: usize,
    },
    Completed {
        recommendation: Recommendation,
        duration_ms: u64,
    },
}

/// Pollable state of a background run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Extracting,
    Indexing,
    Scoring { completed: usize, total: usize },
    Completed,
    Failed { error: String },
    Cancelled,
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. } | Self::Cancelled)
    }

    /// Status implied by a progress event, if it changes the status.
    pub fn after(event: &AnalysisEvent) -> Option<RunStatus> {
        match event {
            AnalysisEvent::Started { .. } => Some(Self::Extracting),
            AnalysisEvent::ExtractionFinished { .. } => Some(Self::Indexing),
            AnalysisEvent::IndexReady { principles, .. } => Some(Self::Scoring {
                completed: 0,
                total: *principles,
            }),
            AnalysisEvent::PrincipleFinished {
                completed, total, ..
            } => Some(Self::Scoring {
                completed: *completed,
                total: *total,
            }),
            AnalysisEvent::Reused { .. }
            | AnalysisEvent::DocumentExcluded { .. }
            | AnalysisEvent::Completed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_to_no_refresh() {
        let request: AnalysisRequest =
            serde_json::from_str(r#"{"company_id": "acme", "document_ids": []}"#).unwrap();
        assert!(!request.force_refresh);
        assert!(AnalysisRequest::new("acme", Vec::new()).with_force_refresh().force_refresh);
    }

    #[test]
    fn events_drive_status() {
        let event = AnalysisEvent::PrincipleFinished {
            principle_id: "market_size".into(),
            scored: true,
            completed: 3,
            total: 19,
        };
        assert_eq!(
            RunStatus::after(&event),
            Some(RunStatus::Scoring { completed: 3, total: 19 })
        );
        assert_eq!(
            RunStatus::after(&AnalysisEvent::Started { company_id: "acme".into(), documents: 2 }),
            Some(RunStatus::Extracting)
        );
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(RunStatus::Scoring { completed: 1, total: 19 }).unwrap();
        assert_eq!(json["state"], "scoring");
        assert_eq!(json["total"], 19);
        assert!(RunStatus::Cancelled.is_finished());
        assert!(!RunStatus::Queued.is_finished());
    }
}
