use std::fmt;
use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunk::ChunkId;
use super::enums::{Category, Recommendation, UnscoredKind};

/// Deterministic identity of an evaluation: SHA-256 (hex) of company id,
/// sorted document ids and rubric version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Evidence supporting a score: a chunk and the quoted span inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub chunk_id: ChunkId,
    pub document_id: Uuid,
    pub quote: String,
    /// Character range of the quote in the document's extracted text.
    pub quote_range: Range<usize>,
}

/// A validated oracle judgement for one principle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub principle_id: String,
    /// Rubric value in 1..=4.
    pub value: u8,
    pub rationale: String,
    pub citations: Vec<Citation>,
}

/// Result slot for one catalog principle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PrincipleOutcome {
    Scored(Score),
    Unscored {
        principle_id: String,
        kind: UnscoredKind,
        detail: String,
    },
}

impl PrincipleOutcome {
    pub fn principle_id(&self) -> &str {
        match self {
            Self::Scored(score) => &score.principle_id,
            Self::Unscored { principle_id, .. } => principle_id,
        }
    }

    pub fn score(&self) -> Option<&Score> {
        match self {
            Self::Scored(score) => Some(score),
            Self::Unscored { .. } => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Scored(_))
    }
}

/// Per-category aggregate. `average` is `None` when no principle in the
/// category could be scored ("insufficient evidence").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub average: Option<f64>,
    pub scored: usize,
    pub total: usize,
}

impl CategorySummary {
    pub fn label(&self) -> String {
        match self.average {
            Some(avg) => format!("{avg:.2}"),
            None => "insufficient evidence".to_string(),
        }
    }
}

/// Immutable result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub company_id: String,
    pub fingerprint: Fingerprint,
    pub rubric_version: String,
    /// Sorted ids of the document set the evaluation was requested for.
    pub document_ids: Vec<Uuid>,
    /// One outcome per catalog principle, in catalog order.
    pub outcomes: Vec<PrincipleOutcome>,
    pub categories: Vec<CategorySummary>,
    pub recommendation: Recommendation,
    pub created_at: DateTime<Utc>,
}

impl Evaluation {
    pub fn category(&self, category: Category) -> Option<&CategorySummary> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn outcome(&self, principle_id: &str) -> Option<&PrincipleOutcome> {
        self.outcomes.iter().find(|o| o.principle_id() == principle_id)
    }

    pub fn scored_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_scored()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscored_outcome_serializes_with_status_tag() {
        let outcome = PrincipleOutcome::Unscored {
            principle_id: "market_size".into(),
            kind: UnscoredKind::HallucinatedCitation,
            detail: "cited unknown chunk".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "unscored");
        assert_eq!(json["kind"], "hallucinated_citation");
        assert_eq!(outcome.principle_id(), "market_size");
        assert!(outcome.score().is_none());
    }

    #[test]
    fn undefined_category_is_labelled_insufficient() {
        let summary = CategorySummary {
            category: Category::Market,
            average: None,
            scored: 0,
            total: 4,
        };
        assert_eq!(summary.label(), "insufficient evidence");
    }
}
