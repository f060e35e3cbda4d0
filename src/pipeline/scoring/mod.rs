pub mod types;
pub mod prompt;
pub mod sanitize;
pub mod parser;
pub mod validation;
pub mod retry;
pub mod state;
pub mod ollama;
pub mod scorer;

#[cfg(test)]
pub(crate) mod mock;

pub use types::*;
pub use prompt::*;
pub use sanitize::*;
pub use parser::*;
pub use validation::*;
pub use retry::*;
pub use state::*;
pub use ollama::*;
pub use scorer::*;

use thiserror::Error;

use crate::models::UnscoredKind;

/// Failure reported by a reasoning oracle call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Oracle is not reachable at {0}")]
    Connection(String),

    #[error("Oracle request timed out after {0}s")]
    Timeout(u64),

    #[error("Oracle rate limited the request")]
    RateLimited,

    #[error("Oracle server error (status {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Oracle rejected the request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Oracle response envelope is invalid: {0}")]
    InvalidResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl OracleError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::RateLimited | Self::Server { .. } => {
                FailureClass::Transient
            }
            Self::InvalidResponse(_) => FailureClass::Structural,
            Self::Rejected { .. } | Self::HttpClient(_) => FailureClass::Fatal,
        }
    }
}

/// Per-principle scoring failure. Only `Cancelled` escapes the scorer;
/// everything else ends as an unscored outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("Oracle call failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("Oracle response does not match the expected schema: {0}")]
    SchemaMismatch(String),

    #[error("Oracle cited chunks outside the evidence bundle: {}", .0.join(", "))]
    HallucinatedCitation(Vec<String>),

    #[error("Invalid scoring state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: ScoreState, to: ScoreState },

    #[error("Scoring cancelled")]
    Cancelled,
}

impl ScoringError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Oracle(e) => e.class(),
            Self::MalformedResponse(_) | Self::SchemaMismatch(_) | Self::HallucinatedCitation(_) => {
                FailureClass::Structural
            }
            Self::InvalidTransition { .. } | Self::Cancelled => FailureClass::Fatal,
        }
    }

    /// Reason recorded when this failure leaves a principle unscored.
    pub fn unscored_kind(&self) -> UnscoredKind {
        match self {
            Self::HallucinatedCitation(_) => UnscoredKind::HallucinatedCitation,
            Self::MalformedResponse(_)
            | Self::SchemaMismatch(_)
            | Self::Oracle(OracleError::InvalidResponse(_)) => UnscoredKind::MalformedResponse,
            Self::Oracle(_) | Self::InvalidTransition { .. } | Self::Cancelled => {
                UnscoredKind::OracleUnavailable
            }
        }
    }
}
