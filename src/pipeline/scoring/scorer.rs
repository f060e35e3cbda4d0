//! Per-principle scoring loop: retrieve evidence, ask the oracle, validate,
//! retry within budget, and settle on a scored or unscored outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use super::parser::parse_oracle_response;
use super::prompt::correction_for;
use super::retry::{RetryBudget, RetryDecision};
use super::state::ScoreState;
use super::types::{EvidenceItem, OracleRequest, PrincipleBrief, ReasoningOracle};
use super::validation::validate_judgement;
use super::ScoringError;
use crate::config::{RetrievalConfig, RetryConfig};
use crate::models::{Chunk, PrincipleOutcome};
use crate::pipeline::index::EvidenceIndex;
use crate::rubric::Principle;

/// Granularity of cancellation checks while backing off.
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Scores single principles against an evidence index.
///
/// The semaphore is shared across a run and bounds in-flight oracle calls;
/// a permit is held only for the duration of one call.
pub struct PrincipleScorer<O> {
    oracle: Arc<O>,
    semaphore: Arc<Semaphore>,
    retrieval: RetrievalConfig,
    retry: RetryConfig,
}

impl<O> Clone for PrincipleScorer<O> {
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            semaphore: Arc::clone(&self.semaphore),
            retrieval: self.retrieval,
            retry: self.retry,
        }
    }
}

impl<O: ReasoningOracle> PrincipleScorer<O> {
    pub fn new(
        oracle: Arc<O>,
        semaphore: Arc<Semaphore>,
        retrieval: RetrievalConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            oracle,
            semaphore,
            retrieval,
            retry,
        }
    }

    /// Score one principle. `probe_embedding` is the embedded probe text.
    ///
    /// Oracle and validation failures end as `PrincipleOutcome::Unscored`;
    /// only cancellation is returned as an error.
    pub async fn score(
        &self,
        principle: &Principle,
        probe_embedding: &[f32],
        index: &EvidenceIndex,
        cancel: &AtomicBool,
    ) -> Result<PrincipleOutcome, ScoringError> {
        let mut state = ScoreState::Pending;

        let bundle: Vec<Chunk> = index
            .query_embedding(probe_embedding, self.retrieval.top_k)
            .into_iter()
            .map(|r| r.chunk)
            .collect();
        state.advance(ScoreState::Retrieved)?;

        let mut request = OracleRequest {
            principle: PrincipleBrief::from(principle),
            evidence: bundle
                .iter()
                .map(|c| EvidenceItem {
                    chunk_id: c.id.clone(),
                    document_id: c.document_id,
                    text: c.text.clone(),
                })
                .collect(),
            correction: None,
        };
        let mut budget = RetryBudget::new(self.retry);
        let mut attempt: u32 = 0;

        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(ScoringError::Cancelled);
            }
            state.advance(ScoreState::OracleCalled)?;
            attempt += 1;

            let response = {
                let _permit = self
                    .semaphore
                    .acquire()
                    .await
                    .map_err(|_| ScoringError::Cancelled)?;
                if cancel.load(Ordering::Relaxed) {
                    return Err(ScoringError::Cancelled);
                }
                self.oracle.invoke(&request).await
            };

            let checked = response
                .map_err(ScoringError::from)
                .and_then(|raw| parse_oracle_response(&raw))
                .and_then(|judgement| validate_judgement(&principle.id, judgement, &bundle));

            let error = match checked {
                Ok(score) => {
                    state.advance(ScoreState::Validated)?;
                    state.advance(ScoreState::Done)?;
                    tracing::info!(
                        principle_id = %principle.id,
                        attempt,
                        score = score.value,
                        citations = score.citations.len(),
                        "Principle scored"
                    );
                    return Ok(PrincipleOutcome::Scored(score));
                }
                Err(e) => e,
            };

            match budget.next(error.class()) {
                RetryDecision::Retry { delay } => {
                    tracing::warn!(
                        principle_id = %principle.id,
                        attempt,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "Oracle call failed, retrying"
                    );
                    sleep_unless_cancelled(delay, cancel).await?;
                }
                RetryDecision::Correct => {
                    tracing::warn!(
                        principle_id = %principle.id,
                        attempt,
                        error = %error,
                        "Oracle response rejected, re-asking with correction"
                    );
                    request.correction = Some(correction_for(&error));
                }
                RetryDecision::GiveUp => {
                    state.advance(ScoreState::Failed)?;
                    tracing::warn!(
                        principle_id = %principle.id,
                        attempt,
                        error = %error,
                        "Principle left unscored"
                    );
                    return Ok(PrincipleOutcome::Unscored {
                        principle_id: principle.id.clone(),
                        kind: error.unscored_kind(),
                        detail: error.to_string(),
                    });
                }
            }
        }
    }
}

async fn sleep_unless_cancelled(delay: Duration, cancel: &AtomicBool) -> Result<(), ScoringError> {
    let deadline = tokio::time::Instant::now() + delay;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(ScoringError::Cancelled);
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Ok(());
        }
        tokio::time::sleep(CANCEL_POLL.min(deadline - now)).await;
    }
}
