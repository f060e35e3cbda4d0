use super::ScoringError;

/// Lifecycle of one principle's scoring.
///
/// `Pending -> Retrieved -> OracleCalled -> Validated -> Done`, with
/// `OracleCalled` repeatable for retries and `Failed` reachable only from
/// `OracleCalled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreState {
    Pending,
    Retrieved,
    OracleCalled,
    Validated,
    Done,
    Failed,
}

impl ScoreState {
    pub fn can_advance(self, to: ScoreState) -> bool {
        use ScoreState::*;
        matches!(
            (self, to),
            (Pending, Retrieved)
                | (Retrieved, OracleCalled)
                | (OracleCalled, OracleCalled)
                | (OracleCalled, Validated)
                | (OracleCalled, Failed)
                | (Validated, Done)
        )
    }

    /// Move to `to`, rejecting transitions outside the lifecycle.
    pub fn advance(&mut self, to: ScoreState) -> Result<(), ScoringError> {
        if !self.can_advance(to) {
            return Err(ScoringError::InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ScoreState::Done | ScoreState::Failed)
    }
}
