use std::time::Duration;

use crate::config::RetryConfig;

/// How a scoring failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Oracle unreachable, timed out, rate limited or 5xx: retry with backoff.
    Transient,
    /// Response arrived but could not be used: re-ask with a correction.
    Structural,
    /// Not worth retrying.
    Fatal,
}

/// What to do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    Correct,
    GiveUp,
}

/// Retry accounting for one principle.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    config: RetryConfig,
    transient_failures: u32,
    corrections: u32,
}

impl RetryBudget {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            transient_failures: 0,
            corrections: 0,
        }
    }

    /// Record a failure of `class` and decide the next step.
    pub fn next(&mut self, class: FailureClass) -> RetryDecision {
        match class {
            FailureClass::Transient => {
                self.transient_failures += 1;
                if self.transient_failures < self.config.max_attempts {
                    RetryDecision::Retry {
                        delay: self.config.backoff(self.transient_failures),
                    }
                } else {
                    RetryDecision::GiveUp
                }
            }
            FailureClass::Structural => {
                if self.corrections < self.config.structural_retries {
                    self.corrections += 1;
                    RetryDecision::Correct
                } else {
                    RetryDecision::GiveUp
                }
            }
            FailureClass::Fatal => RetryDecision::GiveUp,
        }
    }

    pub fn transient_failures(&self) -> u32 {
        self.transient_failures
    }

    pub fn corrections(&self) -> u32 {
        self.corrections
    }
}
