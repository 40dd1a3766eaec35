//! Retry budgets and operator escalation.
//!
//! Transient failures are retried silently up to a ceiling; past it the run
//! blocks until an operator acknowledges, then the budget resets and the
//! crawl resumes. Escalation is an injected strategy so the retry logic is
//! testable without a terminal attached.

use async_trait::async_trait;
use tracing::{info, warn};

use super::CrawlError;

/// What the ceiling was hit on, handed to the supervision policy.
#[derive(Debug, Clone)]
pub struct Incident {
    /// Operation kind, e.g. "listing load" or "detail lookup".
    pub operation: String,
    /// Last failure, rendered for the operator.
    pub detail: String,
    /// Consecutive failures so far.
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intervention {
    /// Operator acknowledged; reset the budget and keep going.
    Resume,
    /// Stop the run. Everything appended so far is already on disk.
    Abort,
}

/// Strategy invoked when a retry budget is exhausted.
#[async_trait]
pub trait SupervisionPolicy: Send + Sync {
    async fn escalate(&self, incident: &Incident) -> Intervention;
}

/// Blocks on stdin: Enter resumes, EOF or Ctrl+C ends the run.
pub struct ConsoleSupervisor;

#[async_trait]
impl SupervisionPolicy for ConsoleSupervisor {
    async fn escalate(&self, incident: &Incident) -> Intervention {
        warn!(
            "{} failed {} times in a row: {}",
            incident.operation, incident.attempts, incident.detail
        );
        eprintln!(
            "Automated retries exhausted for {}. Press Enter to try again or Ctrl+C to stop.",
            incident.operation
        );

        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)
        })
        .await;

        match answer {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => Intervention::Abort,
            Ok(Ok(_)) => Intervention::Resume,
        }
    }
}

/// Consecutive-failure counter for one operation kind.
///
/// Resets to zero after a successful operation or after operator
/// intervention.
#[derive(Debug)]
pub struct RetryBudget {
    ceiling: u32,
    used: u32,
}

impl RetryBudget {
    pub fn new(ceiling: u32) -> Self {
        Self { ceiling, used: 0 }
    }

    /// Count one failure. Returns `true` when the ceiling is reached and the
    /// operator must be consulted before continuing.
    pub fn record_failure(&mut self) -> bool {
        self.used += 1;
        self.used >= self.ceiling
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.used
    }
}

/// Count a failure against `budget`; at the ceiling, hand control to the
/// supervision policy and reset on resume.
pub async fn absorb_failure(
    budget: &mut RetryBudget,
    policy: &dyn SupervisionPolicy,
    operation: &str,
    detail: &str,
) -> Result<(), CrawlError> {
    if budget.record_failure() {
        let incident = Incident {
            operation: operation.to_owned(),
            detail: detail.to_owned(),
            attempts: budget.attempts(),
        };

        match policy.escalate(&incident).await {
            Intervention::Resume => {
                budget.reset();
                info!("Operator resumed {}", operation);
                Ok(())
            }
            Intervention::Abort => Err(CrawlError::Aborted {
                operation: operation.to_owned(),
            }),
        }
    } else {
        info!(
            "Retrying {} ({} of {} before escalation): {}",
            operation,
            budget.attempts(),
            budget.ceiling,
            detail
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSupervisor {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SupervisionPolicy for CountingSupervisor {
        async fn escalate(&self, _incident: &Incident) -> Intervention {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Intervention::Resume
        }
    }

    #[tokio::test]
    async fn test_escalation_fires_once_at_ceiling_and_resets() {
        let supervisor = CountingSupervisor {
            calls: AtomicU32::new(0),
        };
        let mut budget = RetryBudget::new(5);

        for _ in 0..5 {
            absorb_failure(&mut budget, &supervisor, "listing load", "not ready")
                .await
                .unwrap();
        }

        assert_eq!(supervisor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(budget.attempts(), 0);
    }

    #[tokio::test]
    async fn test_abort_surfaces_as_error() {
        struct Refusing;

        #[async_trait]
        impl SupervisionPolicy for Refusing {
            async fn escalate(&self, _incident: &Incident) -> Intervention {
                Intervention::Abort
            }
        }

        let mut budget = RetryBudget::new(1);
        let err = absorb_failure(&mut budget, &Refusing, "detail lookup", "boom")
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Aborted { .. }));
    }

    #[test]
    fn test_budget_reset_on_success_path() {
        let mut budget = RetryBudget::new(3);
        assert!(!budget.record_failure());
        assert!(!budget.record_failure());
        budget.reset();
        assert_eq!(budget.attempts(), 0);
        assert!(!budget.record_failure());
    }
}
