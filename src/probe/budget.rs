//! Overall time budget and cancellation for a diagnostic run.

use super::ProbeError;

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation token threaded through every probe of a run.
///
/// Once exhausted, probes that have not started are skipped and the in-flight
/// probe is abandoned; results already collected are left untouched.
#[derive(Debug, Clone, Default)]
pub struct RunBudget {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl RunBudget {
    /// A budget with no deadline, cancellable only through its token.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A budget that expires `limit` from now.
    pub fn with_limit(limit: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + limit),
            token: CancellationToken::new(),
        }
    }

    /// Token a caller can use to cut the run short.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_exhausted(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Run `fut` unless the budget is spent, abandoning it if the budget runs out.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, ProbeError>
    where
        F: Future<Output = Result<T, ProbeError>>,
    {
        if self.is_exhausted() {
            return Err(ProbeError::Cancelled);
        }

        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ProbeError::Cancelled),
            _ = expiry => Err(ProbeError::Cancelled),
            result = fut => result,
        }
    }
}
