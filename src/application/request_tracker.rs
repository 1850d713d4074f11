// Cancellable request tracking for one view
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The view was torn down while the request was outstanding.
    #[error("request aborted")]
    Aborted,

    #[error("request failed: {0:#}")]
    Failed(#[from] anyhow::Error),
}

impl FetchError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }

    /// Aborts are expected on navigation and only logged at debug level.
    pub fn log(&self, what: &str) {
        match self {
            FetchError::Aborted => tracing::debug!("Request for {} aborted", what),
            FetchError::Failed(e) => tracing::error!("Request for {} failed: {:#}", what, e),
        }
    }
}

/// Tracks every outstanding request of a view so they can be aborted as a unit.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    token: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled on teardown; also used to stop the view's timers.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn run<T, F>(&self, what: &str, request: F) -> Result<T, FetchError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        if self.token.is_cancelled() {
            return Err(FetchError::Aborted);
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(self.in_flight.clone());
        let start = Instant::now();

        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FetchError::Aborted),
            result = request => result.map_err(FetchError::Failed),
        };

        tracing::debug!(
            "Request for {} took {:.2} ms",
            what,
            start.elapsed().as_secs_f64() * 1000.0
        );
        result
    }

    /// Abort every outstanding request. Returns how many were in flight.
    pub fn cancel_all(&self) -> usize {
        let outstanding = self.in_flight();
        self.token.cancel();
        tracing::debug!("Cancelled {} in-progress requests", outstanding);
        outstanding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completed_request_passes_through() {
        let tracker = RequestTracker::new();
        let value = tracker.run("sensors", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_not_an_abort() {
        let tracker = RequestTracker::new();
        let err = tracker
            .run::<(), _>("current", async { anyhow::bail!("HTTP 500") })
            .await
            .unwrap_err();
        assert!(!err.is_aborted());
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_cancel_aborts_every_outstanding_request() {
        let tracker = RequestTracker::new();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                tracker
                    .run("window", futures::future::pending::<anyhow::Result<()>>())
                    .await
            }));
        }

        while tracker.in_flight() < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(tracker.cancel_all(), 3);

        for handle in handles {
            assert!(handle.await.unwrap().unwrap_err().is_aborted());
        }
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_no_request_starts_after_cancel() {
        let tracker = RequestTracker::new();
        tracker.cancel_all();
        let err = tracker.run("current", async { Ok(()) }).await.unwrap_err();
        assert!(err.is_aborted());
    }
}
