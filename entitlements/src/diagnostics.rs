//! Diagnostics aggregator (component J).
//!
//! Runs every configured `Diagnosable` concurrently, bounded by a semaphore
//! sized from `EngineConfig::max_concurrency`, and ANDs the results. A single
//! collaborator's failure never panics the aggregator.

use std::sync::Arc;

use core::{Diagnosable, DiagnosticResult};
use futures::future::join_all;
use tokio::sync::Semaphore;

pub struct DiagnosticsAggregator {
    diagnosables: Vec<Arc<dyn Diagnosable>>,
    max_concurrency: usize,
}

impl DiagnosticsAggregator {
    #[must_use]
    pub fn new(diagnosables: Vec<Arc<dyn Diagnosable>>, max_concurrency: usize) -> Self {
        Self { diagnosables, max_concurrency: max_concurrency.max(1) }
    }

    /// Returns the overall readiness (AND of every `successful` flag) along
    /// with the individual results, in the order the collaborators were
    /// registered.
    pub async fn check_all(&self) -> (bool, Vec<DiagnosticResult>) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let results = join_all(self.diagnosables.iter().map(|diagnosable| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("diagnostics semaphore is never closed");
                diagnosable.check().await
            }
        }))
        .await;

        let successful = results.iter().all(|r| r.successful);
        (successful, results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testfix::FakeDiagnosable;

    #[tokio::test]
    async fn overall_readiness_is_and_of_individual_results() {
        let aggregator = DiagnosticsAggregator::new(
            vec![
                Arc::new(FakeDiagnosable { name: "policy-analyzer".into(), successful: true }),
                Arc::new(FakeDiagnosable { name: "resource-manager".into(), successful: true }),
            ],
            4,
        );
        let (ok, results) = aggregator.check_all().await;
        assert!(ok);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn a_single_failure_fails_overall_readiness() {
        let aggregator = DiagnosticsAggregator::new(
            vec![
                Arc::new(FakeDiagnosable { name: "policy-analyzer".into(), successful: true }),
                Arc::new(FakeDiagnosable { name: "secret-store".into(), successful: false }),
            ],
            4,
        );
        let (ok, _) = aggregator.check_all().await;
        assert!(!ok);
    }
}
