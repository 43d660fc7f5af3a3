//! Concurrent conversation runs.
//!
//! Each job pairs its own container with a conversation. Jobs run
//! concurrently on one runner; each run owns its scripting memory and
//! transcript, so nothing is shared between them but the transcript bus.

use std::sync::Arc;

use futures::future::join_all;

use crate::container::{Connector, Container};
use crate::convo::{Convo, ConvoRunner, RunResult};

/// Outcome of one batch job.
#[derive(Debug)]
pub struct BatchResult<C> {
    /// Job label.
    pub label: String,
    /// The container, stopped and handed back.
    pub container: Container<C>,
    /// The run result.
    pub result: RunResult,
}

impl<C> BatchResult<C> {
    /// Check if the run completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// A set of conversations to run concurrently.
#[derive(Debug)]
pub struct ConvoBatch<C> {
    jobs: Vec<(String, Container<C>, Arc<Convo>)>,
}

impl<C> Default for ConvoBatch<C> {
    fn default() -> Self {
        Self { jobs: Vec::new() }
    }
}

impl<C: Connector> ConvoBatch<C> {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job.
    #[must_use]
    pub fn job(mut self, label: impl Into<String>, container: Container<C>, convo: impl Into<Arc<Convo>>) -> Self {
        self.add(label, container, convo);
        self
    }

    /// Add a job.
    pub fn add(&mut self, label: impl Into<String>, container: Container<C>, convo: impl Into<Arc<Convo>>) {
        self.jobs.push((label.into(), container, convo.into()));
    }

    /// Get the number of jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Run every job concurrently.
    ///
    /// Each container is started, used for one run and stopped. Results are
    /// returned in the order the jobs were added.
    pub async fn run(self, runner: &ConvoRunner) -> Vec<BatchResult<C>> {
        tracing::info!(jobs = self.jobs.len(), "running conversation batch");
        let runs = self.jobs.into_iter().map(|(label, mut container, convo)| async move {
            let result = runner.run_session(&mut container, &convo).await;
            BatchResult {
                label,
                container,
                result,
            }
        });
        join_all(runs).await
    }
}

/// Summary counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Completed runs.
    pub passed: usize,
    /// Failed runs.
    pub failed: usize,
}

impl BatchSummary {
    /// Summarize batch results.
    #[must_use]
    pub fn of<C>(results: &[BatchResult<C>]) -> Self {
        let passed = results.iter().filter(|r| r.is_success()).count();
        Self {
            passed,
            failed: results.len() - passed,
        }
    }

    /// Check if every run completed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
