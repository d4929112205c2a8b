//! Submission front door: validate, analyze, persist.
//!
//! Every submission takes the next number from a monotonic request sequence.
//! Starting a new submission cancels the one still in flight, and a response
//! that comes back after its sequence number was superseded is dropped
//! without touching the stash.
//!
//! Saving runs on tokio's blocking pool, since [`FileStore`] may wait on
//! its file lock.
//!
//! [`FileStore`]: crate::stash::FileStore

use crate::client::{validate_issue_url, AnalysisClient, AnalysisError};
use crate::stash::{AnalysisStash, KeyValueStore, StashError};
use issuelens_core::protocol::AnalyzedIssue;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The newest submission finished. `stashed` is false when persisting it
    /// failed; the analysis is still returned.
    Completed { issue: AnalyzedIssue, stashed: bool },
    /// A newer submission started before this one finished.
    Superseded { sequence: u64 },
}

pub struct AnalysisSession<S> {
    client: AnalysisClient,
    stash: Arc<AnalysisStash<S>>,
    latest: watch::Sender<u64>,
}

impl<S: KeyValueStore + 'static> AnalysisSession<S> {
    pub fn new(client: AnalysisClient, stash: AnalysisStash<S>) -> Self {
        let (latest, _) = watch::channel(0);
        Self {
            client,
            stash: Arc::new(stash),
            latest,
        }
    }

    pub fn stash(&self) -> &AnalysisStash<S> {
        &self.stash
    }

    /// Sequence number of the most recent submission (0 before the first).
    pub fn latest_sequence(&self) -> u64 {
        *self.latest.borrow()
    }

    pub async fn submit(&self, issue_url: &str) -> Result<SubmitOutcome, AnalysisError> {
        validate_issue_url(issue_url)?;

        let sequence = self.begin();
        let mut latest = self.latest.subscribe();

        let result = tokio::select! {
            result = self.client.analyze(issue_url) => result,
            () = superseded(&mut latest, sequence) => {
                debug!(sequence, "analysis request cancelled by a newer submission");
                return Ok(SubmitOutcome::Superseded { sequence });
            }
        };

        if self.latest_sequence() != sequence {
            debug!(sequence, "discarding stale analysis response");
            return Ok(SubmitOutcome::Superseded { sequence });
        }

        let issue = result?;
        let stashed = match self.persist(sequence, &issue).await {
            Ok(true) => true,
            Ok(false) => {
                debug!(sequence, "superseded before the analysis was saved");
                return Ok(SubmitOutcome::Superseded { sequence });
            }
            Err(err) => {
                warn!(error = %err, "failed to persist analysis");
                false
            }
        };
        Ok(SubmitOutcome::Completed { issue, stashed })
    }

    /// Save `issue` unless `sequence` was superseded first. `Ok(false)` means
    /// nothing was written.
    async fn persist(&self, sequence: u64, issue: &AnalyzedIssue) -> Result<bool, StashError> {
        let stash = Arc::clone(&self.stash);
        let latest = self.latest.subscribe();
        let issue = issue.clone();
        let saved = tokio::task::spawn_blocking(move || {
            if *latest.borrow() != sequence {
                return Ok(false);
            }
            stash.save(&issue).map(|()| true)
        })
        .await;
        match saved {
            Ok(result) => result,
            Err(join_err) => Err(StashError::Interrupted(join_err.to_string())),
        }
    }

    fn begin(&self) -> u64 {
        let mut sequence = 0;
        self.latest.send_modify(|latest| {
            *latest += 1;
            sequence = *latest;
        });
        sequence
    }
}

/// Resolves once the latest sequence number differs from `sequence`.
async fn superseded(latest: &mut watch::Receiver<u64>, sequence: u64) {
    loop {
        if *latest.borrow_and_update() != sequence {
            return;
        }
        if latest.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
