//! One change-detection cycle: fetch → extract → diff → notify.
//!
//! Failures are typed so the scheduler can log them precisely; none of them
//! are fatal to the process. A persistence failure aborts the cycle before
//! any message is sent, so subscribers are never alerted about a record that
//! was not stored.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use listing_watch_core::diff::{diff_and_persist, new_records};
use listing_watch_core::extract::ListingExtractor;
use listing_watch_core::models::Record;
use listing_watch_core::notify::{fan_out, FanOutReport, Notifier};
use listing_watch_core::store::Store;

use crate::fetch::DocumentSource;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// The listing page could not be fetched.
    #[error("fetch failed: {0:#}")]
    Fetch(anyhow::Error),

    /// Reading or writing the store failed; nothing was sent.
    #[error("persistence failed: {0:#}")]
    Persistence(anyhow::Error),
}

/// Counters for a completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Records that passed the inclusion predicate.
    pub candidates: u64,
    /// Candidates not seen before (stored this cycle, or would be on a dry run).
    pub new_records: u64,
    pub subscribers: u64,
    pub notifications: FanOutReport,
}

/// Service handles for running cycles. Built once at startup.
pub struct Pipeline {
    source: Arc<dyn DocumentSource>,
    extractor: ListingExtractor,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: ListingExtractor,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            extractor,
            store,
            notifier,
        }
    }

    /// Run a full cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        debug!(source = self.source.describe(), "fetching listing page");
        let html = self.source.fetch().await.map_err(CycleError::Fetch)?;
        let candidates = self.extractor.extract(&html);
        let candidate_count = candidates.len() as u64;

        let fresh = diff_and_persist(candidates, self.store.as_ref())
            .await
            .map_err(CycleError::Persistence)?;

        if fresh.is_empty() {
            info!(candidates = candidate_count, "no new listings");
            return Ok(CycleReport {
                candidates: candidate_count,
                ..Default::default()
            });
        }
        info!(candidates = candidate_count, new = fresh.len(), "stored new listings");

        let subscribers = self
            .store
            .list_subscribers()
            .await
            .map_err(CycleError::Persistence)?;
        let notifications = fan_out(&fresh, &subscribers, self.notifier.as_ref()).await;

        Ok(CycleReport {
            candidates: candidate_count,
            new_records: fresh.len() as u64,
            subscribers: subscribers.len() as u64,
            notifications,
        })
    }

    /// Fetch, extract, and diff without writing or sending.
    pub async fn dry_run(&self) -> Result<(CycleReport, Vec<Record>), CycleError> {
        let html = self.source.fetch().await.map_err(CycleError::Fetch)?;
        let candidates = self.extractor.extract(&html);
        let candidate_count = candidates.len() as u64;

        let known = self
            .store
            .find_all_ids()
            .await
            .map_err(CycleError::Persistence)?;
        let fresh = new_records(candidates, &known);

        let report = CycleReport {
            candidates: candidate_count,
            new_records: fresh.len() as u64,
            ..Default::default()
        };
        Ok((report, fresh))
    }
}
