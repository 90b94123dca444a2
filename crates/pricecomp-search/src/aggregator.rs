//! Concurrent fan-out to every applicable retriever, fan-in of their listings.
//!
//! Each retriever runs on its own tokio task, bounded by a single deadline
//! shared by the whole request. Errors, panics and timeouts are logged and
//! recorded per source; they never fail the aggregate.

use std::fmt;
use std::sync::Arc;

use pricecomp_core::{Listing, Region, Retriever};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

use crate::sources::SourceTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded { count: usize },
    Failed { reason: String },
    TimedOut,
    Panicked,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { count } => write!(f, "{count} listings"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Panicked => f.write_str("panicked"),
        }
    }
}

/// What happened to one retriever during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source: String,
    pub status: OutcomeStatus,
}

impl SourceOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded { .. })
    }
}

/// Merged listings plus a per-source record. Listing order across sources is
/// unspecified.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub listings: Vec<Listing>,
    pub outcomes: Vec<SourceOutcome>,
}

impl Aggregate {
    #[must_use]
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

pub struct Aggregator {
    sources: Arc<SourceTable>,
}

impl Aggregator {
    #[must_use]
    pub fn new(sources: Arc<SourceTable>) -> Self {
        Self { sources }
    }

    /// Queries every retriever covering `region` concurrently and waits for
    /// all of them, or for `deadline`, whichever comes first.
    ///
    /// A source that has not answered by `deadline` has its future dropped and
    /// is recorded as [`OutcomeStatus::TimedOut`].
    pub async fn aggregate(&self, query: &str, region: &Region, deadline: Instant) -> Aggregate {
        let retrievers = self.sources.for_region(region);

        let handles: Vec<(String, JoinHandle<OutcomeResult>)> = retrievers
            .into_iter()
            .map(|retriever| {
                let name = retriever.name().to_string();
                let handle = tokio::spawn(run_one(
                    retriever,
                    query.to_string(),
                    region.clone(),
                    deadline,
                ));
                (name, handle)
            })
            .collect();

        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let _abort = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());
        let joined = futures::future::join_all(handles).await;

        let mut aggregate = Aggregate::default();
        for (source, joined) in names.into_iter().zip(joined) {
            let status = match joined {
                Ok(OutcomeResult::Listings(listings)) => {
                    let count = listings.len();
                    tracing::debug!(%source, count, "source returned listings");
                    aggregate.listings.extend(listings);
                    OutcomeStatus::Succeeded { count }
                }
                Ok(OutcomeResult::Error(reason)) => {
                    tracing::warn!(%source, error = %reason, "source search failed");
                    OutcomeStatus::Failed { reason }
                }
                Ok(OutcomeResult::TimedOut) => {
                    tracing::warn!(%source, "source search exceeded deadline");
                    OutcomeStatus::TimedOut
                }
                Err(join_err) if join_err.is_panic() => {
                    tracing::warn!(%source, "source search panicked");
                    OutcomeStatus::Panicked
                }
                Err(join_err) => {
                    tracing::warn!(%source, error = %join_err, "source task cancelled");
                    OutcomeStatus::Failed {
                        reason: join_err.to_string(),
                    }
                }
            };
            aggregate.outcomes.push(SourceOutcome { source, status });
        }

        tracing::debug!(
            region = %region,
            total = aggregate.listings.len(),
            failures = aggregate.failures(),
            "fan-out complete"
        );
        aggregate
    }
}

/// Aborts source tasks still running when a fan-out is dropped early.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

enum OutcomeResult {
    Listings(Vec<Listing>),
    Error(String),
    TimedOut,
}

async fn run_one(
    retriever: Arc<dyn Retriever>,
    query: String,
    region: Region,
    deadline: Instant,
) -> OutcomeResult {
    match tokio::time::timeout_at(deadline, retriever.search(&query, &region)).await {
        Ok(Ok(listings)) => OutcomeResult::Listings(listings),
        Ok(Err(err)) => OutcomeResult::Error(err.to_string()),
        Err(_elapsed) => OutcomeResult::TimedOut,
    }
}
