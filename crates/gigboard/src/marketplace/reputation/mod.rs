//! Worker reputation rolled up from application history.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::applications::{
    Application, ApplicationFilter, ApplicationStore, RepositoryError, WorkerId,
};

/// Derived, never persisted rollup of a worker's finished applications.
///
/// `average_rating` is kept unrounded; use [`ReputationSnapshot::display_rating`]
/// for presentation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReputationSnapshot {
    pub average_rating: f64,
    pub completed_jobs: u32,
    pub total_ratings: u32,
}

impl ReputationSnapshot {
    pub const ZERO: ReputationSnapshot = ReputationSnapshot {
        average_rating: 0.0,
        completed_jobs: 0,
        total_ratings: 0,
    };

    /// Reduce a worker's applications into a snapshot.
    pub fn from_applications<'a, I>(applications: I) -> Self
    where
        I: IntoIterator<Item = &'a Application>,
    {
        let mut completed_jobs = 0u32;
        let mut total_ratings = 0u32;
        let mut rating_sum = 0u64;

        for application in applications {
            if !application.status.counts_as_completed() {
                continue;
            }
            completed_jobs += 1;
            if let Some(rating) = application.qualifying_rating() {
                total_ratings += 1;
                rating_sum += u64::from(rating);
            }
        }

        let average_rating = if total_ratings > 0 {
            rating_sum as f64 / f64::from(total_ratings)
        } else {
            0.0
        };

        Self {
            average_rating,
            completed_jobs,
            total_ratings,
        }
    }

    /// A worker with at least one positive rating.
    pub fn is_proven(&self) -> bool {
        self.average_rating > 0.0 && self.total_ratings > 0
    }

    /// Average rounded to one decimal place.
    pub fn display_rating(&self) -> f64 {
        (self.average_rating * 10.0).round() / 10.0
    }
}

/// Anything that can produce a fresh snapshot for a worker.
#[async_trait]
pub trait ReputationProvider: Send + Sync {
    async fn compute_stats(&self, worker_id: &WorkerId)
        -> Result<ReputationSnapshot, ReputationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReputationError {
    #[error("application history unavailable: {0}")]
    Store(#[from] RepositoryError),
    #[error("reputation lookup timed out")]
    TimedOut,
}

/// Scans a worker's full application history on every call.
pub struct ReputationAggregator<S> {
    store: Arc<S>,
}

impl<S> ReputationAggregator<S>
where
    S: ApplicationStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> ReputationProvider for ReputationAggregator<S>
where
    S: ApplicationStore + 'static,
{
    async fn compute_stats(
        &self,
        worker_id: &WorkerId,
    ) -> Result<ReputationSnapshot, ReputationError> {
        let applications = self
            .store
            .list_applications(&ApplicationFilter::for_worker(worker_id.clone()))
            .await?;

        // Stores are not trusted to honour the filter.
        let snapshot = ReputationSnapshot::from_applications(
            applications
                .iter()
                .filter(|application| application.worker_id == *worker_id),
        );
        Ok(snapshot)
    }
}
