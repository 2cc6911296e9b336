use std::cmp::Ordering;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{DirectoryCandidate, DirectoryFilter};
use super::merger::{DirectoryError, DirectoryMerger, ProfileSource, UserSource};
use crate::config::RankingConfig;
use crate::marketplace::reputation::{ReputationError, ReputationProvider, ReputationSnapshot};

/// Directory candidate with its dense, 1-based position in one ranking run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub rank: u32,
    pub candidate: DirectoryCandidate,
}

/// Produces the top-worker view: merge, enrich, filter, sort, truncate, rank.
pub struct RankingEngine<P, U, R> {
    merger: DirectoryMerger<P, U>,
    reputation: Arc<R>,
    config: RankingConfig,
}

impl<P, U, R> RankingEngine<P, U, R>
where
    P: ProfileSource + 'static,
    U: UserSource + 'static,
    R: ReputationProvider + 'static,
{
    pub fn new(merger: DirectoryMerger<P, U>, reputation: Arc<R>, config: RankingConfig) -> Self {
        Self {
            merger,
            reputation,
            config,
        }
    }

    pub fn merger(&self) -> &DirectoryMerger<P, U> {
        &self.merger
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub async fn top_workers(&self, limit: usize) -> Result<Vec<RankedCandidate>, DirectoryError> {
        let merged = self
            .merger
            .merge_candidates(&DirectoryFilter::workers())
            .await?;
        let enriched = self.enrich(merged.candidates).await;
        Ok(rank_candidates(enriched, limit))
    }

    /// Fetch a fresh snapshot for every candidate with bounded concurrency.
    ///
    /// Waits for every call to settle. A failed or timed out call leaves the
    /// candidate's existing values in place. Output order matches input order.
    pub async fn enrich(&self, candidates: Vec<DirectoryCandidate>) -> Vec<DirectoryCandidate> {
        let concurrency = self.config.enrichment_concurrency.max(1);
        let timeout = self.config.enrichment_timeout;
        let total = candidates.len();

        let outcomes: Vec<(DirectoryCandidate, Result<ReputationSnapshot, ReputationError>)> =
            stream::iter(candidates)
                .map(|candidate| {
                    let reputation = Arc::clone(&self.reputation);
                    async move {
                        let worker_id = candidate.id().as_worker();
                        let outcome =
                            match tokio::time::timeout(timeout, reputation.compute_stats(&worker_id))
                                .await
                            {
                                Ok(result) => result,
                                Err(_) => Err(ReputationError::TimedOut),
                            };
                        (candidate, outcome)
                    }
                })
                .buffered(concurrency)
                .collect()
                .await;

        let mut failures = 0usize;
        let enriched: Vec<DirectoryCandidate> = outcomes
            .into_iter()
            .map(|(mut candidate, outcome)| {
                match outcome {
                    Ok(snapshot) => candidate.set_reputation(snapshot),
                    Err(err) => {
                        failures += 1;
                        debug!(
                            candidate = %candidate.id(),
                            error = %err,
                            "reputation enrichment failed"
                        );
                    }
                }
                candidate
            })
            .collect();

        if failures > 0 {
            warn!(
                failed = failures,
                total, "reputation enrichment incomplete; using profile values"
            );
        }

        enriched
    }
}

/// Drop placeholder names, sort by reputation, keep `limit`, assign ranks.
pub fn rank_candidates(candidates: Vec<DirectoryCandidate>, limit: usize) -> Vec<RankedCandidate> {
    let mut eligible: Vec<DirectoryCandidate> = candidates
        .into_iter()
        .filter(|candidate| !candidate.has_placeholder_name())
        .collect();

    // `sort_by` is stable; equal keys keep merge order.
    eligible.sort_by(|left, right| compare_reputation(left.reputation(), right.reputation()));
    eligible.truncate(limit);

    eligible
        .into_iter()
        .zip(1u32..)
        .map(|(candidate, rank)| RankedCandidate { rank, candidate })
        .collect()
}

/// Proven workers first, then higher average, then more ratings.
///
/// Compares the unrounded average.
pub fn compare_reputation(left: &ReputationSnapshot, right: &ReputationSnapshot) -> Ordering {
    right
        .is_proven()
        .cmp(&left.is_proven())
        .then_with(|| right.average_rating.total_cmp(&left.average_rating))
        .then_with(|| right.total_ratings.cmp(&left.total_ratings))
}
