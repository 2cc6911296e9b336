use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RankingConfig;
use crate::marketplace::applications::{RepositoryError, WorkerId};
use crate::marketplace::directory::domain::{
    DirectoryFilter, IdentityKind, ProfileRecord, UserId, UserRecord,
};
use crate::marketplace::directory::merger::{
    DirectoryMerger, ProfileSource, SourceError, UserSource,
};
use crate::marketplace::directory::ranking::RankingEngine;
use crate::marketplace::reputation::{ReputationError, ReputationProvider, ReputationSnapshot};

pub(super) fn snapshot(average_rating: f64, total_ratings: u32) -> ReputationSnapshot {
    ReputationSnapshot {
        average_rating,
        completed_jobs: total_ratings,
        total_ratings,
    }
}

pub(super) fn profile(id: &str, name: &str) -> ProfileRecord {
    ProfileRecord {
        user_id: UserId(id.to_string()),
        display_name: name.to_string(),
        kind: IdentityKind::Worker,
        skills: vec!["Rust".to_string()],
        bio: format!("{name} writes software"),
        hourly_rate: Some(80.0),
        location: None,
        reputation: None,
    }
}

pub(super) fn user(id: &str, name: Option<&str>) -> UserRecord {
    UserRecord {
        user_id: UserId(id.to_string()),
        display_name: name.map(str::to_string),
        kind: IdentityKind::Worker,
        joined_at: None,
    }
}

/// Profile source that returns a fixed list, or fails when `records` is `None`.
pub(super) struct FixedProfiles {
    pub(super) records: Option<Vec<ProfileRecord>>,
}

impl FixedProfiles {
    pub(super) fn of(records: Vec<ProfileRecord>) -> Self {
        Self {
            records: Some(records),
        }
    }

    pub(super) fn failing() -> Self {
        Self { records: None }
    }
}

#[async_trait]
impl ProfileSource for FixedProfiles {
    async fn list_profiled_workers(
        &self,
        _filter: &DirectoryFilter,
    ) -> Result<Vec<ProfileRecord>, SourceError> {
        self.records
            .clone()
            .ok_or_else(|| SourceError::Unavailable("profile index offline".to_string()))
    }
}

pub(super) struct FixedUsers {
    pub(super) records: Option<Vec<UserRecord>>,
}

impl FixedUsers {
    pub(super) fn of(records: Vec<UserRecord>) -> Self {
        Self {
            records: Some(records),
        }
    }

    pub(super) fn failing() -> Self {
        Self { records: None }
    }
}

#[async_trait]
impl UserSource for FixedUsers {
    async fn list_active_users(
        &self,
        _filter: &DirectoryFilter,
    ) -> Result<Vec<UserRecord>, SourceError> {
        self.records
            .clone()
            .ok_or_else(|| SourceError::Unavailable("user directory offline".to_string()))
    }
}

/// Map-backed provider. Ids listed in `failing` error out, ids in `slow`
/// sleep for `delay` first, and unknown ids get a zero snapshot.
#[derive(Default)]
pub(super) struct ScriptedReputation {
    pub(super) snapshots: HashMap<String, ReputationSnapshot>,
    pub(super) failing: Vec<String>,
    pub(super) slow: Vec<String>,
    pub(super) delay: Duration,
    pub(super) calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Counts one outstanding call until dropped, including when a timeout
/// cancels the call mid-sleep.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedReputation {
    pub(super) fn with(entries: &[(&str, ReputationSnapshot)]) -> Self {
        Self {
            snapshots: entries
                .iter()
                .map(|(id, snapshot)| (id.to_string(), *snapshot))
                .collect(),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time.
    pub(super) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReputationProvider for ScriptedReputation {
    async fn compute_stats(
        &self,
        worker_id: &WorkerId,
    ) -> Result<ReputationSnapshot, ReputationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.peak.fetch_max(running, Ordering::SeqCst);
        if self.slow.contains(&worker_id.0) {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(&worker_id.0) {
            return Err(ReputationError::Store(RepositoryError::Unavailable(
                "history offline".to_string(),
            )));
        }
        Ok(self
            .snapshots
            .get(&worker_id.0)
            .copied()
            .unwrap_or(ReputationSnapshot::ZERO))
    }
}

pub(super) fn ranking_config() -> RankingConfig {
    RankingConfig {
        enrichment_concurrency: 4,
        enrichment_timeout: Duration::from_millis(200),
        default_limit: 10,
    }
}

pub(super) fn engine(
    profiles: FixedProfiles,
    users: FixedUsers,
    reputation: ScriptedReputation,
) -> (
    RankingEngine<FixedProfiles, FixedUsers, ScriptedReputation>,
    Arc<ScriptedReputation>,
) {
    let reputation = Arc::new(reputation);
    let merger = DirectoryMerger::new(Arc::new(profiles), Arc::new(users));
    let engine = RankingEngine::new(merger, Arc::clone(&reputation), ranking_config());
    (engine, reputation)
}
