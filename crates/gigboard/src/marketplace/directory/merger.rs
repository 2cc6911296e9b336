use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use super::domain::{CandidateOrigin, DirectoryCandidate, DirectoryFilter, ProfileRecord, UserRecord};

/// Profile-rich source: members who completed profile setup.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn list_profiled_workers(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<ProfileRecord>, SourceError>;
}

/// Directory-wide source: every active member, profile or not.
#[async_trait]
pub trait UserSource: Send + Sync {
    async fn list_active_users(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<UserRecord>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectorySource {
    Profiled,
    Directory,
}

impl fmt::Display for DirectorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectorySource::Profiled => f.write_str("profiled"),
            DirectorySource::Directory => f.write_str("directory"),
        }
    }
}

/// Raised only when neither source answered.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: profiled source ({profiled}); directory source ({directory})")]
    Unavailable {
        profiled: SourceError,
        directory: SourceError,
    },
}

/// Merged candidates plus the sources that failed while producing them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryMerge {
    pub candidates: Vec<DirectoryCandidate>,
    pub degraded: Vec<DirectorySource>,
}

/// Best-effort union of the two directory sources.
pub struct DirectoryMerger<P, U> {
    profiles: Arc<P>,
    users: Arc<U>,
}

impl<P, U> DirectoryMerger<P, U>
where
    P: ProfileSource + 'static,
    U: UserSource + 'static,
{
    pub fn new(profiles: Arc<P>, users: Arc<U>) -> Self {
        Self { profiles, users }
    }

    /// Query both sources concurrently and merge whatever came back.
    pub async fn merge_candidates(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<DirectoryMerge, DirectoryError> {
        let (profiles, users) = tokio::join!(
            self.profiles.list_profiled_workers(filter),
            self.users.list_active_users(filter),
        );

        let mut degraded = Vec::new();
        let (profiles, users) = match (profiles, users) {
            (Err(profiled), Err(directory)) => {
                return Err(DirectoryError::Unavailable {
                    profiled,
                    directory,
                })
            }
            (Ok(profiles), Ok(users)) => (profiles, users),
            (Err(err), Ok(users)) => {
                warn!(
                    source = %DirectorySource::Profiled,
                    error = %err,
                    "directory source failed; continuing without profiles"
                );
                degraded.push(DirectorySource::Profiled);
                (Vec::new(), users)
            }
            (Ok(profiles), Err(err)) => {
                warn!(
                    source = %DirectorySource::Directory,
                    error = %err,
                    "directory source failed; continuing with profiles only"
                );
                degraded.push(DirectorySource::Directory);
                (profiles, Vec::new())
            }
        };

        let candidates = merge_records(profiles, users)
            .into_iter()
            .filter(|candidate| filter.matches(candidate))
            .collect();

        Ok(DirectoryMerge {
            candidates,
            degraded,
        })
    }
}

/// Union keyed on user id. Profile records always win a collision and keep
/// their source order; directory-only members are appended after them.
pub fn merge_records(
    profiles: Vec<ProfileRecord>,
    users: Vec<UserRecord>,
) -> Vec<DirectoryCandidate> {
    let mut seen = HashSet::with_capacity(profiles.len() + users.len());
    let mut merged = Vec::with_capacity(profiles.len() + users.len());

    for record in profiles {
        if seen.insert(record.user_id.clone()) {
            merged.push(DirectoryCandidate::new(CandidateOrigin::Profile(record)));
        }
    }

    for record in users {
        if seen.insert(record.user_id.clone()) {
            merged.push(DirectoryCandidate::new(CandidateOrigin::User(record)));
        }
    }

    merged
}
