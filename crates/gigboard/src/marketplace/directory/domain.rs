use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marketplace::applications::WorkerId;
use crate::marketplace::reputation::ReputationSnapshot;

/// Bio shown for members who have not completed profile setup.
pub const PLACEHOLDER_BIO: &str = "This member has not completed their profile yet.";

/// Display names upstream sources emit when no real name is known.
const PLACEHOLDER_NAMES: [&str; 5] = ["unknown", "anonymous", "unnamed", "n/a", "user"];

/// Unique identity key shared by both directory sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_worker(&self) -> WorkerId {
        WorkerId(self.0.clone())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityKind {
    Worker,
    Client,
}

/// Row from the profile-rich source: members who completed profile setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: UserId,
    pub display_name: String,
    pub kind: IdentityKind,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    /// Reputation cached on the profile, used when fresh enrichment fails.
    #[serde(default)]
    pub reputation: Option<ReputationSnapshot>,
}

/// Row from the directory-wide source: every active member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
    pub kind: IdentityKind,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

/// Query forwarded to both sources and re-applied after the merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryFilter {
    #[serde(default)]
    pub kind: Option<IdentityKind>,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl DirectoryFilter {
    pub fn workers() -> Self {
        Self {
            kind: Some(IdentityKind::Worker),
            ..Self::default()
        }
    }

    pub fn matches(&self, candidate: &DirectoryCandidate) -> bool {
        if let Some(kind) = self.kind {
            if candidate.kind() != kind {
                return false;
            }
        }

        if let Some(skill) = self.skill.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !candidate
                .skills()
                .iter()
                .any(|candidate_skill| candidate_skill.eq_ignore_ascii_case(skill))
            {
                return false;
            }
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !candidate.display_name().to_lowercase().contains(&needle) {
                return false;
            }
        }

        true
    }
}

/// Candidate sourced from the profile-rich source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfiledCandidate {
    pub id: UserId,
    pub display_name: String,
    pub kind: IdentityKind,
    pub skills: Vec<String>,
    pub bio: String,
    pub hourly_rate: Option<f64>,
    pub location: Option<String>,
    pub reputation: ReputationSnapshot,
}

/// Candidate known only to the directory-wide source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BareCandidate {
    pub id: UserId,
    pub display_name: String,
    pub kind: IdentityKind,
    pub bio: String,
    pub joined_at: Option<DateTime<Utc>>,
    pub reputation: ReputationSnapshot,
}

/// Upstream record a candidate is built from.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOrigin {
    Profile(ProfileRecord),
    User(UserRecord),
}

/// Deduplicated directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum DirectoryCandidate {
    Profiled(ProfiledCandidate),
    Bare(BareCandidate),
}

impl DirectoryCandidate {
    pub fn new(origin: CandidateOrigin) -> Self {
        match origin {
            CandidateOrigin::Profile(record) => DirectoryCandidate::Profiled(ProfiledCandidate {
                id: record.user_id,
                display_name: record.display_name.trim().to_string(),
                kind: record.kind,
                skills: record.skills,
                bio: record.bio,
                hourly_rate: record.hourly_rate,
                location: record.location,
                reputation: record.reputation.unwrap_or_default(),
            }),
            CandidateOrigin::User(record) => DirectoryCandidate::Bare(BareCandidate {
                id: record.user_id,
                display_name: record
                    .display_name
                    .map(|name| name.trim().to_string())
                    .unwrap_or_default(),
                kind: record.kind,
                bio: PLACEHOLDER_BIO.to_string(),
                joined_at: record.joined_at,
                reputation: ReputationSnapshot::ZERO,
            }),
        }
    }

    pub fn id(&self) -> &UserId {
        match self {
            DirectoryCandidate::Profiled(candidate) => &candidate.id,
            DirectoryCandidate::Bare(candidate) => &candidate.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            DirectoryCandidate::Profiled(candidate) => &candidate.display_name,
            DirectoryCandidate::Bare(candidate) => &candidate.display_name,
        }
    }

    pub fn kind(&self) -> IdentityKind {
        match self {
            DirectoryCandidate::Profiled(candidate) => candidate.kind,
            DirectoryCandidate::Bare(candidate) => candidate.kind,
        }
    }

    pub fn has_profile(&self) -> bool {
        matches!(self, DirectoryCandidate::Profiled(_))
    }

    /// Profile skills; bare candidates have none.
    pub fn skills(&self) -> &[String] {
        match self {
            DirectoryCandidate::Profiled(candidate) => &candidate.skills,
            DirectoryCandidate::Bare(_) => &[],
        }
    }

    pub fn bio(&self) -> &str {
        match self {
            DirectoryCandidate::Profiled(candidate) => &candidate.bio,
            DirectoryCandidate::Bare(candidate) => &candidate.bio,
        }
    }

    pub fn reputation(&self) -> &ReputationSnapshot {
        match self {
            DirectoryCandidate::Profiled(candidate) => &candidate.reputation,
            DirectoryCandidate::Bare(candidate) => &candidate.reputation,
        }
    }

    pub fn set_reputation(&mut self, snapshot: ReputationSnapshot) {
        match self {
            DirectoryCandidate::Profiled(candidate) => candidate.reputation = snapshot,
            DirectoryCandidate::Bare(candidate) => candidate.reputation = snapshot,
        }
    }

    /// True when the display name is blank or a known placeholder.
    pub fn has_placeholder_name(&self) -> bool {
        is_placeholder_name(self.display_name())
    }
}

pub fn is_placeholder_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty()
        || PLACEHOLDER_NAMES
            .iter()
            .any(|placeholder| trimmed.eq_ignore_ascii_case(placeholder))
}
