//! "Discover people" directory: merge two overlapping identity sources, enrich
//! each worker with a fresh reputation snapshot, and rank them.

pub mod domain;
pub mod import;
pub mod merger;
pub mod ranking;
pub mod router;

#[cfg(test)]
mod tests;

pub use domain::{
    is_placeholder_name, BareCandidate, CandidateOrigin, DirectoryCandidate, DirectoryFilter,
    IdentityKind, ProfileRecord, ProfiledCandidate, UserId, UserRecord, PLACEHOLDER_BIO,
};
pub use import::{profiles_from_path, profiles_from_reader, ProfileImportError};
pub use merger::{
    merge_records, DirectoryError, DirectoryMerge, DirectoryMerger, DirectorySource,
    ProfileSource, SourceError, UserSource,
};
pub use ranking::{compare_reputation, rank_candidates, RankedCandidate, RankingEngine};
pub use router::{directory_router, reputation_router, CandidateView};
