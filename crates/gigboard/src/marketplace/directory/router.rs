use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{DirectoryCandidate, DirectoryFilter, IdentityKind, UserId};
use super::merger::{DirectoryError, DirectorySource, ProfileSource, UserSource};
use super::ranking::{RankedCandidate, RankingEngine};
use crate::marketplace::applications::WorkerId;
use crate::marketplace::reputation::{ReputationProvider, ReputationSnapshot};

/// Presentation shape for a directory entry.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub id: UserId,
    pub display_name: String,
    pub kind: IdentityKind,
    pub has_profile: bool,
    pub skills: Vec<String>,
    pub bio: String,
    pub reputation: ReputationSnapshot,
    pub display_rating: f64,
}

impl CandidateView {
    fn from_candidate(candidate: &DirectoryCandidate, rank: Option<u32>) -> Self {
        let reputation = *candidate.reputation();
        Self {
            rank,
            id: candidate.id().clone(),
            display_name: candidate.display_name().to_string(),
            kind: candidate.kind(),
            has_profile: candidate.has_profile(),
            skills: candidate.skills().to_vec(),
            bio: candidate.bio().to_string(),
            reputation,
            display_rating: reputation.display_rating(),
        }
    }
}

impl From<&RankedCandidate> for CandidateView {
    fn from(ranked: &RankedCandidate) -> Self {
        Self::from_candidate(&ranked.candidate, Some(ranked.rank))
    }
}

#[derive(Debug, Serialize)]
pub struct CandidateListResponse {
    pub candidates: Vec<CandidateView>,
    pub degraded: Vec<DirectorySource>,
}

#[derive(Debug, Deserialize)]
pub struct TopWorkersQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Router builder exposing the directory and reputation endpoints.
pub fn directory_router<P, U, R>(engine: Arc<RankingEngine<P, U, R>>) -> Router
where
    P: ProfileSource + 'static,
    U: UserSource + 'static,
    R: ReputationProvider + 'static,
{
    Router::new()
        .route(
            "/api/v1/directory/candidates",
            get(candidates_handler::<P, U, R>),
        )
        .route(
            "/api/v1/directory/top-workers",
            get(top_workers_handler::<P, U, R>),
        )
        .with_state(engine)
}

/// Router builder for `GET /api/v1/workers/:worker_id/reputation`.
pub fn reputation_router<R>(reputation: Arc<R>) -> Router
where
    R: ReputationProvider + 'static,
{
    Router::new()
        .route(
            "/api/v1/workers/:worker_id/reputation",
            get(reputation_handler::<R>),
        )
        .with_state(reputation)
}

pub(crate) async fn candidates_handler<P, U, R>(
    State(engine): State<Arc<RankingEngine<P, U, R>>>,
    Query(filter): Query<DirectoryFilter>,
) -> Response
where
    P: ProfileSource + 'static,
    U: UserSource + 'static,
    R: ReputationProvider + 'static,
{
    match engine.merger().merge_candidates(&filter).await {
        Ok(merge) => {
            let body = CandidateListResponse {
                candidates: merge
                    .candidates
                    .iter()
                    .map(|candidate| CandidateView::from_candidate(candidate, None))
                    .collect(),
                degraded: merge.degraded,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => unavailable(err),
    }
}

pub(crate) async fn top_workers_handler<P, U, R>(
    State(engine): State<Arc<RankingEngine<P, U, R>>>,
    Query(query): Query<TopWorkersQuery>,
) -> Response
where
    P: ProfileSource + 'static,
    U: UserSource + 'static,
    R: ReputationProvider + 'static,
{
    let limit = query.limit.unwrap_or(engine.config().default_limit);
    match engine.top_workers(limit).await {
        Ok(ranked) => {
            let workers: Vec<CandidateView> = ranked.iter().map(CandidateView::from).collect();
            (StatusCode::OK, Json(json!({ "workers": workers }))).into_response()
        }
        Err(err) => unavailable(err),
    }
}

pub(crate) async fn reputation_handler<R>(
    State(reputation): State<Arc<R>>,
    Path(worker_id): Path<String>,
) -> Response
where
    R: ReputationProvider + 'static,
{
    let worker_id = WorkerId(worker_id);
    match reputation.compute_stats(&worker_id).await {
        Ok(snapshot) => {
            let payload = json!({
                "worker_id": worker_id,
                "reputation": snapshot,
                "display_rating": snapshot.display_rating(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
    }
}

fn unavailable(err: DirectoryError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
}
