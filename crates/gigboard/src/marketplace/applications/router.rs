use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationDraft, ApplicationId};
use super::lifecycle::{Actor, LifecycleError, TransitionTrigger};
use super::repository::{ApplicationStore, RepositoryError};
use super::service::LifecycleManager;

/// Body for `POST /api/v1/applications`.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub actor: Actor,
    #[serde(flatten)]
    pub draft: ApplicationDraft,
}

/// Body for `POST /api/v1/applications/:id/transitions`.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub actor: Actor,
    #[serde(flatten)]
    pub trigger: TransitionTrigger,
}

/// Router builder exposing HTTP endpoints for submission and transitions.
pub fn application_router<S>(manager: Arc<LifecycleManager<S>>) -> Router
where
    S: ApplicationStore + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<S>))
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/transitions",
            post(transition_handler::<S>),
        )
        .with_state(manager)
}

pub(crate) async fn submit_handler<S>(
    State(manager): State<Arc<LifecycleManager<S>>>,
    Json(request): Json<SubmitRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
{
    match manager.submit(&request.actor, request.draft).await {
        Ok(application) => (StatusCode::CREATED, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<S>(
    State(manager): State<Arc<LifecycleManager<S>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
{
    match manager.get(&ApplicationId(application_id)).await {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<S>(
    State(manager): State<Arc<LifecycleManager<S>>>,
    Path(application_id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
{
    let id = ApplicationId(application_id);
    match manager
        .apply_transition(&request.actor, &id, request.trigger)
        .await
    {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: LifecycleError) -> Response {
    let status = match &err {
        LifecycleError::InvalidTransition { .. }
        | LifecycleError::Conflict
        | LifecycleError::PaymentNotCleared
        | LifecycleError::JobNotOpen(_)
        | LifecycleError::DuplicateApplication(_) => StatusCode::CONFLICT,
        LifecycleError::NotAuthorized { .. } | LifecycleError::NotAWorker => StatusCode::FORBIDDEN,
        LifecycleError::InvalidReview { .. } | LifecycleError::InvalidProposal => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LifecycleError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        LifecycleError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        LifecycleError::Repository(
            RepositoryError::Conflict | RepositoryError::ActiveApplicationExists(_),
        ) => StatusCode::CONFLICT,
        LifecycleError::Repository(RepositoryError::IdTaken(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
