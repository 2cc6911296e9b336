use async_trait::async_trait;
use serde::Serialize;

use super::domain::{Application, ApplicationId, ApplicationStatus, Job, JobId, WorkerId};

/// Query over stored applications. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub worker_id: Option<WorkerId>,
    pub job_id: Option<JobId>,
    pub statuses: Vec<ApplicationStatus>,
}

impl ApplicationFilter {
    pub fn for_worker(worker_id: WorkerId) -> Self {
        Self {
            worker_id: Some(worker_id),
            ..Self::default()
        }
    }

    pub fn for_job(job_id: JobId) -> Self {
        Self {
            job_id: Some(job_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, application: &Application) -> bool {
        self.worker_id
            .as_ref()
            .map_or(true, |worker| *worker == application.worker_id)
            && self
                .job_id
                .as_ref()
                .map_or(true, |job| *job == application.job_id)
            && (self.statuses.is_empty() || self.statuses.contains(&application.status))
    }
}

/// Durable record of jobs and applications, owned outside this crate.
///
/// `commit` must compare `expected_version` against the stored record and
/// refuse with [`RepositoryError::Conflict`] when they differ, so two racing
/// transitions on one application cannot both land.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, RepositoryError>;

    async fn get_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;

    /// Hand out an id no stored or previously allocated application uses.
    /// Ids must stay unique across process restarts.
    async fn allocate_application_id(&self) -> Result<ApplicationId, RepositoryError>;

    /// Store a new application.
    ///
    /// Must refuse with [`RepositoryError::ActiveApplicationExists`] when the
    /// same `(worker_id, job_id)` pair already has a non-terminal application.
    /// The check and the write happen as one atomic step, so two concurrent
    /// submissions cannot both pass. An id that is already stored is refused
    /// with [`RepositoryError::IdTaken`].
    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError>;

    async fn commit(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<Application, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record version conflict")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("worker already holds an active application on job {0}")]
    ActiveApplicationExists(JobId),
    #[error("application id {0} is already in use")]
    IdTaken(ApplicationId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// External precondition for releasing payment on a completed application.
#[async_trait]
pub trait PaymentGate: Send + Sync {
    async fn is_cleared(&self, application: &Application) -> Result<bool, RepositoryError>;
}

/// Gate used when payment settlement is tracked entirely by the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternallySettled;

#[async_trait]
impl PaymentGate for ExternallySettled {
    async fn is_cleared(&self, _application: &Application) -> Result<bool, RepositoryError> {
        Ok(true)
    }
}

/// Public view of an application for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub status: &'static str,
    pub terminal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub version: u64,
}

impl Application {
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            job_id: self.job_id.clone(),
            worker_id: self.worker_id.clone(),
            status: self.status.label(),
            terminal: self.status.is_terminal(),
            rating: self.review.as_ref().map(|review| review.rating),
            version: self.version,
        }
    }
}
