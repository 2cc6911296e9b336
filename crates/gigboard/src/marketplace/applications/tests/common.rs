use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::marketplace::applications::domain::{
    Application, ApplicationId, ApplicationStatus, Budget, BudgetType, ClientId, Job, JobId,
    JobStatus, WorkerId,
};
use crate::marketplace::applications::lifecycle::Actor;
use crate::marketplace::applications::repository::{
    ApplicationFilter, ApplicationStore, PaymentGate, RepositoryError,
};
use crate::marketplace::applications::{application_router, LifecycleManager};

pub(super) const CLIENT: &str = "client-1";
pub(super) const OTHER_CLIENT: &str = "client-2";
pub(super) const WORKER: &str = "worker-1";
pub(super) const OTHER_WORKER: &str = "worker-2";
pub(super) const JOB: &str = "job-1";

pub(super) fn client() -> Actor {
    Actor::Client(ClientId(CLIENT.to_string()))
}

pub(super) fn other_client() -> Actor {
    Actor::Client(ClientId(OTHER_CLIENT.to_string()))
}

pub(super) fn worker() -> Actor {
    Actor::Worker(WorkerId(WORKER.to_string()))
}

pub(super) fn other_worker() -> Actor {
    Actor::Worker(WorkerId(OTHER_WORKER.to_string()))
}

pub(super) fn job(status: JobStatus) -> Job {
    let now = Utc::now();
    Job {
        id: JobId(JOB.to_string()),
        client_id: ClientId(CLIENT.to_string()),
        title: "Rewrite the billing exporter".to_string(),
        status,
        category: "engineering".to_string(),
        budget: Budget {
            amount: 1_500.0,
            budget_type: BudgetType::Fixed,
        },
        required_skills: vec!["Rust".to_string()],
        created_at: now,
        updated_at: now,
    }
}

pub(super) fn application(id: &str, worker: &str, status: ApplicationStatus) -> Application {
    let now = Utc::now();
    Application {
        id: ApplicationId(id.to_string()),
        job_id: JobId(JOB.to_string()),
        worker_id: WorkerId(worker.to_string()),
        status,
        proposed_price: 1_200.0,
        cover_letter: "Shipped three exporters last year.".to_string(),
        review: None,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    pub(super) jobs: Arc<Mutex<HashMap<JobId, Job>>>,
    pub(super) applications: Arc<Mutex<HashMap<ApplicationId, Application>>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryStore {
    pub(super) fn with_job(job: Job) -> Self {
        let store = Self::default();
        store
            .jobs
            .lock()
            .expect("store mutex poisoned")
            .insert(job.id.clone(), job);
        store
    }

    pub(super) fn seed(&self, application: Application) {
        self.applications
            .lock()
            .expect("store mutex poisoned")
            .insert(application.id.clone(), application);
    }

    pub(super) fn snapshot(&self, id: &str) -> Application {
        self.applications
            .lock()
            .expect("store mutex poisoned")
            .get(&ApplicationId(id.to_string()))
            .cloned()
            .expect("application seeded")
    }

    pub(super) fn active_for(&self, worker: &str) -> usize {
        self.applications
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|application| {
                application.worker_id.0 == worker && !application.status.is_terminal()
            })
            .count()
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        let mut matches: Vec<Application> = guard
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect();
        matches.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(matches)
    }

    async fn get_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let guard = self.jobs.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn allocate_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        let guard = self.applications.lock().expect("store mutex poisoned");
        loop {
            let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            let id = ApplicationId(format!("app-{next:06}"));
            if !guard.contains_key(&id) {
                return Ok(id);
            }
        }
    }

    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.applications.lock().expect("store mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::IdTaken(application.id));
        }
        let active = guard.values().any(|existing| {
            existing.worker_id == application.worker_id
                && existing.job_id == application.job_id
                && !existing.status.is_terminal()
        });
        if active {
            return Err(RepositoryError::ActiveApplicationExists(application.job_id));
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    async fn commit(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.applications.lock().expect("store mutex poisoned");
        let current = guard
            .get(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }
}

/// Serves a frozen copy of one application so commits race a newer version.
pub(super) struct StaleReadStore {
    pub(super) inner: MemoryStore,
    pub(super) frozen: Application,
}

#[async_trait]
impl ApplicationStore for StaleReadStore {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_applications(filter).await
    }

    async fn get_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(Some(self.frozen.clone()))
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.get_job(id).await
    }

    async fn allocate_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        self.inner.allocate_application_id().await
    }

    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        self.inner.insert_application(application).await
    }

    async fn commit(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<Application, RepositoryError> {
        self.inner.commit(application, expected_version).await
    }
}

/// Hands control back to the runtime before every listing, the way a store
/// doing I/O would, so two submissions can interleave between their checks.
#[derive(Clone)]
pub(super) struct YieldingStore {
    pub(super) inner: MemoryStore,
}

#[async_trait]
impl ApplicationStore for YieldingStore {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, RepositoryError> {
        tokio::task::yield_now().await;
        self.inner.list_applications(filter).await
    }

    async fn get_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.get_application(id).await
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.get_job(id).await
    }

    async fn allocate_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        self.inner.allocate_application_id().await
    }

    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        self.inner.insert_application(application).await
    }

    async fn commit(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<Application, RepositoryError> {
        self.inner.commit(application, expected_version).await
    }
}

pub(super) struct UnavailableStore;

#[async_trait]
impl ApplicationStore for UnavailableStore {
    async fn list_applications(
        &self,
        _filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn get_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn get_job(&self, _id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn allocate_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn insert_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn commit(
        &self,
        _application: Application,
        _expected_version: u64,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct DecliningGate;

#[async_trait]
impl PaymentGate for DecliningGate {
    async fn is_cleared(&self, _application: &Application) -> Result<bool, RepositoryError> {
        Ok(false)
    }
}

pub(super) fn manager_with(
    status: ApplicationStatus,
) -> (LifecycleManager<MemoryStore>, MemoryStore) {
    let store = MemoryStore::with_job(job(JobStatus::Open));
    store.seed(application("app-1", WORKER, status));
    let manager = LifecycleManager::new(Arc::new(store.clone()));
    (manager, store)
}

pub(super) fn router_with(store: MemoryStore) -> axum::Router {
    application_router(Arc::new(LifecycleManager::new(Arc::new(store))))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
