use async_trait::async_trait;
use chrono::{Duration, Utc};
use gigboard::config::RankingConfig;
use gigboard::marketplace::applications::{
    Application, ApplicationFilter, ApplicationId, ApplicationStore, Budget, BudgetType, ClientId,
    Job, JobId, JobStatus, LifecycleManager, RepositoryError,
};
use gigboard::marketplace::directory::{
    DirectoryFilter, DirectoryMerger, IdentityKind, ProfileRecord, ProfileSource, RankingEngine,
    SourceError, UserId, UserRecord, UserSource,
};
use gigboard::marketplace::ReputationAggregator;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationStore {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
    applications: Arc<Mutex<Vec<Application>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryApplicationStore {
    pub(crate) fn with_jobs(jobs: Vec<Job>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.jobs.lock().expect("job mutex poisoned");
            for job in jobs {
                guard.insert(job.id.clone(), job);
            }
        }
        store
    }
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect())
    }

    async fn get_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|application| application.id == *id).cloned())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let guard = self.jobs.lock().expect("job mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn allocate_application_id(&self) -> Result<ApplicationId, RepositoryError> {
        let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(ApplicationId(format!("app-{next:06}")))
    }

    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.applications.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.id == application.id) {
            return Err(RepositoryError::IdTaken(application.id));
        }
        let active = guard.iter().any(|existing| {
            existing.worker_id == application.worker_id
                && existing.job_id == application.job_id
                && !existing.status.is_terminal()
        });
        if active {
            return Err(RepositoryError::ActiveApplicationExists(application.job_id));
        }
        guard.push(application.clone());
        Ok(application)
    }

    async fn commit(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.applications.lock().expect("repository mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == application.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        *slot = application.clone();
        Ok(application)
    }
}

/// Profile source backed by a fixed set of records, typically a CSV export.
#[derive(Clone)]
pub(crate) struct StaticProfileSource {
    records: Arc<Vec<ProfileRecord>>,
}

impl StaticProfileSource {
    pub(crate) fn new(records: Vec<ProfileRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }
}

#[async_trait]
impl ProfileSource for StaticProfileSource {
    async fn list_profiled_workers(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<ProfileRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|record| filter.kind.map_or(true, |kind| record.kind == kind))
            .cloned()
            .collect())
    }
}

#[derive(Clone)]
pub(crate) struct StaticUserSource {
    records: Arc<Vec<UserRecord>>,
}

impl StaticUserSource {
    pub(crate) fn new(records: Vec<UserRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }
}

#[async_trait]
impl UserSource for StaticUserSource {
    async fn list_active_users(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<UserRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|record| filter.kind.map_or(true, |kind| record.kind == kind))
            .cloned()
            .collect())
    }
}

pub(crate) type Reputation = ReputationAggregator<InMemoryApplicationStore>;
pub(crate) type Directory = RankingEngine<StaticProfileSource, StaticUserSource, Reputation>;

/// Services sharing one in-memory application store.
pub(crate) struct Marketplace {
    pub(crate) lifecycle: Arc<LifecycleManager<InMemoryApplicationStore>>,
    pub(crate) reputation: Arc<Reputation>,
    pub(crate) directory: Arc<Directory>,
}

impl Marketplace {
    pub(crate) fn assemble(
        ranking: RankingConfig,
        jobs: Vec<Job>,
        profiles: Vec<ProfileRecord>,
        users: Vec<UserRecord>,
    ) -> Self {
        let store = Arc::new(InMemoryApplicationStore::with_jobs(jobs));
        let lifecycle = Arc::new(LifecycleManager::new(Arc::clone(&store)));
        let reputation = Arc::new(ReputationAggregator::new(store));
        let merger = DirectoryMerger::new(
            Arc::new(StaticProfileSource::new(profiles)),
            Arc::new(StaticUserSource::new(users)),
        );
        let directory = Arc::new(RankingEngine::new(
            merger,
            Arc::clone(&reputation),
            ranking,
        ));

        Self {
            lifecycle,
            reputation,
            directory,
        }
    }
}

pub(crate) const DEMO_CLIENT: &str = "client-northwind";

pub(crate) fn demo_jobs() -> Vec<Job> {
    let created_at = Utc::now() - Duration::days(30);
    [
        ("job-logo", "Brand refresh", "design", 800.0, BudgetType::Fixed),
        ("job-api", "Invoice API", "engineering", 95.0, BudgetType::Hourly),
        ("job-copy", "Landing page copy", "writing", 300.0, BudgetType::Fixed),
        ("job-audit", "Accessibility audit", "engineering", 1_200.0, BudgetType::Fixed),
        ("job-video", "Product walkthrough", "video", 650.0, BudgetType::Fixed),
    ]
    .into_iter()
    .map(|(id, title, category, amount, budget_type)| Job {
        id: JobId(id.to_string()),
        client_id: ClientId(DEMO_CLIENT.to_string()),
        title: title.to_string(),
        status: JobStatus::Open,
        category: category.to_string(),
        budget: Budget {
            amount,
            budget_type,
        },
        required_skills: Vec::new(),
        created_at,
        updated_at: created_at,
    })
    .collect()
}

fn demo_profile(id: &str, name: &str, skills: &[&str], bio: &str, rate: f64) -> ProfileRecord {
    ProfileRecord {
        user_id: UserId(id.to_string()),
        display_name: name.to_string(),
        kind: IdentityKind::Worker,
        skills: skills.iter().map(|skill| skill.to_string()).collect(),
        bio: bio.to_string(),
        hourly_rate: Some(rate),
        location: None,
        reputation: None,
    }
}

pub(crate) fn demo_profiles() -> Vec<ProfileRecord> {
    vec![
        demo_profile(
            "worker-ines",
            "Ines Duarte",
            &["Illustration", "Branding"],
            "Identity systems for small studios.",
            70.0,
        ),
        demo_profile(
            "worker-kofi",
            "Kofi Mensah",
            &["Rust", "Postgres"],
            "Backend services and billing integrations.",
            110.0,
        ),
        demo_profile(
            "worker-mei",
            "Mei Tanaka",
            &["Copywriting"],
            "Conversion copy for SaaS launches.",
            60.0,
        ),
        ProfileRecord {
            user_id: UserId(DEMO_CLIENT.to_string()),
            display_name: "Northwind Traders".to_string(),
            kind: IdentityKind::Client,
            skills: Vec::new(),
            bio: "Wholesale goods.".to_string(),
            hourly_rate: None,
            location: Some("Seattle".to_string()),
            reputation: None,
        },
    ]
}

pub(crate) fn demo_users() -> Vec<UserRecord> {
    let joined_at = Some(Utc::now() - Duration::days(90));
    [
        ("worker-kofi", Some("kofi.m")),
        ("worker-ravi", Some("Ravi Patel")),
        ("worker-tmp", Some("unknown")),
        ("worker-blank", None),
        ("worker-sam", Some("Sam Okafor")),
    ]
    .into_iter()
    .map(|(id, name)| UserRecord {
        user_id: UserId(id.to_string()),
        display_name: name.map(str::to_string),
        kind: IdentityKind::Worker,
        joined_at,
    })
    .collect()
}

/// `(job, worker, rating)` triples that make up the demo history.
pub(crate) const DEMO_HISTORY: [(&str, &str, Option<u8>); 5] = [
    ("job-logo", "worker-ines", Some(5)),
    ("job-api", "worker-kofi", Some(4)),
    ("job-audit", "worker-kofi", Some(5)),
    ("job-copy", "worker-ravi", Some(3)),
    ("job-video", "worker-sam", None),
];
