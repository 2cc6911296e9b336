use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationStatus, JobId, JobStatus,
};
use super::lifecycle::{self, Actor, LifecycleError, Ownership, TransitionTrigger, TriggerKind};
use super::repository::{
    ApplicationFilter, ApplicationStore, ExternallySettled, PaymentGate, RepositoryError,
};

/// Authority for application state: validates and commits transitions.
pub struct LifecycleManager<S> {
    store: Arc<S>,
    payments: Arc<dyn PaymentGate>,
    auto_close: bool,
}

impl<S> LifecycleManager<S>
where
    S: ApplicationStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            payments: Arc::new(ExternallySettled),
            auto_close: true,
        }
    }

    pub fn with_payment_gate(mut self, payments: Arc<dyn PaymentGate>) -> Self {
        self.payments = payments;
        self
    }

    /// When enabled (the default), a successful review is followed by the
    /// platform `close` in the same call.
    pub fn with_auto_close(mut self, enabled: bool) -> Self {
        self.auto_close = enabled;
        self
    }

    /// Submit a new application in `pending` for an open job.
    ///
    /// The listing below rejects obvious duplicates early; the store's insert
    /// is what keeps concurrent submissions for one job down to a single
    /// active application.
    pub async fn submit(
        &self,
        actor: &Actor,
        draft: ApplicationDraft,
    ) -> Result<Application, LifecycleError> {
        let Actor::Worker(worker_id) = actor else {
            return Err(LifecycleError::NotAWorker);
        };

        if !draft.proposed_price.is_finite() || draft.proposed_price <= 0.0 {
            return Err(LifecycleError::InvalidProposal);
        }

        let job = self
            .store
            .get_job(&draft.job_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if job.status != JobStatus::Open {
            return Err(LifecycleError::JobNotOpen(job.id));
        }

        let filter = ApplicationFilter {
            worker_id: Some(worker_id.clone()),
            job_id: Some(job.id.clone()),
            statuses: Vec::new(),
        };
        let existing = self.store.list_applications(&filter).await?;
        if existing
            .iter()
            .any(|application| !application.status.is_terminal())
        {
            return Err(LifecycleError::DuplicateApplication(job.id));
        }

        let now = Utc::now();
        let application = Application {
            id: self.store.allocate_application_id().await?,
            job_id: job.id,
            worker_id: worker_id.clone(),
            status: ApplicationStatus::Pending,
            proposed_price: draft.proposed_price,
            cover_letter: draft.cover_letter.trim().to_string(),
            review: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_application(application).await?;
        info!(application_id = %stored.id, job_id = %stored.job_id, "application submitted");
        Ok(stored)
    }

    /// Validate and commit one lifecycle step.
    ///
    /// Failed requests leave the stored record untouched. A concurrent writer
    /// that commits first makes this call fail with [`LifecycleError::Conflict`].
    pub async fn apply_transition(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        trigger: TransitionTrigger,
    ) -> Result<Application, LifecycleError> {
        let current = self.get(application_id).await?;
        let committed = self.commit_step(actor, &current, trigger).await?;

        if self.auto_close && committed.status == ApplicationStatus::Reviewed {
            return match self
                .commit_step(&Actor::System, &committed, TransitionTrigger::Close)
                .await
            {
                Ok(closed) => Ok(closed),
                Err(err) => {
                    warn!(application_id = %committed.id, error = %err, "automatic close failed");
                    Ok(committed)
                }
            };
        }

        Ok(committed)
    }

    async fn commit_step(
        &self,
        actor: &Actor,
        current: &Application,
        trigger: TransitionTrigger,
    ) -> Result<Application, LifecycleError> {
        let kind = trigger.kind();
        let rule = lifecycle::resolve(current, actor, kind)?;

        if rule.ownership != Ownership::Platform {
            let job = self
                .store
                .get_job(&current.job_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            lifecycle::authorize(rule, actor, current, &job)?;
        }

        if kind == TriggerKind::ReleasePayment && !self.payments.is_cleared(current).await? {
            return Err(LifecycleError::PaymentNotCleared);
        }

        let next = lifecycle::advance(current, rule, trigger, Utc::now())?;
        let committed = self.store.commit(next, current.version).await?;

        debug!(
            application_id = %committed.id,
            from = %rule.from,
            to = %committed.status,
            version = committed.version,
            "application transition committed"
        );
        Ok(committed)
    }

    /// Fetch one application.
    pub async fn get(&self, application_id: &ApplicationId) -> Result<Application, LifecycleError> {
        let application = self
            .store
            .get_application(application_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(application)
    }

    /// Every application filed against a job, in store order.
    pub async fn applications_for_job(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<Application>, LifecycleError> {
        let applications = self
            .store
            .list_applications(&ApplicationFilter::for_job(job_id.clone()))
            .await?;
        Ok(applications)
    }
}
