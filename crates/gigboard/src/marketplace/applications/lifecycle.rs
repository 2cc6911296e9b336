//! Transition table for the application lifecycle.
//!
//! Everything here is pure: the service fetches records, asks this module what
//! the next record looks like, and commits it with a version check.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationStatus, ClientId, Job, Review, WorkerId};
use super::repository::RepositoryError;

/// Who is asking for a transition. Always passed explicitly by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "kebab-case")]
pub enum Actor {
    Client(ClientId),
    Worker(WorkerId),
    System,
}

impl Actor {
    pub fn role(&self) -> ActorRole {
        match self {
            Actor::Client(_) => ActorRole::Client,
            Actor::Worker(_) => ActorRole::Worker,
            Actor::System => ActorRole::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorRole {
    Client,
    Worker,
    System,
}

/// Client feedback supplied with the `Review` trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPayload {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ReviewPayload {
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 5;

    fn into_review(self, now: DateTime<Utc>) -> Result<Review, LifecycleError> {
        if !(Self::MIN_RATING..=Self::MAX_RATING).contains(&self.rating) {
            return Err(LifecycleError::InvalidReview {
                rating: self.rating,
            });
        }

        let comment = self
            .comment
            .map(|comment| comment.trim().to_string())
            .filter(|comment| !comment.is_empty());

        Ok(Review {
            rating: self.rating,
            comment,
            reviewed_at: now,
        })
    }
}

/// Requested lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "kebab-case")]
pub enum TransitionTrigger {
    Accept,
    Reject,
    Withdraw,
    Start,
    Complete,
    ReleasePayment,
    ConfirmPayment,
    Review(ReviewPayload),
    Close,
}

impl TransitionTrigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TransitionTrigger::Accept => TriggerKind::Accept,
            TransitionTrigger::Reject => TriggerKind::Reject,
            TransitionTrigger::Withdraw => TriggerKind::Withdraw,
            TransitionTrigger::Start => TriggerKind::Start,
            TransitionTrigger::Complete => TriggerKind::Complete,
            TransitionTrigger::ReleasePayment => TriggerKind::ReleasePayment,
            TransitionTrigger::ConfirmPayment => TriggerKind::ConfirmPayment,
            TransitionTrigger::Review(_) => TriggerKind::Review,
            TransitionTrigger::Close => TriggerKind::Close,
        }
    }
}

/// Payload-free trigger discriminant used by the transition table and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    Accept,
    Reject,
    Withdraw,
    Start,
    Complete,
    ReleasePayment,
    ConfirmPayment,
    Review,
    Close,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 9] = [
        TriggerKind::Accept,
        TriggerKind::Reject,
        TriggerKind::Withdraw,
        TriggerKind::Start,
        TriggerKind::Complete,
        TriggerKind::ReleasePayment,
        TriggerKind::ConfirmPayment,
        TriggerKind::Review,
        TriggerKind::Close,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            TriggerKind::Accept => "accept",
            TriggerKind::Reject => "reject",
            TriggerKind::Withdraw => "withdraw",
            TriggerKind::Start => "start",
            TriggerKind::Complete => "complete",
            TriggerKind::ReleasePayment => "release-payment",
            TriggerKind::ConfirmPayment => "confirm-payment",
            TriggerKind::Review => "review",
            TriggerKind::Close => "close",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which record the actor must own for a rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The client must own the application's job.
    JobOwner,
    /// The worker must own the application.
    ApplicationOwner,
    /// Either the job's client or the application's worker.
    EitherParty,
    /// Issued by the platform itself.
    Platform,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: ApplicationStatus,
    pub trigger: TriggerKind,
    pub to: ApplicationStatus,
    pub roles: &'static [ActorRole],
    pub ownership: Ownership,
}

pub const TRANSITIONS: [TransitionRule; 9] = [
    TransitionRule {
        from: ApplicationStatus::Pending,
        trigger: TriggerKind::Accept,
        to: ApplicationStatus::Accepted,
        roles: &[ActorRole::Client],
        ownership: Ownership::JobOwner,
    },
    TransitionRule {
        from: ApplicationStatus::Pending,
        trigger: TriggerKind::Reject,
        to: ApplicationStatus::Rejected,
        roles: &[ActorRole::Client],
        ownership: Ownership::JobOwner,
    },
    TransitionRule {
        from: ApplicationStatus::Pending,
        trigger: TriggerKind::Withdraw,
        to: ApplicationStatus::Withdrawn,
        roles: &[ActorRole::Worker],
        ownership: Ownership::ApplicationOwner,
    },
    TransitionRule {
        from: ApplicationStatus::Accepted,
        trigger: TriggerKind::Start,
        to: ApplicationStatus::InProgress,
        roles: &[ActorRole::Client, ActorRole::Worker],
        ownership: Ownership::EitherParty,
    },
    TransitionRule {
        from: ApplicationStatus::InProgress,
        trigger: TriggerKind::Complete,
        to: ApplicationStatus::Completed,
        roles: &[ActorRole::Client, ActorRole::Worker],
        ownership: Ownership::EitherParty,
    },
    TransitionRule {
        from: ApplicationStatus::Completed,
        trigger: TriggerKind::ReleasePayment,
        to: ApplicationStatus::PaymentReleased,
        roles: &[ActorRole::Client],
        ownership: Ownership::JobOwner,
    },
    TransitionRule {
        from: ApplicationStatus::PaymentReleased,
        trigger: TriggerKind::ConfirmPayment,
        to: ApplicationStatus::PaymentConfirmed,
        roles: &[ActorRole::Worker],
        ownership: Ownership::ApplicationOwner,
    },
    TransitionRule {
        from: ApplicationStatus::PaymentConfirmed,
        trigger: TriggerKind::Review,
        to: ApplicationStatus::Reviewed,
        roles: &[ActorRole::Client],
        ownership: Ownership::JobOwner,
    },
    TransitionRule {
        from: ApplicationStatus::Reviewed,
        trigger: TriggerKind::Close,
        to: ApplicationStatus::Closed,
        roles: &[ActorRole::System],
        ownership: Ownership::Platform,
    },
];

/// Look up the rule for a `(from, trigger)` pair.
pub fn rule_for(from: ApplicationStatus, trigger: TriggerKind) -> Option<&'static TransitionRule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.trigger == trigger)
}

/// Resolve the rule for a request, checking the state and the actor's role.
pub fn resolve(
    application: &Application,
    actor: &Actor,
    trigger: TriggerKind,
) -> Result<&'static TransitionRule, LifecycleError> {
    let invalid = || LifecycleError::InvalidTransition {
        from: application.status,
        trigger,
    };

    let rule = rule_for(application.status, trigger).ok_or_else(invalid)?;
    if !rule.roles.contains(&actor.role()) {
        return Err(invalid());
    }
    Ok(rule)
}

/// Check that the actor owns the record the rule requires.
pub fn authorize(
    rule: &TransitionRule,
    actor: &Actor,
    application: &Application,
    job: &Job,
) -> Result<(), LifecycleError> {
    let owns_job = matches!(actor, Actor::Client(client) if *client == job.client_id);
    let owns_application =
        matches!(actor, Actor::Worker(worker) if *worker == application.worker_id);

    let allowed = match rule.ownership {
        Ownership::JobOwner => owns_job,
        Ownership::ApplicationOwner => owns_application,
        Ownership::EitherParty => owns_job || owns_application,
        Ownership::Platform => matches!(actor, Actor::System),
    };

    if allowed {
        Ok(())
    } else {
        Err(LifecycleError::NotAuthorized {
            trigger: rule.trigger,
        })
    }
}

/// Produce the next revision of the application without mutating the input.
pub fn advance(
    application: &Application,
    rule: &TransitionRule,
    trigger: TransitionTrigger,
    now: DateTime<Utc>,
) -> Result<Application, LifecycleError> {
    let mut next = application.clone();
    if let TransitionTrigger::Review(payload) = trigger {
        next.review = Some(payload.into_review(now)?);
    }
    next.status = rule.to;
    next.version = application.version + 1;
    next.updated_at = now;
    Ok(next)
}

/// Error raised by the lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot {trigger} an application that is {from}")]
    InvalidTransition {
        from: ApplicationStatus,
        trigger: TriggerKind,
    },
    #[error("actor is not a party allowed to {trigger} this application")]
    NotAuthorized { trigger: TriggerKind },
    #[error("only workers may submit applications")]
    NotAWorker,
    #[error("review rating must be between 1 and 5 (found {rating})")]
    InvalidReview { rating: u8 },
    #[error("payment has not cleared for release")]
    PaymentNotCleared,
    #[error("job {0} is not open for applications")]
    JobNotOpen(super::domain::JobId),
    #[error("worker already has an active application on job {0}")]
    DuplicateApplication(super::domain::JobId),
    #[error("proposed price must be a positive amount")]
    InvalidProposal,
    #[error("application was modified concurrently; reload and retry")]
    Conflict,
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for LifecycleError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => LifecycleError::Conflict,
            RepositoryError::ActiveApplicationExists(job_id) => {
                LifecycleError::DuplicateApplication(job_id)
            }
            other => LifecycleError::Repository(other),
        }
    }
}
