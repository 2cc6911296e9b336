//! Job applications and the lifecycle that moves them from bid to close.
//!
//! The lifecycle manager is the only writer of application status. It never
//! touches sibling applications on the same job: accepting one bid does not
//! reject the others.

pub mod domain;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationStatus, Budget, BudgetType, ClientId,
    Job, JobId, JobStatus, Review, WorkerId,
};
pub use lifecycle::{
    Actor, ActorRole, LifecycleError, ReviewPayload, TransitionRule, TransitionTrigger,
    TriggerKind, TRANSITIONS,
};
pub use repository::{
    ApplicationFilter, ApplicationStatusView, ApplicationStore, ExternallySettled, PaymentGate,
    RepositoryError,
};
pub use router::application_router;
pub use service::LifecycleManager;
