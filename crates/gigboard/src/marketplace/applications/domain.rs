use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for posted jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identity of a worker; doubles as the directory dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub String);

/// Identity of a client who posts jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Posting state of a job. Only `Open` jobs accept new applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Draft,
    Open,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetType {
    Fixed,
    Hourly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub amount: f64,
    pub budget_type: BudgetType,
}

/// Job posted by a client. Owned by `client_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub client_id: ClientId,
    pub title: String,
    pub status: JobStatus,
    pub category: String,
    pub budget: Budget,
    pub required_skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of an application.
///
/// `Rejected`, `Withdrawn`, and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
    InProgress,
    Completed,
    PaymentReleased,
    PaymentConfirmed,
    Reviewed,
    Closed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 10] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
        ApplicationStatus::InProgress,
        ApplicationStatus::Completed,
        ApplicationStatus::PaymentReleased,
        ApplicationStatus::PaymentConfirmed,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Closed,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::InProgress => "in-progress",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::PaymentReleased => "payment-released",
            ApplicationStatus::PaymentConfirmed => "payment-confirmed",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Closed => "closed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected | ApplicationStatus::Withdrawn | ApplicationStatus::Closed
        )
    }

    /// Statuses whose work counts toward a worker's completed jobs and rating.
    pub const fn counts_as_completed(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Completed | ApplicationStatus::Reviewed | ApplicationStatus::Closed
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Client feedback attached once payment is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

/// A worker's bid against a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub status: ApplicationStatus,
    pub proposed_price: f64,
    pub cover_letter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
    /// Bumped on every committed change; used for optimistic concurrency.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Rating that contributes to reputation, if any.
    pub fn qualifying_rating(&self) -> Option<u8> {
        if !self.status.counts_as_completed() {
            return None;
        }
        self.review
            .as_ref()
            .map(|review| review.rating)
            .filter(|rating| *rating > 0)
    }
}

/// Worker-supplied fields for a new application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub job_id: JobId,
    pub proposed_price: f64,
    #[serde(default)]
    pub cover_letter: String,
}
