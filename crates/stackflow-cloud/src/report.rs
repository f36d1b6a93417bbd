//! Reconciliation report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-resource result of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    /// Provider call succeeded and the ledger recorded it
    Created,
    /// Already in the ledger (provision) or not in the ledger (teardown)
    Skipped,
    /// Dry run: would be created
    WouldCreate,
    /// Unknown `type` in the resources group
    Unsupported,
    /// Provider, timeout or ledger failure
    Failed,
    /// Resource already exists outside the ledger
    Conflict,
    /// Teardown: provider deleted it and the ledger entry was removed
    Deleted,
    /// Dry run teardown: would be deleted
    WouldDelete,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Created => write!(f, "created"),
            OutcomeStatus::Skipped => write!(f, "skipped"),
            OutcomeStatus::WouldCreate => write!(f, "would-create"),
            OutcomeStatus::Unsupported => write!(f, "unsupported"),
            OutcomeStatus::Failed => write!(f, "failed"),
            OutcomeStatus::Conflict => write!(f, "conflict"),
            OutcomeStatus::Deleted => write!(f, "deleted"),
            OutcomeStatus::WouldDelete => write!(f, "would-delete"),
        }
    }
}

/// Where a failed outcome went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider rejected the call
    Provider,
    /// The provider call did not finish in time
    Timeout,
    /// The provider succeeded but the ledger write failed; the resource may
    /// now exist without being tracked
    Ledger,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Provider => write!(f, "provider"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Ledger => write!(f, "ledger"),
        }
    }
}

/// Outcome for a single declared resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Ledger type (e.g., "buckets"), or the raw tag for unsupported entries
    pub resource_type: String,

    pub resource_id: String,

    pub status: OutcomeStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,

    /// Error message or informational note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Outcome {
    fn new(resource_type: &str, resource_id: &str, status: OutcomeStatus) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            status,
            failure: None,
            detail: None,
        }
    }

    pub fn created(resource_type: &str, resource_id: &str) -> Self {
        Self::new(resource_type, resource_id, OutcomeStatus::Created)
    }

    pub fn skipped(resource_type: &str, resource_id: &str) -> Self {
        Self::new(resource_type, resource_id, OutcomeStatus::Skipped)
    }

    pub fn would_create(resource_type: &str, resource_id: &str) -> Self {
        Self::new(resource_type, resource_id, OutcomeStatus::WouldCreate)
    }

    pub fn unsupported(type_tag: &str, resource_id: &str) -> Self {
        Self::new(type_tag, resource_id, OutcomeStatus::Unsupported)
    }

    pub fn failed(
        resource_type: &str,
        resource_id: &str,
        failure: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(resource_type, resource_id, OutcomeStatus::Failed)
        }
        .with_detail(detail)
    }

    pub fn conflict(resource_type: &str, resource_id: &str, detail: impl Into<String>) -> Self {
        Self::new(resource_type, resource_id, OutcomeStatus::Conflict).with_detail(detail)
    }

    pub fn deleted(resource_type: &str, resource_id: &str) -> Self {
        Self::new(resource_type, resource_id, OutcomeStatus::Deleted)
    }

    pub fn would_delete(resource_type: &str, resource_id: &str) -> Self {
        Self::new(resource_type, resource_id, OutcomeStatus::WouldDelete)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// Which reconciliation pass produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Provision,
    Teardown,
}

/// Ordered per-resource outcomes of one pass
///
/// Partial failure is never an `Err`; callers inspect the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub action: ReconcileAction,

    pub dry_run: bool,

    pub started_at: DateTime<Utc>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,

    pub outcomes: Vec<Outcome>,
}

impl ReconcileReport {
    pub fn new(action: ReconcileAction, dry_run: bool) -> Self {
        Self {
            action,
            dry_run,
            started_at: Utc::now(),
            duration_ms: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(Outcome::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Outcomes with the given status
    pub fn by_status(&self, status: OutcomeStatus) -> Vec<&Outcome> {
        self.outcomes.iter().filter(|o| o.status == status).collect()
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            created: self.count(OutcomeStatus::Created),
            skipped: self.count(OutcomeStatus::Skipped),
            would_create: self.count(OutcomeStatus::WouldCreate),
            unsupported: self.count(OutcomeStatus::Unsupported),
            failed: self.count(OutcomeStatus::Failed),
            conflict: self.count(OutcomeStatus::Conflict),
            deleted: self.count(OutcomeStatus::Deleted),
            would_delete: self.count(OutcomeStatus::WouldDelete),
        }
    }
}

/// Aggregate counts of a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub created: usize,
    pub skipped: usize,
    pub would_create: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub conflict: usize,
    pub deleted: usize,
    pub would_delete: usize,
}

impl ReportSummary {
    pub fn total(&self) -> usize {
        self.created
            + self.skipped
            + self.would_create
            + self.unsupported
            + self.failed
            + self.conflict
            + self.deleted
            + self.would_delete
    }
}

impl std::fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = [
            (self.created, "created"),
            (self.would_create, "would create"),
            (self.deleted, "deleted"),
            (self.would_delete, "would delete"),
            (self.skipped, "skipped"),
            (self.conflict, "conflict"),
            (self.unsupported, "unsupported"),
            (self.failed, "failed"),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{} {}", n, label))
        .collect();

        if parts.is_empty() {
            write!(f, "no resources declared")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
