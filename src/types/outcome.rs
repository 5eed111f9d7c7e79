use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::Error;

use super::BundleName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Install,
    Uninstall,
}

/// A single step of an install or uninstall, in the order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Confirm,
    ReadInstallScript,
    Connect,
    CreateSchema,
    GrantPrivileges,
    SetSearchPath,
    RunInstallScript,
    ReadDemoData,
    RunDemoData,
    Rollback,
    DeleteCategories,
    DropSchema,
    UpdateLedger,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Confirm => "confirm",
            Step::ReadInstallScript => "read install.sql",
            Step::Connect => "connect",
            Step::CreateSchema => "create schema",
            Step::GrantPrivileges => "grant privileges",
            Step::SetSearchPath => "set search_path",
            Step::RunInstallScript => "run install.sql",
            Step::ReadDemoData => "read demodata.sql",
            Step::RunDemoData => "run demodata.sql",
            Step::Rollback => "rollback",
            Step::DeleteCategories => "delete web categories",
            Step::DropSchema => "drop schema",
            Step::UpdateLedger => "update ledger",
        };
        f.pad(s)
    }
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum StepError {
    #[error("schema already exists")]
    SchemaExists,

    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Whether the session that produced this error may be mid-statement.
    pub fn poisons_session(&self) -> bool {
        matches!(self, StepError::Timeout(_) | StepError::Cancelled)
    }
}

impl From<Error> for StepError {
    fn from(err: Error) -> Self {
        match err {
            Error::SchemaExists(_) => StepError::SchemaExists,
            Error::Database(e) => StepError::Database(e.to_string()),
            Error::Io(e) => StepError::Io(e.to_string()),
            Error::Timeout(d) => StepError::Timeout(d),
            Error::Cancelled => StepError::Cancelled,
            other => StepError::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Skipped { reason: String },
    Failed { error: StepError },
}

impl StepStatus {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StepStatus::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(error: StepError) -> Self {
        StepStatus::Failed { error }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed { .. })
    }
}

impl From<std::result::Result<(), StepError>> for StepStatus {
    fn from(result: std::result::Result<(), StepError>) -> Self {
        match result {
            Ok(()) => StepStatus::Succeeded,
            Err(error) => StepStatus::Failed { error },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    #[serde(flatten)]
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Every attempted step succeeded.
    Succeeded,
    /// Some steps failed but the ledger was updated.
    Partial,
    /// The ledger could not be updated.
    Failed,
    /// Confirmation was declined; nothing was changed.
    Declined,
    /// Cancelled before completion; the ledger was not updated.
    Cancelled,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeStatus::Succeeded => "succeeded",
            OutcomeStatus::Partial => "partial",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Declined => "declined",
            OutcomeStatus::Cancelled => "cancelled",
        };
        f.pad(s)
    }
}

/// Report of one install or uninstall attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningOutcome {
    pub bundle: BundleName,
    pub action: Action,
    pub status: OutcomeStatus,
    pub steps: Vec<StepRecord>,
    pub declined: bool,
    pub cancelled: bool,
    /// The uninstall that ran first when reinstalling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Box<ProvisioningOutcome>>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProvisioningOutcome {
    pub fn new(bundle: BundleName, action: Action) -> Self {
        Self {
            bundle,
            action,
            status: OutcomeStatus::Succeeded,
            steps: Vec::new(),
            declined: false,
            cancelled: false,
            previous: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Appends a step result and logs it.
    pub fn record(&mut self, step: Step, status: impl Into<StepStatus>) {
        let status = status.into();
        match &status {
            StepStatus::Succeeded => info!(bundle = %self.bundle, "{step}: ok"),
            StepStatus::Skipped { reason } => info!(bundle = %self.bundle, "{step}: skipped ({reason})"),
            StepStatus::Failed { error } => warn!(bundle = %self.bundle, "{step}: failed: {error}"),
        }
        if let StepStatus::Failed {
            error: StepError::Cancelled,
        } = &status
        {
            self.cancelled = true;
        }
        self.steps.push(StepRecord { step, status });
    }

    /// Latest recorded status for a step.
    pub fn status_of(&self, step: Step) -> Option<&StepStatus> {
        self.steps
            .iter()
            .rev()
            .find(|r| r.step == step)
            .map(|r| &r.status)
    }

    pub fn succeeded(&self, step: Step) -> bool {
        matches!(self.status_of(step), Some(StepStatus::Succeeded))
    }

    pub fn error_of(&self, step: Step) -> Option<&StepError> {
        match self.status_of(step) {
            Some(StepStatus::Failed { error }) => Some(error),
            _ => None,
        }
    }

    pub fn failed_steps(&self) -> Vec<Step> {
        self.steps
            .iter()
            .filter(|r| r.status.is_failed())
            .map(|r| r.step)
            .collect()
    }

    /// True when a schema created by this attempt was dropped again.
    pub fn rolled_back(&self) -> bool {
        self.succeeded(Step::Rollback)
    }

    pub fn mark_declined(&mut self) {
        self.declined = true;
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Stamps the finish time and computes the overall status.
    pub fn finish(mut self) -> Self {
        self.status = if self.declined {
            OutcomeStatus::Declined
        } else if self.cancelled {
            OutcomeStatus::Cancelled
        } else if self.status_of(Step::UpdateLedger).is_some_and(StepStatus::is_failed) {
            OutcomeStatus::Failed
        } else if self.steps.iter().any(|r| r.status.is_failed()) {
            OutcomeStatus::Partial
        } else {
            OutcomeStatus::Succeeded
        };
        self.finished_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> ProvisioningOutcome {
        ProvisioningOutcome::new(BundleName::new("shop").unwrap(), Action::Install)
    }

    #[test]
    fn test_clean_run_succeeds() {
        let mut o = outcome();
        o.record(Step::ReadInstallScript, StepStatus::Succeeded);
        o.record(Step::UpdateLedger, StepStatus::Succeeded);
        let o = o.finish();
        assert_eq!(o.status, OutcomeStatus::Succeeded);
        assert!(o.finished_at.is_some());
        assert!(o.failed_steps().is_empty());
    }

    #[test]
    fn test_skipped_steps_do_not_fail() {
        let mut o = outcome();
        o.record(Step::ReadInstallScript, StepStatus::skipped("not present"));
        o.record(Step::UpdateLedger, StepStatus::Succeeded);
        assert_eq!(o.finish().status, OutcomeStatus::Succeeded);
    }

    #[test]
    fn test_sql_failure_with_ledger_update_is_partial() {
        let mut o = outcome();
        o.record(Step::CreateSchema, StepStatus::failed(StepError::SchemaExists));
        o.record(Step::UpdateLedger, StepStatus::Succeeded);
        let o = o.finish();
        assert_eq!(o.status, OutcomeStatus::Partial);
        assert_eq!(o.failed_steps(), vec![Step::CreateSchema]);
        assert_eq!(o.error_of(Step::CreateSchema), Some(&StepError::SchemaExists));
    }

    #[test]
    fn test_ledger_failure_is_failed() {
        let mut o = outcome();
        o.record(Step::UpdateLedger, StepStatus::failed(StepError::Ledger("disk full".into())));
        assert_eq!(o.finish().status, OutcomeStatus::Failed);
    }

    #[test]
    fn test_cancelled_step_marks_outcome() {
        let mut o = outcome();
        o.record(Step::RunInstallScript, StepStatus::failed(StepError::Cancelled));
        assert!(o.cancelled);
        assert_eq!(o.finish().status, OutcomeStatus::Cancelled);
    }

    #[test]
    fn test_declined_wins() {
        let mut o = ProvisioningOutcome::new(BundleName::new("shop").unwrap(), Action::Uninstall);
        o.record(Step::Confirm, StepStatus::skipped("declined"));
        o.mark_declined();
        assert_eq!(o.finish().status, OutcomeStatus::Declined);
    }

    #[test]
    fn test_status_of_returns_latest() {
        let mut o = outcome();
        o.record(Step::Connect, StepStatus::failed(StepError::Timeout(Duration::from_secs(1))));
        o.record(Step::Connect, StepStatus::Succeeded);
        assert!(o.succeeded(Step::Connect));
    }

    #[test]
    fn test_serializes_step_status_inline() {
        let mut o = outcome();
        o.record(Step::CreateSchema, StepStatus::failed(StepError::SchemaExists));
        let json = serde_json::to_value(o.finish()).unwrap();
        assert_eq!(json["status"], "partial");
        assert_eq!(json["steps"][0]["step"], "create_schema");
        assert_eq!(json["steps"][0]["status"], "failed");
        assert_eq!(json["steps"][0]["error"]["kind"], "schema_exists");
    }
}
