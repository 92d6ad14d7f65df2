//! Storage traits

use crate::error::Result;
use async_trait::async_trait;
use tickflow_core::{Execution, Report};

/// Result of a conditional execution update
#[derive(Debug)]
pub enum CasOutcome {
    /// The stored record matched the expectation and was replaced
    Committed,
    /// Another writer got there first; carries the current record
    Conflict(Box<Execution>),
    /// No record with that id (deleted concurrently)
    Missing,
}

impl CasOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CasOutcome::Committed)
    }
}

/// Authoritative record of in-flight and finished tasks
///
/// One record per execution, keyed by id, with owner-scoped listing in
/// recency order. All state transitions go through [`cas_update`]
/// (`ExecutionStore::cas_update`): the update commits only if the stored
/// record is still `Running` at `expected_step`, which serializes racing
/// ticks and protects terminal states from late writers.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert a freshly created execution
    async fn insert(&self, execution: Execution) -> Result<()>;

    /// Fetch one execution by id
    async fn get(&self, id: &str) -> Result<Option<Execution>>;

    /// Executions owned by a user, newest `updated_at` first
    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Execution>>;

    /// Conditionally replace the record with id `updated.id`
    ///
    /// Commits only if the stored record is `Running` with
    /// `step == expected_step`; otherwise the current record comes back as
    /// a conflict and `updated` is discarded.
    async fn cas_update(&self, expected_step: u32, updated: Execution) -> Result<CasOutcome>;

    /// Hard-delete; returns whether a record existed
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Immutable store of finished analysis reports
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a report, returning its id
    ///
    /// Idempotent under retried completion: saving a report with an id
    /// that already exists is a no-op returning the existing id.
    async fn save(&self, report: Report) -> Result<String>;

    /// Fetch one report by id
    async fn get(&self, id: &str) -> Result<Option<Report>>;

    /// Reports owned by a user, newest first
    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Report>>;
}
