//! In-memory store implementations
//!
//! A `HashMap` behind `tokio::sync::RwLock`; the CAS check runs under the
//! write lock so two racing commits for the same step cannot both pass.

use crate::error::{Result, StoreError};
use crate::store::{CasOutcome, ExecutionStore, ReportStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tickflow_core::{Execution, ExecutionStatus, Report};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory execution store
#[derive(Default)]
pub struct MemoryExecutionStore {
    records: Arc<RwLock<HashMap<String, Execution>>>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn insert(&self, execution: Execution) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&execution.id) {
            return Err(StoreError::DuplicateId(execution.id));
        }
        records.insert(execution.id.clone(), execution);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Execution>> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Execution>> {
        let records = self.records.read().await;
        let mut owned: Vec<Execution> = records
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        owned.truncate(limit);
        Ok(owned)
    }

    async fn cas_update(&self, expected_step: u32, updated: Execution) -> Result<CasOutcome> {
        let mut records = self.records.write().await;
        let Some(current) = records.get(&updated.id) else {
            return Ok(CasOutcome::Missing);
        };

        if current.status != ExecutionStatus::Running || current.step != expected_step {
            debug!(
                id = %updated.id,
                expected_step,
                current_step = current.step,
                current_status = ?current.status,
                "cas conflict"
            );
            return Ok(CasOutcome::Conflict(Box::new(current.clone())));
        }

        records.insert(updated.id.clone(), updated);
        Ok(CasOutcome::Committed)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records.remove(id).is_some())
    }
}

/// In-memory report store
#[derive(Default)]
pub struct MemoryReportStore {
    records: Arc<RwLock<HashMap<String, Report>>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn save(&self, report: Report) -> Result<String> {
        let mut records = self.records.write().await;
        let id = report.id.clone();
        // Idempotent under retried completion
        records.entry(id.clone()).or_insert(report);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Report>> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Report>> {
        let records = self.records.read().await;
        let mut owned: Vec<Report> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned.truncate(limit);
        Ok(owned)
    }
}
