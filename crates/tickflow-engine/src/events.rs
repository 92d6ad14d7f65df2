//! Notification and audit side channel
//!
//! Sinks are observability, never correctness: the engine only talks to
//! them through [`QuietSink`], which discards failures at the boundary
//! instead of scattering ignore-blocks through the state machine.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// A sink delivery failure; always swallowed by the engine
#[derive(Debug, Error)]
#[error("event sink error: {0}")]
pub struct SinkError(pub String);

/// Best-effort side channel for user notifications and the audit trail
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    /// User-facing notification
    async fn notify(
        &self,
        user_id: &str,
        kind: &str,
        title: &str,
        detail: &str,
    ) -> Result<(), SinkError>;

    /// Operation audit trail entry
    async fn audit(
        &self,
        user_id: &str,
        action: &str,
        success: bool,
        detail: &str,
    ) -> Result<(), SinkError>;
}

/// Default sink: structured log lines, nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn notify(
        &self,
        user_id: &str,
        kind: &str,
        title: &str,
        detail: &str,
    ) -> Result<(), SinkError> {
        info!(user_id, kind, title, detail, "notify");
        Ok(())
    }

    async fn audit(
        &self,
        user_id: &str,
        action: &str,
        success: bool,
        detail: &str,
    ) -> Result<(), SinkError> {
        info!(user_id, action, success, detail, "audit");
        Ok(())
    }
}

/// Result-discarding adapter around any sink
///
/// Every engine emission goes through here, so a broken notification
/// service can never fail a tick.
#[derive(Clone)]
pub struct QuietSink {
    inner: Arc<dyn EventSink>,
}

impl QuietSink {
    pub fn new(inner: Arc<dyn EventSink>) -> Self {
        Self { inner }
    }

    pub async fn notify(&self, user_id: &str, kind: &str, title: &str, detail: &str) {
        if let Err(err) = self.inner.notify(user_id, kind, title, detail).await {
            debug!(user_id, kind, error = %err, "notification dropped");
        }
    }

    pub async fn audit(&self, user_id: &str, action: &str, success: bool, detail: &str) {
        if let Err(err) = self.inner.audit(user_id, action, success, detail).await {
            debug!(user_id, action, error = %err, "audit entry dropped");
        }
    }
}
