//! The execution engine
//!
//! Purely reactive: nothing here owns a timer or a worker pool. Every
//! operation is a short, bounded unit of work triggered by an inbound
//! request, and a tick advances its task by exactly one pipeline stage.
//!
//! Two layers keep advancement mutually exclusive per task. In-process,
//! mutating operations take a per-id async mutex; a tick that finds the
//! mutex held no-ops and reports current state instead of running a second
//! stage. At the store, every transition goes through a CAS keyed on the
//! expected pre-increment step, which also protects terminal records from
//! late writers outside this process.

use crate::config::EngineConfig;
use crate::events::{EventSink, QuietSink, TracingSink};
use crate::lease::lease_expired;
use crate::stages::{PIPELINE, StageRunner, TOTAL_STEPS};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tickflow_core::{
    Clock, Error, Execution, ExecutionSnapshot, ExecutionStatus, Market, Result, SystemClock,
    normalize_symbol,
};
use tickflow_market::MarketDataGateway;
use tickflow_store::{CasOutcome, ExecutionStore, ReportStore};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Server-side state machine for client-tick-driven analysis tasks
pub struct ExecutionEngine {
    store: Arc<dyn ExecutionStore>,
    reports: Arc<dyn ReportStore>,
    gateway: Arc<dyn MarketDataGateway>,
    events: QuietSink,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    /// Per-task advisory locks; the store CAS remains the authoritative guard
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ExecutionEngine {
    /// Create an engine with the default sink, clock and configuration
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        reports: Arc<dyn ReportStore>,
        gateway: Arc<dyn MarketDataGateway>,
    ) -> Self {
        Self {
            store,
            reports,
            gateway,
            events: QuietSink::new(Arc::new(TracingSink)),
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Replace the notification/audit sink
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = QuietSink::new(sink);
        self
    }

    /// Replace the clock (tests use a manual clock)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    // =========== Operation surface ===========

    /// Create a new analysis task; returns its id
    ///
    /// The task starts `Running` at step 0 and only moves when ticked.
    pub async fn start(
        &self,
        user_id: &str,
        contact: &str,
        symbol: &str,
        market: &str,
    ) -> Result<String> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(Error::InvalidArgument("symbol is empty".to_string()));
        }
        let market: Market = market.parse()?;

        let now = self.clock.now();
        let execution = Execution::new(user_id, contact, symbol.clone(), market, TOTAL_STEPS, now);
        let id = execution.id.clone();
        self.store.insert(execution).await?;

        info!(%id, %symbol, %market, "analysis task started");
        self.events.audit(user_id, "analysis.start", true, &symbol).await;
        Ok(id)
    }

    /// Advance a task by exactly one pipeline stage
    ///
    /// Ticking a terminal task is a no-op returning its current state. A
    /// stale task demotes to `Stopped` instead of advancing. A tick that
    /// finds another tick in flight no-ops without error and returns the
    /// record as currently stored, which is the pre-advance state until
    /// the in-flight tick commits.
    pub async fn tick(&self, id: &str, caller: &str) -> Result<ExecutionSnapshot> {
        let lock = self.lock_for(id);
        let Ok(_guard) = lock.try_lock() else {
            // Another tick holds the advancement; this one no-ops and
            // reports whatever state it can see
            debug!(%id, "tick arrived while another is in flight");
            let execution = self.load_owned(id, caller).await?;
            return Ok(execution.snapshot());
        };

        let execution = self.load_owned(id, caller).await?;
        if execution.is_terminal() {
            debug!(%id, status = %execution.status, "tick on terminal task is a no-op");
            return Ok(execution.snapshot());
        }

        let now = self.clock.now();
        if lease_expired(now, execution.updated_at, self.config.stale_timeout) {
            return self.demote_stale(execution, now).await;
        }

        let expected = execution.step;
        let Some(stage) = PIPELINE.get(expected as usize).copied() else {
            return Err(Error::InvalidState(format!(
                "no pipeline stage for step {expected}"
            )));
        };
        debug!(%id, step = expected, stage = stage.name(), "running stage");

        let mut working = execution;
        working.updated_at = now;
        let runner = StageRunner {
            gateway: self.gateway.as_ref(),
            reports: self.reports.as_ref(),
            config: &self.config,
        };
        let outcome = match runner.run(stage, &mut working).await {
            Ok(outcome) => outcome,
            Err(err) => return self.fail_task(working, expected, now, stage.name(), err).await,
        };

        working.step += 1;
        working.push_log(now, outcome.log);
        if working.step == working.total_steps {
            working.status = ExecutionStatus::Completed;
            working.result = outcome.result;
        }

        match self.store.cas_update(expected, working.clone()).await? {
            CasOutcome::Committed => {
                if working.status == ExecutionStatus::Completed {
                    info!(%id, symbol = %working.symbol, "analysis completed");
                    self.drop_lock(id);
                    let detail = working
                        .result
                        .as_ref()
                        .map(|r| r.summary.clone())
                        .unwrap_or_default();
                    self.events
                        .notify(caller, "analysis", "Analysis complete", &detail)
                        .await;
                    self.events
                        .audit(caller, "analysis.complete", true, &working.symbol)
                        .await;
                }
                Ok(working.snapshot())
            }
            CasOutcome::Conflict(current) => {
                debug!(%id, "tick lost the advancement race, returning winner state");
                Ok(current.snapshot())
            }
            CasOutcome::Missing => Err(Error::NotFound(format!("execution {id}"))),
        }
    }

    /// Cancel a running task
    pub async fn cancel(&self, id: &str, caller: &str) -> Result<String> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        // Bounded retry: conflicts can only come from writers outside this
        // process, and each retry re-reads their result
        for _ in 0..3 {
            let mut execution = self.load_owned(id, caller).await?;
            if execution.is_terminal() {
                return Err(Error::InvalidState(format!(
                    "task is already {}",
                    execution.status
                )));
            }

            let expected = execution.step;
            let now = self.clock.now();
            execution.status = ExecutionStatus::Canceled;
            execution.push_log(now, "task canceled by user");
            execution.updated_at = now;

            match self.store.cas_update(expected, execution).await? {
                CasOutcome::Committed => {
                    info!(%id, "task canceled");
                    self.drop_lock(id);
                    self.events.audit(caller, "analysis.cancel", true, id).await;
                    return Ok(id.to_string());
                }
                CasOutcome::Conflict(_) => continue,
                CasOutcome::Missing => return Err(Error::NotFound(format!("execution {id}"))),
            }
        }

        Err(Error::StorageFailure(format!(
            "cancel of {id} kept losing update races"
        )))
    }

    /// Cancel every running task the caller owns; returns how many stopped
    ///
    /// The tab-unload safety net: the client fires this as a best-effort
    /// request when the page goes away.
    pub async fn cancel_all(&self, caller: &str) -> Result<usize> {
        let running: Vec<String> = self
            .store
            .list_for_user(caller, self.config.list_scan_limit)
            .await?
            .into_iter()
            .filter(|e| e.status == ExecutionStatus::Running)
            .map(|e| e.id)
            .collect();

        let cancellations =
            futures::future::join_all(running.iter().map(|id| self.cancel(id, caller))).await;
        let stopped = cancellations.into_iter().filter(Result::is_ok).count();

        info!(caller, stopped, "bulk cancel");
        Ok(stopped)
    }

    /// Current snapshot of a task
    ///
    /// Runs the staleness check as a side effect, so an abandoned task
    /// self-heals to `Stopped` even if no further tick ever arrives.
    pub async fn get(&self, id: &str, caller: &str) -> Result<ExecutionSnapshot> {
        let execution = self.load_owned(id, caller).await?;
        let now = self.clock.now();
        if execution.status == ExecutionStatus::Running
            && lease_expired(now, execution.updated_at, self.config.stale_timeout)
        {
            let lock = self.lock_for(id);
            let _guard = lock.lock().await;

            // Re-read under the lock; a racing tick may have renewed the lease
            let execution = self.load_owned(id, caller).await?;
            let now = self.clock.now();
            if execution.status == ExecutionStatus::Running
                && lease_expired(now, execution.updated_at, self.config.stale_timeout)
            {
                return self.demote_stale(execution, now).await;
            }
            return Ok(execution.snapshot());
        }
        Ok(execution.snapshot())
    }

    /// Caller's tasks, newest-updated first; stale entries self-heal
    pub async fn list(&self, caller: &str, limit: usize) -> Result<Vec<ExecutionSnapshot>> {
        let records = self
            .store
            .list_for_user(caller, limit.min(self.config.list_scan_limit))
            .await?;

        let now = self.clock.now();
        let mut snapshots = Vec::with_capacity(records.len());
        for execution in records {
            if execution.status == ExecutionStatus::Running
                && lease_expired(now, execution.updated_at, self.config.stale_timeout)
            {
                // The get path runs the demotion under the task lock
                match self.get(&execution.id, caller).await {
                    Ok(snapshot) => snapshots.push(snapshot),
                    Err(Error::NotFound(_)) => continue,
                    Err(err) => return Err(err),
                }
            } else {
                snapshots.push(execution.snapshot());
            }
        }

        snapshots.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(snapshots)
    }

    /// Hard-delete a task regardless of status
    pub async fn delete(&self, id: &str, caller: &str) -> Result<String> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let execution = self.load_owned(id, caller).await?;
        if execution.status == ExecutionStatus::Running {
            warn!(%id, "deleting a running task");
        }
        self.store.delete(id).await?;
        self.drop_lock(id);
        self.events.audit(caller, "analysis.delete", true, id).await;
        Ok(id.to_string())
    }

    // =========== Internals ===========

    async fn load_owned(&self, id: &str, caller: &str) -> Result<Execution> {
        match self.store.get(id).await? {
            Some(execution) if execution.user_id == caller => Ok(execution),
            _ => Err(Error::NotFound(format!("execution {id}"))),
        }
    }

    /// Demote an abandoned task; step never changes on this path
    async fn demote_stale(
        &self,
        mut execution: Execution,
        now: DateTime<Utc>,
    ) -> Result<ExecutionSnapshot> {
        let expected = execution.step;
        execution.status = ExecutionStatus::Stopped;
        execution.stopped_reason = Some("client abandoned".to_string());
        execution.push_log(
            now,
            format!(
                "task stopped: no client activity within {}s",
                self.config.stale_timeout.as_secs()
            ),
        );
        execution.updated_at = now;

        match self.store.cas_update(expected, execution.clone()).await? {
            CasOutcome::Committed => {
                info!(id = %execution.id, "stale task demoted to stopped");
                self.drop_lock(&execution.id);
                self.events
                    .audit(&execution.user_id, "analysis.stale", true, &execution.symbol)
                    .await;
                Ok(execution.snapshot())
            }
            CasOutcome::Conflict(current) => Ok(current.snapshot()),
            CasOutcome::Missing => {
                Err(Error::NotFound(format!("execution {}", execution.id)))
            }
        }
    }

    /// Record a fatal stage failure, then surface the error to the caller
    async fn fail_task(
        &self,
        mut working: Execution,
        expected: u32,
        now: DateTime<Utc>,
        stage: &str,
        err: Error,
    ) -> Result<ExecutionSnapshot> {
        warn!(id = %working.id, stage, error = %err, "stage failed fatally");
        working.status = ExecutionStatus::Failed;
        working.push_log(now, format!("{stage} failed: {err}"));

        // Best effort: if even this write fails, the original error still
        // reaches the caller
        if let Ok(CasOutcome::Committed) = self.store.cas_update(expected, working.clone()).await {
            self.drop_lock(&working.id);
            self.events
                .audit(&working.user_id, "analysis.fail", false, &err.to_string())
                .await;
        }
        Err(err)
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(id.to_string()).or_default().clone()
    }

    fn drop_lock(&self, id: &str) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.remove(id);
    }
}
