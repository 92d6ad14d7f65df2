//! The Execution record and the Report artifact
//!
//! An [`Execution`] is one instance of the tick-driven analysis pipeline
//! for a symbol. It is the authoritative mutable record of the task:
//! creation puts it in [`ExecutionStatus::Running`] at step 0, every tick
//! advances it by exactly one stage, and every path out of `Running` is a
//! terminal sink state. `updated_at` doubles as the lease renewal
//! timestamp for the staleness policy.

use crate::data::{BasicInfo, Decision, Fundamentals, Kline, QuoteWindow};
use crate::types::{AnalysisDepth, Market};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task status; `Running` is the sole non-terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Canceled,
    Stopped,
}

impl ExecutionStatus {
    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Canceled => "canceled",
            ExecutionStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only progress log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Typed pipeline context carried between stages
///
/// Each stage fills exactly one slot, so step n+1 never refetches what
/// step n already obtained. Absent slots mean the stage has not run yet or
/// its data source was unavailable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageData {
    pub basic: Option<BasicInfo>,
    pub quotes: Option<QuoteWindow>,
    pub fundamentals: Option<Fundamentals>,
    pub klines: Option<Vec<Kline>>,
    pub decision: Option<Decision>,
}

/// Final outcome attached to a completed execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub report_id: String,
    pub summary: String,
    pub recommendation: String,
    pub confidence_score: u8,
    pub risk_level: String,
}

/// One analysis task, driven forward one stage per client tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub user_id: String,
    /// Owner's contact handle for completion notifications
    pub contact: String,
    pub symbol: String,
    pub market: Market,
    pub depth: AnalysisDepth,
    pub step: u32,
    pub total_steps: u32,
    pub status: ExecutionStatus,
    pub logs: Vec<LogEntry>,
    pub context: StageData,
    pub result: Option<ExecutionResult>,
    /// Set only when demoted to `Stopped` via the staleness path
    pub stopped_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    /// The lease clock; bumped on every successful transition
    pub updated_at: DateTime<Utc>,
}

impl Execution {
    /// Create a fresh running task at step 0 with its creation log line
    pub fn new(
        user_id: impl Into<String>,
        contact: impl Into<String>,
        symbol: impl Into<String>,
        market: Market,
        total_steps: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            contact: contact.into(),
            symbol: symbol.into(),
            market,
            depth: AnalysisDepth::Deep,
            step: 0,
            total_steps,
            status: ExecutionStatus::Running,
            logs: vec![LogEntry {
                timestamp: now,
                text: "task created".to_string(),
            }],
            context: StageData::default(),
            result: None,
            stopped_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derived completion percentage, 0-100
    pub fn progress(&self) -> u8 {
        if self.total_steps == 0 {
            return 0;
        }
        (f64::from(self.step) / f64::from(self.total_steps) * 100.0).round() as u8
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append a log line; logs are append-only for the life of the task
    pub fn push_log(&mut self, now: DateTime<Utc>, text: impl Into<String>) {
        self.logs.push(LogEntry {
            timestamp: now,
            text: text.into(),
        });
    }

    /// The caller-facing view of this task
    pub fn snapshot(&self) -> ExecutionSnapshot {
        ExecutionSnapshot {
            id: self.id.clone(),
            symbol: self.symbol.clone(),
            market: self.market,
            depth: self.depth,
            status: self.status,
            step: self.step,
            total_steps: self.total_steps,
            progress: self.progress(),
            logs: self.logs.clone(),
            result: self.result.clone(),
            stopped_reason: self.stopped_reason.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Caller-facing view of an execution
///
/// Same shape as [`Execution`] minus ownership/contact internals, with the
/// derived progress percentage materialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub id: String,
    pub symbol: String,
    pub market: Market,
    pub depth: AnalysisDepth,
    pub status: ExecutionStatus,
    pub step: u32,
    pub total_steps: u32,
    pub progress: u8,
    pub logs: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable artifact produced once, when a task completes its last stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub execution_id: String,
    pub user_id: String,
    pub symbol: String,
    pub market: Market,
    pub summary: String,
    pub decision: Decision,
    /// The pipeline context as it stood at completion
    pub snapshot: StageData,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(execution: &Execution, summary: impl Into<String>, decision: Decision) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            execution_id: execution.id.clone(),
            user_id: execution.user_id.clone(),
            symbol: execution.symbol.clone(),
            market: execution.market,
            summary: summary.into(),
            decision,
            snapshot: execution.context.clone(),
            created_at: execution.updated_at,
        }
    }
}
