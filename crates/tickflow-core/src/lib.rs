//! Core domain model for the tickflow execution engine
//!
//! tickflow drives a multi-stage stock-analysis pipeline in which the
//! client, not the server, supplies the clock: a task only advances when an
//! authenticated tick request arrives for it. This crate holds the pieces
//! every other tickflow crate agrees on:
//!
//! - The [`Execution`] record and its state machine vocabulary
//!   ([`ExecutionStatus`], [`LogEntry`], [`StageData`], [`ExecutionResult`])
//! - The immutable [`Report`] artifact produced at completion
//! - Market data value types ([`Quote`], [`Kline`], [`Fundamentals`], ...)
//! - The [`Error`] taxonomy shared across the operation surface
//! - The [`Clock`] abstraction so lease logic is testable with fake time

pub mod clock;
pub mod data;
pub mod error;
pub mod execution;
pub mod types;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use data::{
    Action, BasicInfo, Decision, Fundamentals, Kline, Quote, QuoteWindow, RiskLevel,
};
pub use error::{Error, Result};
pub use execution::{
    Execution, ExecutionResult, ExecutionSnapshot, ExecutionStatus, LogEntry, Report, StageData,
};
pub use types::{AnalysisDepth, Market, normalize_symbol};
