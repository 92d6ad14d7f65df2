//! Storage traits and reference implementations for tickflow
//!
//! The [`ExecutionStore`] is the only shared mutable resource in the
//! system; every write to a task goes through [`ExecutionStore::cas_update`],
//! a conditional update keyed on the expected pre-increment step. That
//! single primitive is what guarantees pipeline side effects for a given
//! step commit at most once, even under duplicate or racing tick requests.
//!
//! [`ReportStore`] holds the immutable artifacts produced at completion.
//! The in-memory implementations back tests and single-process
//! deployments; a document-store-backed implementation plugs in behind the
//! same traits.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{MemoryExecutionStore, MemoryReportStore};
pub use store::{CasOutcome, ExecutionStore, ReportStore};
