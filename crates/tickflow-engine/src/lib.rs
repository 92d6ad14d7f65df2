//! Client-tick-driven execution engine for symbol analysis tasks
//!
//! The engine holds no background workers and no timers. Clients drive it:
//! a task is created `Running` at step 0 and advances exactly one pipeline
//! stage per tick request, finishing after [`TOTAL_STEPS`] ticks with a
//! published report. Tasks whose client stops ticking are demoted to
//! `Stopped` by a lease check run on the next read, whoever performs it.

mod config;
mod engine;
mod events;
mod lease;
mod scorer;
mod stages;

pub use config::EngineConfig;
pub use engine::ExecutionEngine;
pub use events::{EventSink, QuietSink, SinkError, TracingSink};
pub use lease::lease_expired;
pub use scorer::{DecisionSignals, score};
pub use stages::TOTAL_STEPS;
