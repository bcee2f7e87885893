//! # consistency-probe
//!
//! Measures how often a workflow engine's read APIs disagree right after a
//! search has already returned a record.
//!
//! Each trial starts a process instance, polls the task search until the
//! instance's user task appears, then immediately reads that task by key and
//! queries its variables. Failures are classified per stage and tallied
//! across the run.

pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod model;
pub mod poll;
pub mod telemetry;
