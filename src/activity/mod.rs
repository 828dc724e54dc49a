//! Activity accounting for the refresh scheduler.
//!
//! Tracks how much data each session ingested and how many fetches failed,
//! and persists the totals for the `status` command.

pub mod log;

pub use log::{ActivityLog, ActivityRecord, ActivityTotals, SharedActivityLog};
