//! Core viewport subsystem.
//!
//! This module contains:
//! - The append-only sample store
//! - The window cursor and its refresh policies
//! - Per-axis summary statistics
//! - The dashboard that ties one store and one cursor together

pub mod cursor;
pub mod dashboard;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use cursor::{Viewport, ViewportPolicy, WindowCursor, DEFAULT_WINDOW_SIZE};
pub use dashboard::{Dashboard, RenderPayload};
pub use stats::{StatsSummarizer, StdDevConvention, SummaryRow};
pub use store::{AppendReport, SampleStore};
