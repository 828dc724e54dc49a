//! Telemetry Viewport - live sensor dashboard core.
//!
//! This library keeps an append-only series of timestamped x/y/z samples,
//! a user-controlled window over it, and the per-axis summary statistics a
//! dashboard shows next to its chart. Rendering is left to the caller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Telemetry Viewport                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Source    │──▶│  Refresh    │──▶│ SampleStore │        │
//! │  │ (sim / csv) │   │ (10s ticks) │   │  (append)   │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                           │                 │               │
//! │                           ▼                 ▼               │
//! │                    ┌─────────────┐   ┌─────────────┐        │
//! │                    │  Activity   │   │WindowCursor │        │
//! │                    │    Log      │   │ + Summary   │──▶ render
//! │                    └─────────────┘   └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use telemetry_viewport::{activity, collector, scheduler, Config, Dashboard};
//!
//! # async fn run() {
//! let config = Config::default();
//! let dashboard = Arc::new(Dashboard::new(&config).expect("valid config"));
//! let source = collector::create_source(&config.source).expect("source");
//!
//! let mut refresh = scheduler::RefreshScheduler::new(
//!     (&config).into(),
//!     dashboard.clone(),
//!     source,
//!     Arc::new(activity::ActivityLog::in_memory()),
//! );
//! let events = refresh.subscribe();
//! refresh.start().expect("fresh scheduler");
//!
//! // After each event, pull a frame
//! let _ = events.recv();
//! let payload = dashboard.render_payload();
//! println!("{} samples in view", payload.slice.len());
//! # }
//! ```

pub mod activity;
pub mod collector;
pub mod config;
pub mod core;
pub mod error;
pub mod scheduler;

// Re-export key types at crate root for convenience
pub use activity::{ActivityLog, ActivityRecord, ActivityTotals, SharedActivityLog};
pub use collector::{Axis, CsvReplaySource, Sample, SampleSource, SimulatedSource};
pub use config::{Config, SourceConfig, SourceKind};
pub use core::{
    AppendReport, Dashboard, RenderPayload, SampleStore, StatsSummarizer, StdDevConvention,
    SummaryRow, Viewport, ViewportPolicy, WindowCursor,
};
pub use error::{FetchError, InvalidConfigError, InvalidSampleError};
pub use scheduler::{RefreshEvent, RefreshScheduler, SchedulerConfig, SchedulerError, SchedulerState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Format a statistic for display, showing `-` for NaN.
pub fn format_stat(value: f64) -> String {
    if value.is_nan() {
        "-".to_string()
    } else {
        format!("{value:.2}")
    }
}

/// Render the summary rows as the statistic/value table dashboards show.
pub fn summary_table(rows: &[SummaryRow]) -> String {
    let mut out = String::from("Statistic      Value\n");
    for row in rows {
        let label = row.axis.name().to_uppercase();
        out.push_str(&format!("{label} Mean       {:>8}\n", format_stat(row.mean)));
        out.push_str(&format!("{label} Median     {:>8}\n", format_stat(row.median)));
        out.push_str(&format!("{label} Std Dev    {:>8}\n", format_stat(row.stddev)));
    }
    out
}
