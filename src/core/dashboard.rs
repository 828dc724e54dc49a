//! The store/cursor pair behind one dashboard session.
//!
//! Locks are always taken in the same order: cursor first, then store. The
//! refresh task and the render path both go through this type, so neither
//! can observe a batch half applied or a viewport computed against a stale
//! length.

use crate::collector::types::Sample;
use crate::config::Config;
use crate::core::cursor::{Viewport, ViewportPolicy, WindowCursor};
use crate::core::stats::{StatsSummarizer, SummaryRow};
use crate::core::store::{AppendReport, SampleStore};
use crate::error::InvalidConfigError;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderPayload {
    pub viewport: Viewport,
    pub slice: Vec<Sample>,
    pub summary: [SummaryRow; 3],
    /// Samples currently retained by the store
    pub total_samples: usize,
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// One store, one cursor and the summarizer that reads them.
///
/// The store is private; every mutation goes through `ingest` so the
/// refresh policy and lock order always apply. A reader holding the store
/// lock never sees a partially appended batch.
pub struct Dashboard {
    store: RwLock<SampleStore>,
    cursor: Mutex<WindowCursor>,
    summarizer: StatsSummarizer,
    policy: ViewportPolicy,
}

impl Dashboard {
    /// Build an empty dashboard from configuration.
    pub fn new(config: &Config) -> Result<Self, InvalidConfigError> {
        let store = SampleStore::with_capacity(config.capacity)?;
        let cursor = WindowCursor::new(config.window_size)?;
        Ok(Self {
            store: RwLock::new(store),
            cursor: Mutex::new(cursor),
            summarizer: StatsSummarizer::new(config.stddev),
            policy: config.viewport_policy,
        })
    }

    /// Append a batch and move the viewport according to the policy.
    pub fn ingest(&self, batch: Vec<Sample>) -> AppendReport {
        let mut cursor = self.cursor.lock();
        let mut store = self.store.write();

        let len_before = store.len();
        let report = store.append(batch);
        for rejected in &report.rejected {
            tracing::warn!("Skipped sample: {}", rejected);
        }

        if report.accepted > 0 {
            cursor.on_data_arrived(len_before, store.len(), report.evicted, self.policy);
        }

        report
    }

    pub fn advance(&self, step: i64) -> Result<Viewport, InvalidConfigError> {
        let mut cursor = self.cursor.lock();
        let len = self.store.read().len();
        cursor.advance(step, len)?;
        Ok(cursor.viewport())
    }

    pub fn retreat(&self, step: i64) -> Result<Viewport, InvalidConfigError> {
        let mut cursor = self.cursor.lock();
        cursor.retreat(step)?;
        Ok(cursor.viewport())
    }

    pub fn set_size(&self, size: i64) -> Result<Viewport, InvalidConfigError> {
        let mut cursor = self.cursor.lock();
        let len = self.store.read().len();
        cursor.set_size(size, len)?;
        Ok(cursor.viewport())
    }

    pub fn jump_to_latest(&self) -> Viewport {
        let mut cursor = self.cursor.lock();
        let len = self.store.read().len();
        cursor.jump_to_latest(len);
        cursor.viewport()
    }

    pub fn reset(&self) -> Viewport {
        let mut cursor = self.cursor.lock();
        cursor.reset();
        cursor.viewport()
    }

    pub fn viewport(&self) -> Viewport {
        self.cursor.lock().viewport()
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.store.read().last_timestamp()
    }

    /// Samples in the current viewport.
    pub fn current_slice(&self) -> Vec<Sample> {
        let cursor = self.cursor.lock();
        let store = self.store.read();
        cursor.current_slice(&store)
    }

    /// Resolve the current slice and recompute its summary.
    pub fn render_payload(&self) -> RenderPayload {
        let (viewport, slice, total_samples, last_timestamp) = {
            let cursor = self.cursor.lock();
            let store = self.store.read();
            (
                cursor.viewport(),
                cursor.current_slice(&store),
                store.len(),
                store.last_timestamp(),
            )
        };

        let summary = self.summarizer.summarize(&slice);
        RenderPayload {
            viewport,
            slice,
            summary,
            total_samples,
            last_timestamp,
        }
    }
}
