//! Ingestion activity log.
//!
//! Counts what the refresh scheduler did (ticks, accepted and refused
//! samples, evictions, failed fetches) so a running or finished session can
//! be audited without keeping any sample data around. A persistent log adds
//! the current session on top of the totals saved by earlier sessions.

use crate::core::store::AppendReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Plain counter values, for one session or accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTotals {
    pub ticks: u64,
    pub samples_accepted: u64,
    pub samples_rejected: u64,
    pub samples_evicted: u64,
    pub fetch_failures: u64,
}

impl ActivityTotals {
    fn combined(self, other: Self) -> Self {
        Self {
            ticks: self.ticks + other.ticks,
            samples_accepted: self.samples_accepted + other.samples_accepted,
            samples_rejected: self.samples_rejected + other.samples_rejected,
            samples_evicted: self.samples_evicted + other.samples_evicted,
            fetch_failures: self.fetch_failures + other.fetch_failures,
        }
    }
}

/// What `save` writes and the `status` command reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Sessions folded into `totals`
    pub sessions: u64,
    pub totals: ActivityTotals,
    pub last_updated: DateTime<Utc>,
}

impl ActivityRecord {
    /// Read a previously saved record.
    pub fn read(path: &Path) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(io::Error::other)
    }

    fn write(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[derive(Debug, Default)]
struct SessionCounters {
    ticks: AtomicU64,
    samples_accepted: AtomicU64,
    samples_rejected: AtomicU64,
    samples_evicted: AtomicU64,
    fetch_failures: AtomicU64,
}

impl SessionCounters {
    fn bump(counter: &AtomicU64, by: usize) {
        counter.fetch_add(by as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ActivityTotals {
        ActivityTotals {
            ticks: self.ticks.load(Ordering::Relaxed),
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            samples_evicted: self.samples_evicted.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }
}

/// Counters for the current session, optionally backed by a file.
#[derive(Debug)]
pub struct ActivityLog {
    session: SessionCounters,
    session_start: DateTime<Utc>,
    /// Record left by earlier sessions
    previous: Option<ActivityRecord>,
    persist_path: Option<PathBuf>,
}

impl ActivityLog {
    /// A log that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            session: SessionCounters::default(),
            session_start: Utc::now(),
            previous: None,
            persist_path: None,
        }
    }

    /// A log that resumes from, and saves to, `path`.
    ///
    /// A missing file starts from zero. An unreadable one is logged and
    /// overwritten on the next save.
    pub fn persistent(path: PathBuf) -> Self {
        let previous = if path.exists() {
            match ActivityRecord::read(&path) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable activity file {:?}: {}", path, e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            previous,
            persist_path: Some(path),
            ..Self::in_memory()
        }
    }

    /// Record one completed tick and the result of its append.
    pub fn record_tick(&self, report: &AppendReport) {
        let c = &self.session;
        SessionCounters::bump(&c.ticks, 1);
        SessionCounters::bump(&c.samples_accepted, report.accepted);
        SessionCounters::bump(&c.samples_rejected, report.rejected_count());
        SessionCounters::bump(&c.samples_evicted, report.evicted);
    }

    /// Record a fetch that failed or timed out.
    pub fn record_fetch_failure(&self) {
        SessionCounters::bump(&self.session.fetch_failures, 1);
    }

    /// Counters for this session only.
    pub fn session(&self) -> ActivityTotals {
        self.session.snapshot()
    }

    /// This session plus every saved session before it.
    pub fn lifetime(&self) -> ActivityTotals {
        let earlier = self.previous.as_ref().map(|r| r.totals).unwrap_or_default();
        earlier.combined(self.session())
    }

    pub fn session_start(&self) -> DateTime<Utc> {
        self.session_start
    }

    pub fn summary(&self) -> String {
        let session = self.session();
        let lifetime = self.lifetime();
        let secs = (Utc::now() - self.session_start).num_seconds().max(0);

        let mut out = format!("Session Statistics ({secs}s):\n");
        for (label, now, total) in [
            ("Refresh ticks", session.ticks, lifetime.ticks),
            ("Samples accepted", session.samples_accepted, lifetime.samples_accepted),
            ("Samples rejected", session.samples_rejected, lifetime.samples_rejected),
            ("Samples evicted", session.samples_evicted, lifetime.samples_evicted),
            ("Failed fetches", session.fetch_failures, lifetime.fetch_failures),
        ] {
            out.push_str(&format!("  - {label:<17} {now:>8}  (all sessions: {total})\n"));
        }
        out
    }

    /// Write the accumulated record. A no-op for in-memory logs.
    ///
    /// Saving twice in one session rewrites the same record.
    pub fn save(&self) -> io::Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };

        let sessions = self.previous.as_ref().map_or(0, |r| r.sessions) + 1;
        ActivityRecord {
            sessions,
            totals: self.lifetime(),
            last_updated: Utc::now(),
        }
        .write(path)
    }
}

/// Activity log shared between the scheduler and the CLI.
pub type SharedActivityLog = Arc<ActivityLog>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidSampleError;

    fn report(accepted: usize, evicted: usize, rejected: usize) -> AppendReport {
        AppendReport {
            accepted,
            evicted,
            rejected: (0..rejected)
                .map(|_| InvalidSampleError::UnparseableTimestamp("?".to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_activity_counting() {
        let log = ActivityLog::in_memory();
        log.record_tick(&report(100, 0, 0));
        log.record_tick(&report(8, 3, 2));
        log.record_fetch_failure();

        assert_eq!(
            log.session(),
            ActivityTotals {
                ticks: 2,
                samples_accepted: 108,
                samples_rejected: 2,
                samples_evicted: 3,
                fetch_failures: 1,
            }
        );
        assert_eq!(log.lifetime(), log.session());
    }

    #[test]
    fn test_summary_format() {
        let log = ActivityLog::in_memory();
        log.record_tick(&report(4, 0, 0));
        let summary = log.summary();
        assert!(summary.contains("Refresh ticks"));
        assert!(summary.contains("Failed fetches"));
        assert!(summary.contains("(all sessions: 4)"));
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        assert!(ActivityLog::in_memory().save().is_ok());
    }

    #[test]
    fn test_sessions_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("activity.json");

        let first = ActivityLog::persistent(path.clone());
        first.record_tick(&report(5, 0, 0));
        first.save().unwrap();
        first.save().unwrap();

        let second = ActivityLog::persistent(path.clone());
        second.record_tick(&report(5, 1, 0));
        assert_eq!(second.session().samples_accepted, 5);
        assert_eq!(second.lifetime().samples_accepted, 10);
        second.save().unwrap();

        let record = ActivityRecord::read(&path).unwrap();
        assert_eq!(record.sessions, 2);
        assert_eq!(record.totals.ticks, 2);
        assert_eq!(record.totals.samples_evicted, 1);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.json");
        std::fs::write(&path, "{ not json").unwrap();

        let log = ActivityLog::persistent(path.clone());
        assert_eq!(log.lifetime(), ActivityTotals::default());

        log.save().unwrap();
        assert_eq!(ActivityRecord::read(&path).unwrap().sessions, 1);
    }
}
