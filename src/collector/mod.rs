//! Sample ingestion for the telemetry viewport.
//!
//! A source hands the refresh scheduler batches of samples on demand. The
//! core only depends on the `SampleSource` trait; the two bundled sources
//! cover the simulated and file-replay deployments.

pub mod csv_replay;
pub mod simulated;
pub mod types;

use crate::config::{SourceConfig, SourceKind};
use crate::error::{FetchError, FetchResult};
use chrono::{DateTime, Utc};

// Re-export commonly used types
pub use csv_replay::{parse_timestamp, CsvReplaySource};
pub use simulated::SimulatedSource;
pub use types::{Axis, Sample};

/// Produces batches of samples newer than a given instant.
pub trait SampleSource: Send {
    /// Fetch the next batch. `since` is the newest timestamp already stored,
    /// or `None` before the first batch.
    fn fetch(&mut self, since: Option<DateTime<Utc>>) -> FetchResult<Vec<Sample>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Boxed source as held by the scheduler.
pub type BoxedSource = Box<dyn SampleSource>;

/// Build the source described by the configuration.
pub fn create_source(config: &SourceConfig) -> FetchResult<BoxedSource> {
    match config.kind {
        SourceKind::Simulated => {
            let source = SimulatedSource::new(config.initial_batch, config.batch_size)?;
            Ok(Box::new(source))
        }
        SourceKind::Csv => {
            let path = config
                .csv_path
                .as_ref()
                .ok_or_else(|| FetchError::NotConfigured("csv source needs a file path".to_string()))?;
            Ok(Box::new(CsvReplaySource::open(path, config.batch_size)?))
        }
    }
}
