//! Replay of recorded sensor logs.
//!
//! The whole file is parsed up front and queued; every fetch releases the
//! next batch of rows. Rows that cannot be parsed are skipped with a warning
//! and never reach the store.

use crate::collector::types::{Axis, Sample};
use crate::collector::SampleSource;
use crate::error::{FetchError, FetchResult, InvalidConfigError, InvalidSampleError};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ByteRecord, StringRecord};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;

/// Header names accepted for the timestamp column.
const TIMESTAMP_COLUMNS: [&str; 3] = ["timestamp", "time", "datetime"];

/// Naive formats tried after RFC 3339, interpreted as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    x: usize,
    y: usize,
    z: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> FetchResult<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        let timestamp = find(&TIMESTAMP_COLUMNS)
            .ok_or_else(|| FetchError::MissingColumn("timestamp".to_string()))?;
        let axis = |axis: Axis| {
            find(&[axis.name()]).ok_or_else(|| FetchError::MissingColumn(axis.name().to_string()))
        };

        Ok(Self {
            timestamp,
            x: axis(Axis::X)?,
            y: axis(Axis::Y)?,
            z: axis(Axis::Z)?,
        })
    }

    fn axis(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// A source that replays a CSV file in fixed-size batches.
pub struct CsvReplaySource {
    name: String,
    queue: VecDeque<Sample>,
    batch_size: usize,
    rejected: Vec<(u64, InvalidSampleError)>,
}

impl CsvReplaySource {
    /// Open and parse a CSV file.
    pub fn open(path: impl AsRef<Path>, batch_size: usize) -> FetchResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut source = Self::from_reader(file, batch_size)?;
        source.name = path.display().to_string();
        Ok(source)
    }

    /// Parse CSV data from any reader.
    ///
    /// Only an unreadable header or an I/O failure fails the whole file.
    /// Bad rows, including ones that are not valid UTF-8, are skipped.
    pub fn from_reader<R: Read>(reader: R, batch_size: usize) -> FetchResult<Self> {
        if batch_size == 0 {
            return Err(InvalidConfigError::ZeroBatch.into());
        }

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = Columns::from_headers(rdr.headers()?)?;
        let mut queue = VecDeque::new();
        let mut rejected = Vec::new();

        for record in rdr.byte_records() {
            let (line, result) = match record {
                Ok(record) => {
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    (line, parse_record(&record, &columns))
                }
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    (line, Err(InvalidSampleError::MalformedRow(e.to_string())))
                }
            };

            match result {
                Ok(sample) => queue.push_back(sample),
                Err(e) => {
                    tracing::warn!("Skipping CSV line {}: {}", line, e);
                    rejected.push((line, e));
                }
            }
        }

        tracing::debug!(
            "Queued {} rows for replay ({} rejected)",
            queue.len(),
            rejected.len()
        );

        Ok(Self {
            name: "csv".to_string(),
            queue,
            batch_size,
            rejected,
        })
    }

    /// Rows still waiting to be released.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Rows that failed to parse, with their line numbers.
    pub fn rejected_rows(&self) -> &[(u64, InvalidSampleError)] {
        &self.rejected
    }

    /// Release every queued row at once.
    pub fn drain_all(&mut self) -> Vec<Sample> {
        self.queue.drain(..).collect()
    }
}

impl SampleSource for CsvReplaySource {
    fn fetch(&mut self, _since: Option<DateTime<Utc>>) -> FetchResult<Vec<Sample>> {
        let n = self.batch_size.min(self.queue.len());
        Ok(self.queue.drain(..n).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn parse_record(record: &ByteRecord, columns: &Columns) -> Result<Sample, InvalidSampleError> {
    let raw_ts = record
        .get(columns.timestamp)
        .ok_or_else(|| InvalidSampleError::MissingColumn("timestamp".to_string()))?;
    let timestamp = match std::str::from_utf8(raw_ts) {
        Ok(text) => parse_timestamp(text)?,
        Err(_) => return Err(InvalidSampleError::UnparseableTimestamp(lossy(raw_ts).into_owned())),
    };

    let value = |axis: Axis| -> Result<f64, InvalidSampleError> {
        let raw = record
            .get(columns.axis(axis))
            .ok_or_else(|| InvalidSampleError::MissingColumn(axis.name().to_string()))?;
        std::str::from_utf8(raw)
            .ok()
            .and_then(|text| text.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| InvalidSampleError::NonNumeric {
                axis,
                raw: lossy(raw).into_owned(),
            })
    };

    Ok(Sample::new(
        timestamp,
        value(Axis::X)?,
        value(Axis::Y)?,
        value(Axis::Z)?,
    ))
}

fn lossy(raw: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(raw)
}

/// Parse the timestamp formats found in recorded sensor logs.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` (UTC), values where only
/// the first two whitespace-separated tokens are the date and time, and
/// Unix epoch seconds.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, InvalidSampleError> {
    let trimmed = raw.trim();
    let unparseable = || InvalidSampleError::UnparseableTimestamp(raw.to_string());
    if trimmed.is_empty() {
        return Err(unparseable());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date_time: Vec<&str> = trimmed.split_whitespace().take(2).collect();
    let candidate = date_time.join(" ");
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&candidate, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(epoch) = trimmed.parse::<f64>() {
        if epoch.is_finite() {
            let secs = epoch.floor();
            let nanos = ((epoch - secs) * 1e9).round().min(999_999_999.0) as u32;
            if let Some(dt) = DateTime::from_timestamp(secs as i64, nanos) {
                return Ok(dt);
            }
        }
    }

    Err(unparseable())
}
