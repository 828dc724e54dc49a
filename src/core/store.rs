//! Append-only sample storage.
//!
//! The store keeps samples in time order. It can grow without limit or be
//! bounded, in which case the oldest samples are evicted first once a batch
//! has been inserted.

use crate::collector::types::Sample;
use crate::error::{InvalidConfigError, InvalidSampleError};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Outcome of a single `append` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendReport {
    /// Samples that passed validation and were stored
    pub accepted: usize,
    /// Samples dropped from the front to honour the capacity bound
    pub evicted: usize,
    /// Samples refused, in input order
    pub rejected: Vec<InvalidSampleError>,
}

impl AppendReport {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Ordered, optionally capacity-bounded sequence of samples.
#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: VecDeque<Sample>,
    capacity: Option<usize>,
}

impl SampleStore {
    /// Create a store that grows without limit.
    pub fn unbounded() -> Self {
        Self {
            samples: VecDeque::new(),
            capacity: None,
        }
    }

    /// Create a store holding at most `capacity` samples.
    pub fn bounded(capacity: usize) -> Result<Self, InvalidConfigError> {
        if capacity == 0 {
            return Err(InvalidConfigError::ZeroCapacity);
        }
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        })
    }

    /// Create a store from an optional capacity bound.
    pub fn with_capacity(capacity: Option<usize>) -> Result<Self, InvalidConfigError> {
        match capacity {
            Some(cap) => Self::bounded(cap),
            None => Ok(Self::unbounded()),
        }
    }

    /// Append a batch, skipping samples that fail validation.
    ///
    /// A sample is refused when its timestamp is earlier than the newest
    /// stored timestamp (including earlier samples of the same batch) or when
    /// any axis is not a finite number. Equal timestamps are accepted.
    pub fn append<I>(&mut self, samples: I) -> AppendReport
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut report = AppendReport::default();

        for sample in samples {
            if let Some(axis) = sample.non_finite_axis() {
                report.rejected.push(InvalidSampleError::NonNumeric {
                    axis,
                    raw: sample.axis(axis).to_string(),
                });
                continue;
            }

            if let Some(last) = self.last_timestamp() {
                if sample.timestamp < last {
                    report.rejected.push(InvalidSampleError::OutOfOrder {
                        timestamp: sample.timestamp,
                        last,
                    });
                    continue;
                }
            }

            self.samples.push_back(sample);
            report.accepted += 1;
        }

        if let Some(cap) = self.capacity {
            while self.samples.len() > cap {
                self.samples.pop_front();
                report.evicted += 1;
            }
        }

        report
    }

    /// Current number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// At most `size` samples starting at `offset`, in time order.
    pub fn slice(&self, offset: usize, size: usize) -> Vec<Sample> {
        if offset >= self.samples.len() {
            return Vec::new();
        }
        self.samples.iter().skip(offset).take(size).copied().collect()
    }

    /// Timestamp of the newest sample.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.back().map(|s| s.timestamp)
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn make_samples(start_secs: i64, count: usize) -> Vec<Sample> {
        (0..count)
            .map(|i| {
                let t = base_time() + Duration::seconds(start_secs + i as i64);
                Sample::new(t, i as f64, -(i as f64), 0.5)
            })
            .collect()
    }

    #[test]
    fn test_append_in_order() {
        let mut store = SampleStore::unbounded();
        let report = store.append(make_samples(0, 5));
        assert_eq!(report.accepted, 5);
        assert_eq!(store.len(), 5);

        let report = store.append(make_samples(5, 3));
        assert_eq!(report.accepted, 3);
        assert_eq!(report.evicted, 0);
        assert!(report.rejected.is_empty());
        assert_eq!(store.len(), 8);
    }

    #[test]
    fn test_equal_timestamps_accepted() {
        let mut store = SampleStore::unbounded();
        let t = base_time();
        let report = store.append(vec![Sample::new(t, 1.0, 1.0, 1.0), Sample::new(t, 2.0, 2.0, 2.0)]);
        assert_eq!(report.accepted, 2);
    }

    #[test]
    fn test_out_of_order_skips_only_offender() {
        let mut store = SampleStore::unbounded();
        store.append(make_samples(10, 2)); // t10, t11

        let mut batch = make_samples(12, 1); // t12
        batch.push(make_samples(5, 1)[0]); // t5, stale
        batch.push(make_samples(13, 1)[0]); // t13

        let report = store.append(batch);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected_count(), 1);
        assert!(matches!(
            report.rejected[0],
            InvalidSampleError::OutOfOrder { .. }
        ));
        assert_eq!(store.len(), 4);
        assert_eq!(
            store.last_timestamp(),
            Some(base_time() + Duration::seconds(13))
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut store = SampleStore::unbounded();
        let report = store.append(vec![Sample::new(base_time(), f64::NAN, 0.0, 0.0)]);
        assert_eq!(report.accepted, 0);
        assert!(matches!(
            report.rejected[0],
            InvalidSampleError::NonNumeric { .. }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_slice_bounds() {
        let mut store = SampleStore::unbounded();
        store.append(make_samples(0, 10));

        let slice = store.slice(2, 3);
        assert_eq!(slice.len(), 3);
        assert_eq!(slice[0].x, 2.0);
        assert_eq!(slice[2].x, 4.0);

        // Shorter than requested near the end
        assert_eq!(store.slice(8, 5).len(), 2);

        // Past the end
        assert!(store.slice(10, 5).is_empty());
        assert!(store.slice(42, 1).is_empty());
    }

    #[test]
    fn test_slice_never_exceeds_size() {
        let mut store = SampleStore::unbounded();
        store.append(make_samples(0, 25));

        for offset in 0..30 {
            for size in 1..12 {
                let slice = store.slice(offset, size);
                assert!(slice.len() <= size);
                for (i, s) in slice.iter().enumerate() {
                    assert_eq!(s.x, (offset + i) as f64);
                }
            }
        }
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let mut store = SampleStore::bounded(5).unwrap();
        let report = store.append(make_samples(0, 6));
        assert_eq!(report.accepted, 6);
        assert_eq!(report.evicted, 1);
        assert_eq!(store.len(), 5);

        let kept = store.slice(0, 5);
        assert_eq!(kept[0].x, 1.0);
        assert_eq!(kept[4].x, 5.0);
        assert_eq!(kept[0].timestamp, base_time() + Duration::seconds(1));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            SampleStore::bounded(0).unwrap_err(),
            InvalidConfigError::ZeroCapacity
        );
    }

    #[test]
    fn test_empty_store_queries() {
        let store = SampleStore::default();
        assert_eq!(store.len(), 0);
        assert_eq!(store.last_timestamp(), None);
        assert!(store.slice(0, 100).is_empty());
    }
}
