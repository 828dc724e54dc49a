//! Simulated gyroscope feed.
//!
//! Produces standard-normal noise on every axis with one-second spacing,
//! continuing from the newest stored timestamp.

use crate::collector::types::Sample;
use crate::collector::SampleSource;
use crate::error::{FetchResult, InvalidConfigError};
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

/// Spacing between consecutive simulated samples.
const SAMPLE_SPACING_SECS: i64 = 1;

/// A source that invents samples on demand.
pub struct SimulatedSource {
    initial_batch: usize,
    batch_size: usize,
    distribution: Normal,
    rng: StdRng,
}

impl SimulatedSource {
    /// Create a source drawing from N(0, 1).
    pub fn new(initial_batch: usize, batch_size: usize) -> Result<Self, InvalidConfigError> {
        Self::build(initial_batch, batch_size, 0.0, 1.0, StdRng::from_entropy())
    }

    /// Create a reproducible source for tests and demos.
    pub fn seeded(
        initial_batch: usize,
        batch_size: usize,
        seed: u64,
    ) -> Result<Self, InvalidConfigError> {
        Self::build(initial_batch, batch_size, 0.0, 1.0, StdRng::seed_from_u64(seed))
    }

    /// Change the distribution the axis values are drawn from.
    pub fn with_distribution(mut self, mean: f64, std_dev: f64) -> Result<Self, InvalidConfigError> {
        self.distribution = Normal::new(mean, std_dev)
            .map_err(|e| InvalidConfigError::Distribution(e.to_string()))?;
        Ok(self)
    }

    fn build(
        initial_batch: usize,
        batch_size: usize,
        mean: f64,
        std_dev: f64,
        rng: StdRng,
    ) -> Result<Self, InvalidConfigError> {
        if batch_size == 0 {
            return Err(InvalidConfigError::ZeroBatch);
        }
        let distribution = Normal::new(mean, std_dev)
            .map_err(|e| InvalidConfigError::Distribution(e.to_string()))?;
        Ok(Self {
            initial_batch,
            batch_size,
            distribution,
            rng,
        })
    }

    fn generate(&mut self, first: DateTime<Utc>, count: usize) -> Vec<Sample> {
        (0..count)
            .map(|i| {
                let timestamp = first + Duration::seconds(i as i64 * SAMPLE_SPACING_SECS);
                Sample::new(
                    timestamp,
                    self.distribution.sample(&mut self.rng),
                    self.distribution.sample(&mut self.rng),
                    self.distribution.sample(&mut self.rng),
                )
            })
            .collect()
    }
}

impl SampleSource for SimulatedSource {
    fn fetch(&mut self, since: Option<DateTime<Utc>>) -> FetchResult<Vec<Sample>> {
        let batch = match since {
            None => self.generate(Utc::now(), self.initial_batch),
            Some(last) => {
                let first = last + Duration::seconds(SAMPLE_SPACING_SECS);
                self.generate(first, self.batch_size)
            }
        };
        Ok(batch)
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
