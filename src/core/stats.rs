//! Per-axis summary statistics over a slice of samples.
//!
//! Every render recomputes the same three statistics for x, y and z. An
//! empty slice yields NaN everywhere instead of an error, so a dashboard
//! can render before the first batch arrives.

use crate::collector::types::{Axis, Sample};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Which standard deviation to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdDevConvention {
    /// Divide by n
    #[default]
    Population,
    /// Divide by n - 1
    Sample,
}

/// Statistics for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub axis: Axis,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
}

impl SummaryRow {
    fn empty(axis: Axis) -> Self {
        Self {
            axis,
            mean: f64::NAN,
            median: f64::NAN,
            stddev: f64::NAN,
        }
    }
}

/// Computes mean, median and standard deviation per axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsSummarizer {
    convention: StdDevConvention,
}

impl StatsSummarizer {
    pub fn new(convention: StdDevConvention) -> Self {
        Self { convention }
    }

    /// One row per axis, always in x, y, z order.
    pub fn summarize(&self, slice: &[Sample]) -> [SummaryRow; 3] {
        Axis::ALL.map(|axis| {
            let values: Vec<f64> = slice.iter().map(|s| s.axis(axis)).collect();
            self.summarize_values(axis, values)
        })
    }

    fn summarize_values(&self, axis: Axis, values: Vec<f64>) -> SummaryRow {
        if values.is_empty() {
            return SummaryRow::empty(axis);
        }

        let mean = values.iter().mean();
        // Fewer than two points carry no spread information.
        let stddev = if values.len() < 2 {
            f64::NAN
        } else {
            match self.convention {
                StdDevConvention::Population => values.iter().population_std_dev(),
                StdDevConvention::Sample => values.iter().std_dev(),
            }
        };
        let median = Data::new(values).median();

        SummaryRow {
            axis,
            mean,
            median,
            stddev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn samples_from_x(xs: &[f64]) -> Vec<Sample> {
        let start = Utc::now();
        xs.iter()
            .enumerate()
            .map(|(i, &x)| Sample::new(start + Duration::seconds(i as i64), x, x * 2.0, -x))
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_empty_slice_is_all_nan() {
        let rows = StatsSummarizer::default().summarize(&[]);
        assert_eq!(rows.len(), 3);
        for row in rows {
            assert!(row.mean.is_nan());
            assert!(row.median.is_nan());
            assert!(row.stddev.is_nan());
        }
    }

    #[test]
    fn test_axis_order() {
        let rows = StatsSummarizer::default().summarize(&samples_from_x(&[1.0]));
        assert_eq!(rows[0].axis, Axis::X);
        assert_eq!(rows[1].axis, Axis::Y);
        assert_eq!(rows[2].axis, Axis::Z);
    }

    #[test]
    fn test_known_fixture_population() {
        let rows = StatsSummarizer::default().summarize(&samples_from_x(&[1.0, 2.0, 3.0, 4.0]));
        let x = rows[0];
        assert!(approx(x.mean, 2.5));
        assert!(approx(x.median, 2.5));
        assert!(approx(x.stddev, 1.118));

        // y = 2x scales every statistic
        let y = rows[1];
        assert!(approx(y.mean, 5.0));
        assert!(approx(y.median, 5.0));
        assert!(approx(y.stddev, 2.236));
    }

    #[test]
    fn test_sample_convention() {
        let summarizer = StatsSummarizer::new(StdDevConvention::Sample);
        let rows = summarizer.summarize(&samples_from_x(&[1.0, 2.0, 3.0, 4.0]));
        assert!(approx(rows[0].stddev, 1.291));
    }

    #[test]
    fn test_odd_count_median_unsorted_input() {
        let rows = StatsSummarizer::default().summarize(&samples_from_x(&[9.0, 1.0, 5.0]));
        assert!(approx(rows[0].median, 5.0));
        assert!(approx(rows[2].median, -5.0));
    }

    #[test]
    fn test_single_point() {
        let rows = StatsSummarizer::default().summarize(&samples_from_x(&[7.0]));
        assert!(approx(rows[0].mean, 7.0));
        assert!(approx(rows[0].median, 7.0));
        assert!(rows[0].stddev.is_nan());
    }
}
