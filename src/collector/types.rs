//! Sample types shared by the store, the summarizer and every source.
//!
//! A sample is one timestamped x/y/z reading. Samples are immutable once
//! they are stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three sensor axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in display order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Column name used by sources and JSON output.
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single timestamped multi-axis reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    /// Value of the given axis.
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// First axis holding NaN or infinity, if any.
    pub fn non_finite_axis(&self) -> Option<Axis> {
        Axis::ALL.into_iter().find(|&a| !self.axis(a).is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_access() {
        let sample = Sample::new(Utc::now(), 1.0, 2.0, 3.0);
        assert_eq!(sample.axis(Axis::X), 1.0);
        assert_eq!(sample.axis(Axis::Y), 2.0);
        assert_eq!(sample.axis(Axis::Z), 3.0);
        assert_eq!(sample.non_finite_axis(), None);
    }

    #[test]
    fn test_non_finite_detection() {
        let sample = Sample::new(Utc::now(), 1.0, f64::NAN, f64::INFINITY);
        assert_eq!(sample.non_finite_axis(), Some(Axis::Y));
    }

    #[test]
    fn test_axis_serializes_lowercase() {
        let json = serde_json::to_string(&Axis::Z).unwrap();
        assert_eq!(json, "\"z\"");
    }
}
