//! Tidal harmonic analysis, prediction, and forcing-month selection.
//!
//! This module provides tools for:
//! - Evaluating the astronomical arguments and nodal corrections of tidal constituents
//! - Decomposing water-level records into constituent harmonics using least-squares fitting
//! - Reconstructing predicted water levels from fitted constituents
//! - Ranking months of observations by tidal range to pick forcing scenarios
//! - Locating the nearest tide gauge station
//!
//! # Mathematical Background
//!
//! Tidal signal decomposition:
//! ```text
//! η(t) = Z₀ + Σᵢ Hᵢ fᵢ(t) cos((V+u)ᵢ(t) − gᵢ)
//! ```
//!
//! Where:
//! - (V+u)ᵢ(t) is the equilibrium argument plus nodal phase correction (degrees)
//! - fᵢ(t) is the nodal amplitude factor
//! - Hᵢ, gᵢ are the fitted amplitude and Greenwich phase lag
//!
//! Since f and V+u are known functions of time, writing
//! `aᵢ = Hᵢ cos gᵢ`, `bᵢ = Hᵢ sin gᵢ` makes this a linear least-squares problem.
//!
//! # Example
//!
//! ```ignore
//! use estuary_rs::analysis::{HarmonicAnalysis, TideRecord};
//!
//! let record = TideRecord::new(&times, &water_levels)?;
//! let outcome = HarmonicAnalysis::new().analyze(&record)?;
//!
//! for c in &outcome.constituents.constituents {
//!     println!("{}: {:.3} m, {:.1} deg", c.name(), c.amplitude, c.phase_degrees);
//! }
//! for d in &outcome.dropped {
//!     println!("dropped {}: {}", d.name, d.reason);
//! }
//!
//! let prediction = outcome.constituents.predict(&record.times());
//! ```

mod astronomy;
mod constituents;
mod extremes;
mod harmonic;
mod metrics;
mod prediction;
mod station;

pub use astronomy::{ELEMENT_RATES, OrbitalElements};
pub use constituents::{ConstituentDef, NodalTerm, catalog, lookup};
pub use extremes::{
    CalendarMonth, ExtremumSelector, ForcingMonths, MonthSelection, MonthlyRange,
    SelectionError, monthly_ranges, select_months,
};
pub use harmonic::{
    AnalysisOutcome, ConstituentSet, DropReason, DroppedConstituent, FittedConstituent,
    HarmonicAnalysis, HarmonicError,
};
pub use metrics::{ConstituentComparison, ResidualMetrics};
pub use prediction::{PredictedSeries, WindowedPrediction, predict_windowed};
pub use station::{CoordinateError, TideGaugeStation, nearest_station, parse_dms};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Error type for building tide records.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    /// Parallel arrays of different length
    #[error("times and values must have same length ({times} vs {values})")]
    LengthMismatch { times: usize, values: usize },

    /// Timestamps must be strictly increasing
    #[error("non-monotonic time at sample {index}")]
    NonMonotonic { index: usize },
}

/// A single water-level sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TidePoint {
    /// Sample time (UTC)
    pub time: DateTime<Utc>,
    /// Water level in meters; NaN marks a missing sample
    pub value: f64,
}

/// Time-indexed water-level record.
///
/// Samples are strictly increasing in time and may contain gaps. Missing
/// values can be stored as NaN; analysis ignores them.
#[derive(Clone, Debug, Default)]
pub struct TideRecord {
    /// The samples, ascending in time
    pub data: Vec<TidePoint>,
    /// Optional (longitude, latitude) of the gauge
    pub location: Option<(f64, f64)>,
    /// Optional name/identifier
    pub name: Option<String>,
}

impl TideRecord {
    /// Create a record from parallel arrays of times and values.
    ///
    /// # Errors
    /// - `LengthMismatch` if the arrays differ in length
    /// - `NonMonotonic` if times are not strictly increasing
    pub fn new(times: &[DateTime<Utc>], values: &[f64]) -> Result<Self, RecordError> {
        if times.len() != values.len() {
            return Err(RecordError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }

        let data = times
            .iter()
            .zip(values.iter())
            .map(|(&time, &value)| TidePoint { time, value })
            .collect();

        Self::from_points(data)
    }

    /// Create a record from samples, validating time ordering.
    pub fn from_points(data: Vec<TidePoint>) -> Result<Self, RecordError> {
        for i in 1..data.len() {
            if data[i].time <= data[i - 1].time {
                return Err(RecordError::NonMonotonic { index: i });
            }
        }

        Ok(Self {
            data,
            location: None,
            name: None,
        })
    }

    /// Attach the gauge location.
    pub fn with_location(mut self, longitude: f64, latitude: f64) -> Self {
        self.location = Some((longitude, latitude));
        self
    }

    /// Attach a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of samples (including missing ones).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// First sample time.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.data.first().map(|p| p.time)
    }

    /// Last sample time.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.data.last().map(|p| p.time)
    }

    /// Duration from first to last sample.
    pub fn duration(&self) -> Duration {
        match (self.start(), self.end()) {
            (Some(t0), Some(t1)) => t1 - t0,
            _ => Duration::zero(),
        }
    }

    /// Duration in hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 3_600_000.0
    }

    /// Hours between the first and last finite sample.
    pub fn finite_duration_hours(&self) -> f64 {
        let mut finite = self.finite();
        match (finite.next(), finite.last()) {
            (Some(first), Some(last)) => {
                (last.time - first.time).num_milliseconds() as f64 / 3_600_000.0
            }
            _ => 0.0,
        }
    }

    /// Median spacing between consecutive samples, in hours.
    pub fn median_interval_hours(&self) -> Option<f64> {
        if self.data.len() < 2 {
            return None;
        }
        let mut steps: Vec<f64> = self
            .data
            .windows(2)
            .map(|w| (w[1].time - w[0].time).num_milliseconds() as f64 / 3_600_000.0)
            .collect();
        steps.sort_by(f64::total_cmp);
        Some(steps[steps.len() / 2])
    }

    /// Get times as a vector.
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.data.iter().map(|p| p.time).collect()
    }

    /// Get values as a vector.
    pub fn values(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.value).collect()
    }

    /// Samples with a finite value.
    pub fn finite(&self) -> impl Iterator<Item = &TidePoint> {
        self.data.iter().filter(|p| p.value.is_finite())
    }

    /// Number of samples with a finite value.
    pub fn finite_len(&self) -> usize {
        self.finite().count()
    }

    /// Mean of the finite values (NaN if there are none).
    pub fn mean(&self) -> f64 {
        let (sum, n) = self
            .finite()
            .fold((0.0, 0usize), |(s, n), p| (s + p.value, n + 1));
        if n == 0 { f64::NAN } else { sum / n as f64 }
    }

    /// Sample variance of the finite values.
    pub fn variance(&self) -> f64 {
        let n = self.finite_len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq: f64 = self.finite().map(|p| (p.value - mean).powi(2)).sum();
        sum_sq / (n - 1) as f64
    }

    /// Sub-record with `start <= time < end`, keeping metadata.
    pub fn window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> TideRecord {
        let lo = self.data.partition_point(|p| p.time < start);
        let hi = self.data.partition_point(|p| p.time < end);
        TideRecord {
            data: self.data[lo..hi.max(lo)].to_vec(),
            location: self.location,
            name: self.name.clone(),
        }
    }
}

/// Wrap an angle in degrees to the range [0, 360).
pub fn wrap_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 { 0.0 } else { a }
}

/// Phase difference in degrees wrapped to [-180, 180].
pub fn phase_difference(phase1: f64, phase2: f64) -> f64 {
    let diff = wrap_degrees(phase1 - phase2);
    if diff > 180.0 { diff - 360.0 } else { diff }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hourly(n: usize) -> Vec<DateTime<Utc>> {
        let t0 = Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| t0 + Duration::hours(i as i64)).collect()
    }

    #[test]
    fn test_record_creation() {
        let times = hourly(4);
        let ts = TideRecord::new(&times, &[1.0, 2.0, 1.5, 2.5]).unwrap();

        assert_eq!(ts.len(), 4);
        assert!((ts.duration_hours() - 3.0).abs() < 1e-10);
        assert_eq!(ts.median_interval_hours(), Some(1.0));
    }

    #[test]
    fn test_finite_duration_skips_missing_ends() {
        let times = hourly(6);
        let ts = TideRecord::new(&times, &[f64::NAN, 1.0, 2.0, 3.0, f64::NAN, f64::NAN]).unwrap();

        assert!((ts.duration_hours() - 5.0).abs() < 1e-10);
        assert!((ts.finite_duration_hours() - 2.0).abs() < 1e-10);
        assert_eq!(TideRecord::default().finite_duration_hours(), 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let times = hourly(3);
        assert_eq!(
            TideRecord::new(&times, &[1.0]).unwrap_err(),
            RecordError::LengthMismatch {
                times: 3,
                values: 1
            }
        );
    }

    #[test]
    fn test_non_monotonic() {
        let mut times = hourly(3);
        times.swap(1, 2);
        assert_eq!(
            TideRecord::new(&times, &[1.0, 2.0, 3.0]).unwrap_err(),
            RecordError::NonMonotonic { index: 2 }
        );
    }

    #[test]
    fn test_statistics_ignore_missing() {
        let times = hourly(5);
        let ts = TideRecord::new(&times, &[1.0, f64::NAN, 2.0, 3.0, 4.0]).unwrap();

        assert_eq!(ts.finite_len(), 4);
        assert!((ts.mean() - 2.5).abs() < 1e-10);
        assert!(TideRecord::default().mean().is_nan());
    }

    #[test]
    fn test_window_is_half_open() {
        let times = hourly(10);
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ts = TideRecord::new(&times, &values).unwrap().with_name("gauge");

        let sub = ts.window(times[2], times[5]);
        assert_eq!(sub.values(), vec![2.0, 3.0, 4.0]);
        assert_eq!(sub.name.as_deref(), Some("gauge"));
        assert!(ts.window(times[5], times[2]).is_empty());
    }

    #[test]
    fn test_wrap_degrees() {
        assert!((wrap_degrees(0.0) - 0.0).abs() < 1e-10);
        assert!((wrap_degrees(-90.0) - 270.0).abs() < 1e-10);
        assert!((wrap_degrees(720.5) - 0.5).abs() < 1e-10);
        assert!(wrap_degrees(-1e-20) < 360.0);
    }

    #[test]
    fn test_phase_difference() {
        assert!((phase_difference(10.0, 0.0) - 10.0).abs() < 1e-10);
        assert!((phase_difference(0.0, 10.0) + 10.0).abs() < 1e-10);
        assert!((phase_difference(5.0, 355.0) - 10.0).abs() < 1e-10);
    }
}
