//! Tide prediction from fitted constituents.
//!
//! # Mathematical Background
//!
//! The forward model is the fit model evaluated at the target times:
//! ```text
//! η(t) = Z₀ + Σᵢ Hᵢ fᵢ(t) cos((V+u)ᵢ(t) − gᵢ)
//! ```
//! with fᵢ and (V+u)ᵢ recomputed at every target timestamp, never carried
//! over from the analysis window.

use super::{
    ConstituentSet, HarmonicAnalysis, HarmonicError, OrbitalElements, ResidualMetrics,
    TidePoint, TideRecord,
};
use chrono::{DateTime, Duration, Utc};

impl ConstituentSet {
    /// Predicted water level at one instant.
    pub fn evaluate(&self, time: DateTime<Utc>) -> f64 {
        self.evaluate_with(&OrbitalElements::at(time))
    }

    /// Predicted water level for precomputed orbital elements.
    pub fn evaluate_with(&self, el: &OrbitalElements) -> f64 {
        self.z0
            + self
                .constituents
                .iter()
                .map(|c| c.evaluate_with(el))
                .sum::<f64>()
    }

    /// Predict at each of the given timestamps.
    pub fn predict(&self, times: &[DateTime<Utc>]) -> PredictedSeries {
        PredictedSeries {
            data: times
                .iter()
                .map(|&time| TidePoint {
                    time,
                    value: self.evaluate(time),
                })
                .collect(),
        }
    }

    /// Predict at a regular step from `start` up to and including `end`.
    pub fn predict_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> PredictedSeries {
        let mut times = Vec::new();
        if step > Duration::zero() {
            let mut t = start;
            while t <= end {
                times.push(t);
                t += step;
            }
        }
        self.predict(&times)
    }
}

/// Synthesized water levels at caller-chosen timestamps.
#[derive(Clone, Debug, Default)]
pub struct PredictedSeries {
    /// Predicted samples
    pub data: Vec<TidePoint>,
}

impl PredictedSeries {
    /// Number of predicted samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Prediction times.
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.data.iter().map(|p| p.time).collect()
    }

    /// Predicted values.
    pub fn values(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.value).collect()
    }

    /// (time, prediction, observation) at timestamps present in both.
    fn paired(&self, observed: &TideRecord) -> Vec<(DateTime<Utc>, f64, f64)> {
        let mut pairs = Vec::new();
        let mut j = 0;
        for obs in &observed.data {
            while j < self.data.len() && self.data[j].time < obs.time {
                j += 1;
            }
            if j < self.data.len() && self.data[j].time == obs.time {
                pairs.push((obs.time, self.data[j].value, obs.value));
            }
        }
        pairs
    }

    /// Observation minus prediction at timestamps present in both.
    pub fn residuals(&self, observed: &TideRecord) -> TideRecord {
        TideRecord {
            data: self
                .paired(observed)
                .into_iter()
                .map(|(time, pred, obs)| TidePoint {
                    time,
                    value: obs - pred,
                })
                .collect(),
            location: observed.location,
            name: observed.name.clone(),
        }
    }

    /// Residual metrics against observations at matching timestamps.
    pub fn metrics(&self, observed: &TideRecord) -> Option<ResidualMetrics> {
        let (prediction, observation): (Vec<f64>, Vec<f64>) = self
            .paired(observed)
            .into_iter()
            .map(|(_, pred, obs)| (pred, obs))
            .unzip();
        ResidualMetrics::compute(&prediction, &observation)
    }

    /// Convert into a record (for writing or further analysis).
    pub fn into_record(self) -> TideRecord {
        TideRecord {
            data: self.data,
            location: None,
            name: None,
        }
    }
}

/// Result of windowed fit-then-predict.
#[derive(Clone, Debug)]
pub struct WindowedPrediction {
    /// Concatenated predictions at the record's own timestamps
    pub prediction: PredictedSeries,
    /// Number of windows analyzed
    pub windows: usize,
    /// Windows that resolved no constituent and predict their mean
    pub unresolved_windows: usize,
}

/// Fit sequential windows of a record and stitch their predictions.
///
/// Each window `[start, start + window)` is analyzed independently and
/// predicted at its own timestamps. Windows that resolve no tidal
/// constituent predict their own mean (NaN if they hold no finite sample).
///
/// # Errors
///
/// `InvalidWindow` if `window` is not positive.
pub fn predict_windowed(
    analysis: &HarmonicAnalysis,
    record: &TideRecord,
    window: Duration,
) -> Result<WindowedPrediction, HarmonicError> {
    if window <= Duration::zero() {
        return Err(HarmonicError::InvalidWindow);
    }

    let mut prediction = PredictedSeries::default();
    let mut windows = 0;
    let mut unresolved_windows = 0;

    let (Some(first), Some(last)) = (record.start(), record.end()) else {
        return Ok(WindowedPrediction {
            prediction,
            windows,
            unresolved_windows,
        });
    };

    let mut start = first;
    while start <= last {
        let end = start + window;
        let sub = record.window(start, end);
        start = end;
        if sub.is_empty() {
            continue;
        }
        windows += 1;

        let times = sub.times();
        let part = match analysis.analyze(&sub) {
            Ok(outcome) if outcome.is_resolved() => outcome.constituents.predict(&times),
            Ok(_) | Err(HarmonicError::InsufficientData { .. }) => {
                unresolved_windows += 1;
                ConstituentSet::new(sub.mean(), Vec::new()).predict(&times)
            }
            Err(e) => return Err(e),
        };
        prediction.data.extend(part.data);
    }

    log::info!(
        "windowed prediction: {} windows, {} unresolved",
        windows,
        unresolved_windows
    );

    Ok(WindowedPrediction {
        prediction,
        windows,
        unresolved_windows,
    })
}
