//! Harmonic analysis for tidal time series.
//!
//! Decomposes water-level records into constituent harmonics using
//! least-squares fitting, with the constituent list chosen per window by
//! the Rayleigh criterion.
//!
//! # Mathematical Background
//!
//! The tidal signal is modeled as:
//! ```text
//! η(t) = Z₀ + Σᵢ fᵢ(t) [aᵢ cos(V+u)ᵢ(t) + bᵢ sin(V+u)ᵢ(t)]
//! ```
//!
//! This is rewritten as a linear least-squares problem:
//! ```text
//! y = X * β  where  β = [Z₀, a₁, b₁, a₂, b₂, ...]ᵀ
//! ```
//!
//! After solving, the amplitude and Greenwich phase lag are recovered:
//! ```text
//! Hᵢ = √(aᵢ² + bᵢ²)
//! gᵢ = atan2(bᵢ, aᵢ)
//! ```
//!
//! # Rayleigh Criterion
//!
//! Two constituents with speeds ω₁, ω₂ (degrees/hour) are separable over a
//! record of length L hours only if
//! ```text
//! |ω₁ − ω₂| ≥ R · 360 / L
//! ```
//! with Rayleigh constant R (1.0 by default). The mean Z₀ counts as a
//! constituent of speed zero.

use super::constituents::{ConstituentDef, catalog, lookup};
use super::{OrbitalElements, RecordError, TideRecord, wrap_degrees};
use faer::{Mat, linalg::solvers::Solve};
use std::fmt;
use thiserror::Error;

/// Error type for harmonic analysis.
#[derive(Debug, Error)]
pub enum HarmonicError {
    /// Not enough finite samples to fit even the mean
    #[error("need at least {required} finite samples, got {found}")]
    InsufficientData { found: usize, required: usize },

    /// Constituent name not in the catalog
    #[error("unknown constituent: {0}")]
    UnknownConstituent(String),

    /// Rayleigh constant must be positive
    #[error("Rayleigh constant must be positive, got {0}")]
    InvalidRayleigh(f64),

    /// Prediction window must be positive
    #[error("analysis window must be positive")]
    InvalidWindow,

    /// Normal equations could not be solved
    #[error("least-squares system is singular")]
    Singular,

    /// Invalid input record
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Why a candidate constituent was left out of a fit.
#[derive(Clone, Debug, PartialEq)]
pub enum DropReason {
    /// Too close in speed to an already-selected constituent (or Z0)
    Unresolved {
        neighbor: &'static str,
        separation: f64,
        required: f64,
    },
    /// Faster than the Nyquist speed of the sampling
    AboveNyquist { nyquist: f64 },
    /// Too few samples for the number of unknowns
    InsufficientSamples,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Unresolved {
                neighbor,
                separation,
                required,
            } => write!(
                f,
                "within {:.4} deg/h of {} (needs {:.4})",
                separation, neighbor, required
            ),
            DropReason::AboveNyquist { nyquist } => {
                write!(f, "above Nyquist speed {:.4} deg/h", nyquist)
            }
            DropReason::InsufficientSamples => write!(f, "not enough samples"),
        }
    }
}

/// A candidate constituent that was not fitted.
#[derive(Clone, Debug, PartialEq)]
pub struct DroppedConstituent {
    /// Constituent name
    pub name: &'static str,
    /// Speed in degrees/hour
    pub speed: f64,
    /// Reason for dropping
    pub reason: DropReason,
}

/// A fitted constituent.
#[derive(Clone, Copy, Debug)]
pub struct FittedConstituent {
    /// Catalog entry
    pub def: &'static ConstituentDef,
    /// Amplitude in meters
    pub amplitude: f64,
    /// Greenwich phase lag in degrees [0, 360)
    pub phase_degrees: f64,
}

impl FittedConstituent {
    /// Create a fitted constituent from a catalog entry.
    pub fn new(def: &'static ConstituentDef, amplitude: f64, phase_degrees: f64) -> Self {
        Self {
            def,
            amplitude,
            phase_degrees: wrap_degrees(phase_degrees),
        }
    }

    /// Constituent name.
    pub fn name(&self) -> &'static str {
        self.def.name
    }

    /// Angular speed in degrees/hour.
    pub fn speed(&self) -> f64 {
        self.def.speed()
    }

    /// Contribution at a given set of orbital elements.
    pub fn evaluate_with(&self, el: &OrbitalElements) -> f64 {
        let f = self.def.node_factor(el);
        let arg = (self.def.equilibrium_argument(el) - self.phase_degrees).to_radians();
        self.amplitude * f * arg.cos()
    }
}

/// Mean offset plus fitted constituents.
#[derive(Clone, Debug, Default)]
pub struct ConstituentSet {
    /// Mean water level Z0
    pub z0: f64,
    /// Fitted constituents in catalog priority order
    pub constituents: Vec<FittedConstituent>,
}

impl ConstituentSet {
    /// Create a constituent set.
    pub fn new(z0: f64, constituents: Vec<FittedConstituent>) -> Self {
        Self { z0, constituents }
    }

    /// Build a set from (name, amplitude, phase) triples.
    pub fn from_named(z0: f64, entries: &[(&str, f64, f64)]) -> Result<Self, HarmonicError> {
        let constituents = entries
            .iter()
            .map(|&(name, amplitude, phase)| {
                lookup(name)
                    .map(|def| FittedConstituent::new(def, amplitude, phase))
                    .ok_or_else(|| HarmonicError::UnknownConstituent(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { z0, constituents })
    }

    /// Get a constituent by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&FittedConstituent> {
        self.constituents
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Constituent names.
    pub fn names(&self) -> Vec<&'static str> {
        self.constituents.iter().map(|c| c.name()).collect()
    }

    /// Number of constituents (excluding Z0).
    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    /// Check if no constituent was fitted.
    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }
}

/// Result of analyzing one window.
#[derive(Clone, Debug)]
pub struct AnalysisOutcome {
    /// Fitted constituents
    pub constituents: ConstituentSet,
    /// Candidates that were not fitted, with reasons
    pub dropped: Vec<DroppedConstituent>,
    /// Residual variance (unexplained variance)
    pub residual_variance: f64,
    /// Coefficient of determination R²
    pub r_squared: f64,
    /// Hours spanned by the finite samples
    pub window_hours: f64,
    /// Number of finite samples used
    pub n_samples: usize,
}

impl AnalysisOutcome {
    /// True if at least one tidal constituent was resolved.
    pub fn is_resolved(&self) -> bool {
        !self.constituents.is_empty()
    }

    /// True if every candidate was fitted.
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }

    /// Names of dropped constituents.
    pub fn dropped_names(&self) -> Vec<&'static str> {
        self.dropped.iter().map(|d| d.name).collect()
    }
}

/// Harmonic analysis configuration and fitting.
///
/// Performs least-squares fitting of tidal constituents to a record, after
/// choosing which candidates the record can resolve.
#[derive(Clone, Debug)]
pub struct HarmonicAnalysis {
    rayleigh: f64,
    candidates: Vec<&'static ConstituentDef>,
}

impl Default for HarmonicAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

impl HarmonicAnalysis {
    /// Analyzer over the full catalog with Rayleigh constant 1.0.
    pub fn new() -> Self {
        Self {
            rayleigh: 1.0,
            candidates: catalog().iter().collect(),
        }
    }

    /// Analyzer with the four major constituents (M2, S2, K1, O1).
    pub fn standard() -> Self {
        let candidates = ["M2", "S2", "K1", "O1"]
            .iter()
            .filter_map(|name| lookup(name))
            .collect();
        Self {
            rayleigh: 1.0,
            candidates,
        }
    }

    /// Analyzer restricted to the named constituents, in the given priority order.
    pub fn with_constituents(names: &[&str]) -> Result<Self, HarmonicError> {
        let candidates = names
            .iter()
            .map(|&name| {
                lookup(name).ok_or_else(|| HarmonicError::UnknownConstituent(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rayleigh: 1.0,
            candidates,
        })
    }

    /// Set the Rayleigh constant.
    pub fn with_rayleigh(mut self, rayleigh: f64) -> Result<Self, HarmonicError> {
        if !(rayleigh > 0.0) {
            return Err(HarmonicError::InvalidRayleigh(rayleigh));
        }
        self.rayleigh = rayleigh;
        Ok(self)
    }

    /// Rayleigh constant.
    pub fn rayleigh(&self) -> f64 {
        self.rayleigh
    }

    /// Candidate constituent names in priority order.
    pub fn names(&self) -> Vec<&'static str> {
        self.candidates.iter().map(|c| c.name).collect()
    }

    /// Minimum speed separation (degrees/hour) resolvable over a window.
    pub fn resolution(&self, window_hours: f64) -> f64 {
        if window_hours > 0.0 {
            self.rayleigh * 360.0 / window_hours
        } else {
            f64::INFINITY
        }
    }

    /// Minimum record length in hours needed to separate all candidate pairs
    /// (and each candidate from Z0).
    pub fn minimum_record_length(&self) -> f64 {
        let speeds: Vec<f64> = std::iter::once(0.0)
            .chain(self.candidates.iter().map(|c| c.speed()))
            .collect();
        let mut min_length = 0.0;

        for i in 0..speeds.len() {
            for j in (i + 1)..speeds.len() {
                let dw = (speeds[i] - speeds[j]).abs();
                if dw > 1e-10 {
                    let length = self.rayleigh * 360.0 / dw;
                    if length > min_length {
                        min_length = length;
                    }
                }
            }
        }

        min_length
    }

    /// Choose which candidates a record can resolve.
    ///
    /// Greedy in priority order: a candidate is kept if its speed is below
    /// the Nyquist speed and at least one Rayleigh resolution away from Z0
    /// and from every constituent already kept, where the resolution comes
    /// from the span of the finite samples. Lowest-priority constituents
    /// are then removed until the unknowns fit the finite sample count.
    pub fn select(
        &self,
        record: &TideRecord,
    ) -> (Vec<&'static ConstituentDef>, Vec<DroppedConstituent>) {
        let required = self.resolution(record.finite_duration_hours());
        let nyquist = record
            .median_interval_hours()
            .map(|dt| 180.0 / dt)
            .unwrap_or(f64::INFINITY);

        let mut kept: Vec<&'static ConstituentDef> = Vec::new();
        let mut dropped = Vec::new();

        for &def in &self.candidates {
            let speed = def.speed();

            if speed >= nyquist {
                dropped.push(DroppedConstituent {
                    name: def.name,
                    speed,
                    reason: DropReason::AboveNyquist { nyquist },
                });
                continue;
            }

            let (neighbor, separation) = kept
                .iter()
                .map(|k| (k.name, (speed - k.speed()).abs()))
                .fold(("Z0", speed.abs()), |best, cand| {
                    if cand.1 < best.1 { cand } else { best }
                });

            if separation < required {
                dropped.push(DroppedConstituent {
                    name: def.name,
                    speed,
                    reason: DropReason::Unresolved {
                        neighbor,
                        separation,
                        required,
                    },
                });
                continue;
            }

            kept.push(def);
        }

        let n_samples = record.finite_len();
        while !kept.is_empty() && 1 + 2 * kept.len() > n_samples {
            if let Some(def) = kept.pop() {
                dropped.push(DroppedConstituent {
                    name: def.name,
                    speed: def.speed(),
                    reason: DropReason::InsufficientSamples,
                });
            }
        }

        (kept, dropped)
    }

    /// Fit the resolvable constituents to a record.
    ///
    /// Missing (NaN) samples are left out of the design matrix. A record
    /// too short to resolve anything yields an outcome with an empty
    /// constituent set and Z0 equal to the record mean.
    ///
    /// # Errors
    ///
    /// `InsufficientData` if fewer than two finite samples are present.
    pub fn analyze(&self, record: &TideRecord) -> Result<AnalysisOutcome, HarmonicError> {
        let samples: Vec<_> = record.finite().copied().collect();
        let n_data = samples.len();
        if n_data < 2 {
            return Err(HarmonicError::InsufficientData {
                found: n_data,
                required: 2,
            });
        }

        let window_hours = record.finite_duration_hours();
        let (selected, dropped) = self.select(record);

        for d in &dropped {
            log::debug!("dropped {} ({})", d.name, d.reason);
        }

        if selected.is_empty() {
            log::warn!(
                "{:.1} h window resolves no tidal constituent; fitting mean only",
                window_hours
            );
            return Ok(AnalysisOutcome {
                constituents: ConstituentSet::new(record.mean(), Vec::new()),
                dropped,
                residual_variance: record.variance(),
                r_squared: 0.0,
                window_hours,
                n_samples: n_data,
            });
        }

        let n_unknowns = 1 + 2 * selected.len();

        // Build design matrix A
        // A = [1, f₁cos(V+u)₁, f₁sin(V+u)₁, f₂cos(V+u)₂, ...]
        let mut a = Mat::<f64>::zeros(n_data, n_unknowns);
        for (i, p) in samples.iter().enumerate() {
            let el = OrbitalElements::at(p.time);
            a[(i, 0)] = 1.0; // mean
            for (j, c) in selected.iter().enumerate() {
                let f = c.node_factor(&el);
                let arg = c.equilibrium_argument(&el).to_radians();
                a[(i, 1 + 2 * j)] = f * arg.cos();
                a[(i, 2 + 2 * j)] = f * arg.sin();
            }
        }

        // Solve using normal equations: (A'A) x = A' y
        let mut ata = Mat::<f64>::zeros(n_unknowns, n_unknowns);
        for i in 0..n_unknowns {
            for j in i..n_unknowns {
                let mut sum = 0.0;
                for k in 0..n_data {
                    sum += a[(k, i)] * a[(k, j)];
                }
                ata[(i, j)] = sum;
                ata[(j, i)] = sum;
            }
        }

        let mut aty = Mat::<f64>::zeros(n_unknowns, 1);
        for i in 0..n_unknowns {
            let mut sum = 0.0;
            for (k, p) in samples.iter().enumerate() {
                sum += a[(k, i)] * p.value;
            }
            aty[(i, 0)] = sum;
        }

        let lu = ata.as_ref().full_piv_lu();
        let x = lu.solve(&aty);

        if (0..n_unknowns).any(|i| !x[(i, 0)].is_finite()) {
            return Err(HarmonicError::Singular);
        }

        let z0 = x[(0, 0)];
        let constituents: Vec<FittedConstituent> = selected
            .iter()
            .enumerate()
            .map(|(j, &def)| {
                let a_coef = x[(1 + 2 * j, 0)];
                let b_coef = x[(2 + 2 * j, 0)];
                FittedConstituent::new(
                    def,
                    a_coef.hypot(b_coef),
                    b_coef.atan2(a_coef).to_degrees(),
                )
            })
            .collect();

        // Residuals from the design matrix rows
        let sum_sq: f64 = samples
            .iter()
            .enumerate()
            .map(|(k, p)| {
                let fitted: f64 = (0..n_unknowns).map(|i| a[(k, i)] * x[(i, 0)]).sum();
                (p.value - fitted).powi(2)
            })
            .sum();
        let residual_variance = sum_sq / (n_data - 1) as f64;

        // R² = 1 - SS_res / SS_tot
        let total_variance = record.variance();
        let r_squared = if total_variance > 1e-10 {
            1.0 - residual_variance / total_variance
        } else {
            1.0
        };

        log::info!(
            "fitted {} constituents over {:.1} h ({} dropped, R² = {:.4})",
            constituents.len(),
            window_hours,
            dropped.len(),
            r_squared
        );

        Ok(AnalysisOutcome {
            constituents: ConstituentSet::new(z0, constituents),
            dropped,
            residual_variance,
            r_squared,
            window_hours,
            n_samples: n_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const TOL: f64 = 1e-6;

    fn hourly(start: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
        (0..n).map(|i| start + Duration::hours(i as i64)).collect()
    }

    fn synthesize(set: &ConstituentSet, times: &[DateTime<Utc>]) -> TideRecord {
        let values: Vec<f64> = times
            .iter()
            .map(|&t| {
                let el = OrbitalElements::at(t);
                set.z0
                    + set
                        .constituents
                        .iter()
                        .map(|c| c.evaluate_with(&el))
                        .sum::<f64>()
            })
            .collect();
        TideRecord::new(times, &values).unwrap()
    }

    #[test]
    fn test_single_constituent_recovery() {
        let truth = ConstituentSet::from_named(0.0, &[("M2", 1.5, 30.0)]).unwrap();
        let t0 = Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();
        let record = synthesize(&truth, &hourly(t0, 720));

        let analysis = HarmonicAnalysis::with_constituents(&["M2"]).unwrap();
        let outcome = analysis.analyze(&record).unwrap();

        let m2 = outcome.constituents.get("M2").unwrap();
        assert!(
            (m2.amplitude - 1.5).abs() < TOL,
            "Amplitude error: expected 1.5, got {}",
            m2.amplitude
        );
        assert!(
            (m2.phase_degrees - 30.0).abs() < TOL,
            "Phase error: expected 30, got {}",
            m2.phase_degrees
        );
        assert!(outcome.constituents.z0.abs() < TOL);
        assert!(outcome.r_squared > 0.9999);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_mean_recovered() {
        let truth = ConstituentSet::from_named(2.5, &[("M2", 1.0, 0.0)]).unwrap();
        let t0 = Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();
        let record = synthesize(&truth, &hourly(t0, 500));

        let outcome = HarmonicAnalysis::with_constituents(&["M2"])
            .unwrap()
            .analyze(&record)
            .unwrap();
        assert!((outcome.constituents.z0 - 2.5).abs() < TOL);
    }

    #[test]
    fn test_short_window_drops_close_pair() {
        // M2 and S2 need ~14.8 days; 5 days cannot separate them
        let analysis = HarmonicAnalysis::with_constituents(&["M2", "S2"]).unwrap();
        let t0 = Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();
        let truth = ConstituentSet::from_named(0.0, &[("M2", 1.0, 0.0)]).unwrap();
        let record = synthesize(&truth, &hourly(t0, 120));

        let outcome = analysis.analyze(&record).unwrap();
        assert_eq!(outcome.constituents.names(), vec!["M2"]);
        assert_eq!(outcome.dropped_names(), vec!["S2"]);
        match &outcome.dropped[0].reason {
            DropReason::Unresolved { neighbor, .. } => assert_eq!(*neighbor, "M2"),
            other => panic!("unexpected reason {:?}", other),
        }
    }

    #[test]
    fn test_nyquist_drop() {
        // Six-hourly sampling: Nyquist speed is 30 deg/h
        let analysis = HarmonicAnalysis::with_constituents(&["M2", "M4"]).unwrap();
        let t0 = Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();
        let times: Vec<_> = (0..200).map(|i| t0 + Duration::hours(6 * i)).collect();
        let values = vec![0.0; times.len()];
        let record = TideRecord::new(&times, &values).unwrap();

        let (kept, dropped) = analysis.select(&record);
        assert_eq!(kept.len(), 1);
        assert!(matches!(dropped[0].reason, DropReason::AboveNyquist { .. }));
    }

    #[test]
    fn test_unresolved_window_reports_mean() {
        let t0 = Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();
        // Two hours resolve nothing below 180 deg/h
        let times = hourly(t0, 3);
        let record = TideRecord::new(&times, &[1.0, 2.0, 3.0]).unwrap();

        let outcome = HarmonicAnalysis::new().analyze(&record).unwrap();
        assert!(!outcome.is_resolved());
        assert!((outcome.constituents.z0 - 2.0).abs() < TOL);
        assert_eq!(outcome.dropped.len(), catalog().len());
    }

    #[test]
    fn test_insufficient_data() {
        let t0 = Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();
        let times = hourly(t0, 3);
        let record = TideRecord::new(&times, &[1.0, f64::NAN, f64::NAN]).unwrap();

        let err = HarmonicAnalysis::new().analyze(&record).unwrap_err();
        assert!(matches!(
            err,
            HarmonicError::InsufficientData {
                found: 1,
                required: 2
            }
        ));
    }

    #[test]
    fn test_unknown_constituent() {
        assert!(matches!(
            HarmonicAnalysis::with_constituents(&["M2", "X9"]),
            Err(HarmonicError::UnknownConstituent(name)) if name == "X9"
        ));
    }

    #[test]
    fn test_invalid_rayleigh() {
        assert!(HarmonicAnalysis::new().with_rayleigh(0.0).is_err());
        assert!(HarmonicAnalysis::new().with_rayleigh(f64::NAN).is_err());
        assert!((HarmonicAnalysis::new().with_rayleigh(0.8).unwrap().rayleigh() - 0.8).abs() < TOL);
    }

    #[test]
    fn test_minimum_record_length() {
        let analysis = HarmonicAnalysis::with_constituents(&["M2", "S2"]).unwrap();
        let length = analysis.minimum_record_length();
        // 360 / (30 - 28.984) ≈ 354.4 hours
        assert!(
            (length - 354.37).abs() < 0.1,
            "Expected ~354.4 hours, got {}",
            length
        );
    }
}
