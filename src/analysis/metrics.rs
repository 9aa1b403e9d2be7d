//! Goodness-of-fit metrics for tidal predictions.
//!
//! Provides statistics of the residual between observed and predicted
//! water levels, and per-constituent comparisons between two fitted sets.

use super::{ConstituentSet, phase_difference};

/// Statistics of `observation − prediction` over paired samples.
#[derive(Clone, Copy, Debug)]
pub struct ResidualMetrics {
    /// Root mean square error: sqrt(mean(r²))
    pub rmse: f64,
    /// Mean absolute error: mean(|r|)
    pub mae: f64,
    /// Bias of the prediction: mean(prediction − observation)
    pub bias: f64,
    /// Maximum absolute residual
    pub max_error: f64,
    /// Coefficient of determination: 1 − SS_res / SS_tot
    pub r_squared: f64,
    /// Number of paired samples with finite values
    pub n_points: usize,
}

impl ResidualMetrics {
    /// Compute metrics between predicted and observed values.
    ///
    /// Pairs where either value is NaN are skipped. Returns `None` if the
    /// slices differ in length or no finite pair remains.
    pub fn compute(prediction: &[f64], observation: &[f64]) -> Option<Self> {
        if prediction.len() != observation.len() {
            return None;
        }

        let pairs: Vec<(f64, f64)> = prediction
            .iter()
            .zip(observation.iter())
            .filter(|(p, o)| p.is_finite() && o.is_finite())
            .map(|(&p, &o)| (p, o))
            .collect();
        if pairs.is_empty() {
            return None;
        }
        let n = pairs.len() as f64;

        let obs_mean = pairs.iter().map(|&(_, o)| o).sum::<f64>() / n;
        let bias = pairs.iter().map(|&(p, o)| p - o).sum::<f64>() / n;
        let ss_res: f64 = pairs.iter().map(|&(p, o)| (o - p).powi(2)).sum();
        let ss_tot: f64 = pairs.iter().map(|&(_, o)| (o - obs_mean).powi(2)).sum();
        let mae = pairs.iter().map(|&(p, o)| (o - p).abs()).sum::<f64>() / n;
        let max_error = pairs.iter().map(|&(p, o)| (o - p).abs()).fold(0.0, f64::max);

        let r_squared = if ss_tot > 1e-10 {
            1.0 - ss_res / ss_tot
        } else if ss_res < 1e-10 {
            1.0
        } else {
            f64::NEG_INFINITY
        };

        Some(Self {
            rmse: (ss_res / n).sqrt(),
            mae,
            bias,
            max_error,
            r_squared,
            n_points: pairs.len(),
        })
    }
}

/// Comparison of one constituent between two fitted sets.
#[derive(Clone, Copy, Debug)]
pub struct ConstituentComparison {
    /// Constituent name
    pub name: &'static str,
    /// Amplitude ratio: A_a / A_b
    pub amplitude_ratio: f64,
    /// Phase difference g_a − g_b in degrees, wrapped to [-180, 180]
    pub phase_error: f64,
}

impl ConstituentComparison {
    /// Compare every constituent present in both sets.
    pub fn between(a: &ConstituentSet, b: &ConstituentSet) -> Vec<Self> {
        a.constituents
            .iter()
            .filter_map(|ca| {
                b.get(ca.name()).map(|cb| Self {
                    name: ca.name(),
                    amplitude_ratio: if cb.amplitude > 1e-10 {
                        ca.amplitude / cb.amplitude
                    } else {
                        f64::INFINITY
                    },
                    phase_error: phase_difference(ca.phase_degrees, cb.phase_degrees),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn test_perfect_prediction() {
        let obs = vec![1.0, 2.0, 3.0, 4.0];
        let m = ResidualMetrics::compute(&obs, &obs).unwrap();

        assert!(m.rmse < TOL);
        assert!(m.bias.abs() < TOL);
        assert!((m.r_squared - 1.0).abs() < TOL);
        assert_eq!(m.n_points, 4);
    }

    #[test]
    fn test_constant_offset() {
        let obs = vec![1.0, 2.0, 3.0, 4.0];
        let pred: Vec<f64> = obs.iter().map(|x| x + 0.5).collect();
        let m = ResidualMetrics::compute(&pred, &obs).unwrap();

        assert!((m.rmse - 0.5).abs() < TOL);
        assert!((m.bias - 0.5).abs() < TOL);
        assert!((m.max_error - 0.5).abs() < TOL);
    }

    #[test]
    fn test_missing_pairs_skipped() {
        let obs = vec![1.0, f64::NAN, 3.0];
        let pred = vec![1.0, 2.0, 3.0];
        let m = ResidualMetrics::compute(&pred, &obs).unwrap();
        assert_eq!(m.n_points, 2);
        assert!(ResidualMetrics::compute(&pred, &obs[..2]).is_none());
        assert!(ResidualMetrics::compute(&[f64::NAN], &[1.0]).is_none());
    }

    #[test]
    fn test_constituent_comparison() {
        let a = ConstituentSet::from_named(0.0, &[("M2", 1.1, 5.0), ("K1", 0.2, 0.0)]).unwrap();
        let b = ConstituentSet::from_named(0.0, &[("M2", 1.0, 355.0)]).unwrap();

        let cmp = ConstituentComparison::between(&a, &b);
        assert_eq!(cmp.len(), 1);
        assert!((cmp[0].amplitude_ratio - 1.1).abs() < TOL);
        assert!((cmp[0].phase_error - 10.0).abs() < TOL);
    }
}
