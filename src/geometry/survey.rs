//! Shape ratios of measured bays.
//!
//! A survey table lists one measured bay per row:
//!
//! ```text
//! Shape,Lon,Lat,Wb,Wr,Lb,Wt
//! triangle,-40.5,73.9,17,2,24,
//! trapezoid,-67.15,44.83,28,1,35,15
//! ```
//!
//! Widths and lengths share one unit (only ratios are used). `Wt` is left
//! empty for triangular bays.

use super::ShapeKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for survey tables.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Survey file does not exist
    #[error("survey file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Row cannot produce ratios
    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// One measured bay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BayMeasurement {
    #[serde(rename = "Shape")]
    pub shape: ShapeKind,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Wb")]
    pub w_b: f64,
    #[serde(rename = "Wr")]
    pub w_r: f64,
    #[serde(rename = "Lb")]
    pub l_b: f64,
    #[serde(rename = "Wt")]
    pub w_t: Option<f64>,
}

/// Dimensionless ratios of one bay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeRatios {
    /// Base to river width, w_b / w_r
    pub r_br: f64,
    /// Bay length to base width, l_b / w_b
    pub r_lb: f64,
    /// Base to top width, w_b / w_t (trapezoids only)
    pub r_bt: Option<f64>,
}

impl BayMeasurement {
    pub fn ratios(&self) -> ShapeRatios {
        let r_bt = match self.shape {
            ShapeKind::Triangle => None,
            ShapeKind::Trapezoid => self.w_t.map(|w_t| self.w_b / w_t),
        };
        ShapeRatios {
            r_br: self.w_b / self.w_r,
            r_lb: self.l_b / self.w_b,
            r_bt,
        }
    }

    fn check(&self, row: usize) -> Result<(), SurveyError> {
        for (name, v) in [("Wb", self.w_b), ("Wr", self.w_r), ("Lb", self.l_b)] {
            if !(v > 0.0) {
                return Err(SurveyError::InvalidRow {
                    row,
                    message: format!("{} must be positive, got {}", name, v),
                });
            }
        }
        if self.shape == ShapeKind::Trapezoid && !self.w_t.is_some_and(|w| w > 0.0) {
            return Err(SurveyError::InvalidRow {
                row,
                message: "trapezoid needs a positive Wt".to_string(),
            });
        }
        Ok(())
    }
}

/// Observed minimum and maximum ratios for one shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RatioRange {
    pub count: usize,
    pub min: ShapeRatios,
    pub max: ShapeRatios,
}

impl RatioRange {
    fn from_first(r: ShapeRatios) -> Self {
        Self {
            count: 1,
            min: r,
            max: r,
        }
    }

    fn include(&mut self, r: ShapeRatios) {
        self.count += 1;
        self.min.r_br = self.min.r_br.min(r.r_br);
        self.max.r_br = self.max.r_br.max(r.r_br);
        self.min.r_lb = self.min.r_lb.min(r.r_lb);
        self.max.r_lb = self.max.r_lb.max(r.r_lb);
        self.min.r_bt = merge(self.min.r_bt, r.r_bt, f64::min);
        self.max.r_bt = merge(self.max.r_bt, r.r_bt, f64::max);
    }

    /// Min/max of each ratio grouped by shape.
    pub fn by_shape(measurements: &[BayMeasurement]) -> BTreeMap<ShapeKind, RatioRange> {
        let mut ranges: BTreeMap<ShapeKind, RatioRange> = BTreeMap::new();
        for m in measurements {
            let r = m.ratios();
            ranges
                .entry(m.shape)
                .and_modify(|range| range.include(r))
                .or_insert_with(|| RatioRange::from_first(r));
        }
        ranges
    }
}

fn merge(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Read a survey table.
pub fn read_survey(path: &Path) -> Result<Vec<BayMeasurement>, SurveyError> {
    if !path.exists() {
        return Err(SurveyError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut measurements = Vec::new();
    for (i, record) in rdr.deserialize().enumerate() {
        let m: BayMeasurement = record?;
        m.check(i + 1)?;
        measurements.push(m);
    }
    log::debug!("read {} bay measurements from {}", measurements.len(), path.display());
    Ok(measurements)
}
