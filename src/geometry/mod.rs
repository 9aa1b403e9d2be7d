//! Idealized estuary geometry.
//!
//! An estuary is modeled as three straight reaches laid out along y:
//!
//! ```text
//!   y_r ┌──┐            river   (width w_r)
//!       │  │
//!   y_b ┌────────┐      bay     (w_b at the mouth, w_t at the head)
//!       │        │
//!   y_o ┌──────────────┐ ocean  (w_o = 3 w_b)
//!       │              │
//!   y0  └──────────────┘
//!      x_o1          x_o2
//! ```
//!
//! Each reach carries one [`PlanarPatch`] giving its bed elevation. The
//! rasterizer samples the patches on a regular grid, and the survey module
//! derives shape ratios from measured bays.

mod bay;
mod patch;
mod survey;
mod topography;

pub use bay::{BayGeometry, BayShape, ShapeKind};
pub use patch::{Footprint, PlanarPatch, Point3, Reach};
pub use survey::{BayMeasurement, RatioRange, ShapeRatios, SurveyError, read_survey};
pub use topography::{LAND_ELEVATION, Topography, TopographyGrid, rasterize};

use crate::io::ConfigError;
use thiserror::Error;

/// Error type for geometry construction.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Unsupported enumerated value
    #[error("invalid {field} '{value}', expected one of: {allowed}")]
    InvalidValue {
        field: &'static str,
        value: String,
        allowed: &'static str,
    },

    /// Parameter must be strictly positive
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    /// A derived width exceeds the bay base width
    #[error("{field} {width} exceeds base width {base}")]
    TooWide {
        field: &'static str,
        width: f64,
        base: f64,
    },

    /// Grid description is unusable
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// Configuration lookup failed
    #[error(transparent)]
    Config(#[from] ConfigError),
}
