//! Parametric bay shapes and their derived geometry.
//!
//! A [`BayShape`] holds the free parameters of an idealized estuary; its
//! [`BayGeometry`] holds every derived quantity, all closed-form:
//!
//! ```text
//! w_r = w_b / R_br                 river width
//! w_t = w_b / R_bt  (trapezoid)    bay head width
//!     = w_r         (triangle)
//! w_o = 3 w_b                      ocean width
//! l_b = R_lb w_b                   bay length
//!
//! z0  = z_o − S_o l_o              deep-ocean elevation
//! z_b = z_o + S_b l_b              bay head elevation
//! ```
//!
//! The bay and river are centered on the ocean reach in x.

use super::patch::{Footprint, PlanarPatch, Point3, Reach};
use super::GeometryError;
use crate::io::ConfigFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plan-view shape of the bay reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Bay narrows to the river width
    Triangle,
    /// Bay narrows to a separate head width `w_b / R_bt`
    Trapezoid,
}

impl FromStr for ShapeKind {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "triangle" | "triangular" => Ok(ShapeKind::Triangle),
            "trapezoid" | "trapezoidal" => Ok(ShapeKind::Trapezoid),
            _ => Err(GeometryError::InvalidValue {
                field: "shape",
                value: s.to_string(),
                allowed: "triangle, trapezoid",
            }),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Triangle => write!(f, "triangle"),
            ShapeKind::Trapezoid => write!(f, "trapezoid"),
        }
    }
}

/// Free parameters of an idealized estuary.
///
/// Lengths in meters, elevations in meters (negative below datum), slopes
/// dimensionless.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BayShape {
    pub kind: ShapeKind,
    /// Bay base (mouth) width
    pub w_b: f64,
    /// Base-to-river width ratio
    pub r_br: f64,
    /// Length-to-base ratio of the bay
    pub r_lb: f64,
    /// Base-to-top width ratio (trapezoid only)
    pub r_bt: f64,
    /// Elevation at the bay mouth
    pub z_o: f64,
    /// Elevation at the landward end of the river
    pub z_r: f64,
    /// Ocean shelf slope
    pub s_o: f64,
    /// Bay bed slope
    pub s_b: f64,
    /// Western edge of the ocean reach
    pub x_o1: f64,
    /// Seaward edge of the ocean reach
    pub y0: f64,
    /// Ocean reach length
    pub l_o: f64,
    /// River reach length
    pub l_r: f64,
    /// Suggested topography cell size
    pub cell_size: f64,
}

impl BayShape {
    /// Create a shape with default slopes, origin and reach lengths.
    pub fn new(kind: ShapeKind, w_b: f64, r_br: f64, r_lb: f64, r_bt: f64, z_o: f64) -> Self {
        Self {
            kind,
            w_b,
            r_br,
            r_lb,
            r_bt,
            z_o,
            z_r: -1e3,
            s_o: 2e-3,
            s_b: 2e-4,
            x_o1: 0.0,
            y0: 0.0,
            l_o: 50e3,
            l_r: 100e3,
            cell_size: 2e3,
        }
    }

    /// Set the river end elevation.
    pub fn with_river_elevation(mut self, z_r: f64) -> Self {
        self.z_r = z_r;
        self
    }

    /// Set the domain origin (western and seaward edges).
    pub fn with_origin(mut self, x_o1: f64, y0: f64) -> Self {
        self.x_o1 = x_o1;
        self.y0 = y0;
        self
    }

    /// Set the ocean and bay slopes.
    pub fn with_slopes(mut self, s_o: f64, s_b: f64) -> Self {
        self.s_o = s_o;
        self.s_b = s_b;
        self
    }

    /// Set the ocean and river reach lengths.
    pub fn with_reach_lengths(mut self, l_o: f64, l_r: f64) -> Self {
        self.l_o = l_o;
        self.l_r = l_r;
        self
    }

    /// Set the suggested cell size.
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Load a shape from a configuration section.
    ///
    /// Required keys: `shape`, `w_b`, `R_br`, `R_lb`, `z_o`, and `R_bt` for
    /// trapezoids. Optional keys: `z_r`, `S_o`, `S_b`, `x_o1`, `y0`, `l_o`,
    /// `l_r`, `cell_size`.
    pub fn from_config(config: &ConfigFile, section: Option<&str>) -> Result<Self, GeometryError> {
        let kind: ShapeKind = config.text(section, "shape")?.parse()?;
        let w_b = config.number(section, "w_b")?;
        let r_br = config.number(section, "R_br")?;
        let r_lb = config.number(section, "R_lb")?;
        let r_bt = match kind {
            ShapeKind::Trapezoid => config.number(section, "R_bt")?,
            ShapeKind::Triangle => config.number_or(section, "R_bt", 1.0)?,
        };
        let z_o = config.number(section, "z_o")?;

        let defaults = Self::new(kind, w_b, r_br, r_lb, r_bt, z_o);
        Ok(defaults
            .with_river_elevation(config.number_or(section, "z_r", defaults.z_r)?)
            .with_slopes(
                config.number_or(section, "S_o", defaults.s_o)?,
                config.number_or(section, "S_b", defaults.s_b)?,
            )
            .with_origin(
                config.number_or(section, "x_o1", defaults.x_o1)?,
                config.number_or(section, "y0", defaults.y0)?,
            )
            .with_reach_lengths(
                config.number_or(section, "l_o", defaults.l_o)?,
                config.number_or(section, "l_r", defaults.l_r)?,
            )
            .with_cell_size(config.number_or(section, "cell_size", defaults.cell_size)?))
    }

    /// Validate the parameters and compute the derived geometry.
    pub fn geometry(&self) -> Result<BayGeometry, GeometryError> {
        for (field, value) in [
            ("base width", self.w_b),
            ("R_br", self.r_br),
            ("R_lb", self.r_lb),
            ("R_bt", self.r_bt),
            ("ocean length", self.l_o),
            ("river length", self.l_r),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(GeometryError::NonPositive { field, value });
            }
        }

        let w_b = self.w_b;
        let w_r = w_b / self.r_br;
        let w_t = match self.kind {
            ShapeKind::Trapezoid => w_b / self.r_bt,
            ShapeKind::Triangle => w_r,
        };
        let w_o = 3.0 * w_b;

        if w_r > w_b {
            return Err(GeometryError::TooWide {
                field: "river width",
                width: w_r,
                base: w_b,
            });
        }
        if w_t > w_b {
            return Err(GeometryError::TooWide {
                field: "top width",
                width: w_t,
                base: w_b,
            });
        }

        let l_b = self.r_lb * w_b;
        let z_b = self.z_o + self.s_b * l_b;
        let z0 = self.z_o - self.s_o * self.l_o;

        let x_o1 = self.x_o1;
        let x_o2 = x_o1 + w_o;
        let x_b1 = x_o1 + 0.5 * (w_o - w_b);
        let x_b2 = x_b1 + w_b;
        let x_b3 = x_b1 + 0.5 * (w_b - w_t);
        let x_b4 = x_b3 + w_t;
        let x_r1 = x_b1 + 0.5 * (w_b - w_r);
        let x_r2 = x_r1 + w_r;

        let y0 = self.y0;
        let y_o = y0 + self.l_o;
        let y_b = y_o + l_b;
        let y_r = y_b + self.l_r;

        let ocean = PlanarPatch::new(
            Reach::Ocean,
            Point3::new(x_o1, y0, z0),
            Point3::new(x_o2, y0, z0),
            Point3::new(x_o1, y_o, self.z_o),
            Footprint::new(x_o1, x_o2, y0, y_o),
        );
        let bay = PlanarPatch::new(
            Reach::Bay,
            Point3::new(x_b1, y_o, self.z_o),
            Point3::new(x_b2, y_o, self.z_o),
            Point3::new(x_b3, y_b, z_b),
            Footprint::new(x_b1, x_b2, y_o, y_b),
        );
        let river = PlanarPatch::new(
            Reach::River,
            Point3::new(x_r1, y_b, z_b),
            Point3::new(x_r2, y_b, z_b),
            Point3::new(x_r1, y_r, self.z_r),
            Footprint::new(x_r1, x_r2, y_b, y_r),
        );

        Ok(BayGeometry {
            shape: *self,
            w_o,
            w_b,
            w_t,
            w_r,
            l_o: self.l_o,
            l_b,
            l_r: self.l_r,
            x_o1,
            x_b1,
            x_b3,
            x_r1,
            x_r2,
            x_b4,
            x_b2,
            x_o2,
            y0,
            y_o,
            y_b,
            y_r,
            z0,
            z_o: self.z_o,
            z_b,
            z_r: self.z_r,
            patches: [ocean, bay, river],
        })
    }
}

/// Derived geometry of a validated [`BayShape`].
#[derive(Clone, Debug, PartialEq)]
pub struct BayGeometry {
    /// Parameters this geometry was built from
    pub shape: BayShape,
    pub w_o: f64,
    pub w_b: f64,
    pub w_t: f64,
    pub w_r: f64,
    pub l_o: f64,
    pub l_b: f64,
    pub l_r: f64,
    pub x_o1: f64,
    pub x_b1: f64,
    pub x_b3: f64,
    pub x_r1: f64,
    pub x_r2: f64,
    pub x_b4: f64,
    pub x_b2: f64,
    pub x_o2: f64,
    pub y0: f64,
    pub y_o: f64,
    pub y_b: f64,
    pub y_r: f64,
    pub z0: f64,
    pub z_o: f64,
    pub z_b: f64,
    pub z_r: f64,
    patches: [PlanarPatch; 3],
}

impl BayGeometry {
    /// Patches in precedence order: ocean, bay, river.
    pub fn patches(&self) -> &[PlanarPatch; 3] {
        &self.patches
    }

    /// Patch of one reach.
    pub fn patch(&self, reach: Reach) -> &PlanarPatch {
        match reach {
            Reach::Ocean => &self.patches[0],
            Reach::Bay => &self.patches[1],
            Reach::River => &self.patches[2],
        }
    }

    /// Full domain `[x_o1, x_o2] × [y0, y_r]`.
    pub fn extent(&self) -> Footprint {
        Footprint::new(self.x_o1, self.x_o2, self.y0, self.y_r)
    }

    /// Elevation at (x, y): first patch whose footprint contains the point,
    /// else `background`.
    pub fn elevation_at(&self, x: f64, y: f64, background: f64) -> f64 {
        self.patches
            .iter()
            .find_map(|p| p.sample(x, y))
            .unwrap_or(background)
    }

    /// Lateral slopes (west bank, east bank) of the taper from base width to
    /// head width. Zero when the two widths coincide.
    pub fn taper_slopes(&self) -> (f64, f64) {
        let half = 0.5 * (self.w_b - self.w_t);
        if half.abs() < f64::EPSILON * self.w_b {
            return (0.0, 0.0);
        }
        let dz = self.z_b - self.z_o;
        (dz / half, -dz / half)
    }

    /// River channel width.
    pub fn river_width(&self) -> f64 {
        self.x_r2 - self.x_r1
    }

    /// River cross-sectional area `w_r · |z_r|`.
    pub fn river_area(&self) -> f64 {
        self.river_width() * self.z_r.abs()
    }
}
