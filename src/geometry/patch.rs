//! Planar elevation patches.
//!
//! # Mathematical Background
//!
//! A plane through three points P, Q, R has normal
//! ```text
//! N = (Q − P) × (R − P)
//! ```
//! and elevation
//! ```text
//! z(x, y) = P.z − (N.x / N.z)(x − P.x) − (N.y / N.z)(y − P.y)
//! ```

/// A point in 3-D (x, y in meters, z elevation in meters).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn sub(self, other: Point3) -> Point3 {
        Point3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    fn cross(self, other: Point3) -> Point3 {
        Point3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
}

/// Axis-aligned rectangle `[x_min, x_max] × [y_min, y_max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Footprint {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Inclusive membership test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Strict interior membership test.
    pub fn contains_strictly(&self, x: f64, y: f64) -> bool {
        x > self.x_min && x < self.x_max && y > self.y_min && y < self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// Along-channel segment of the estuary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reach {
    Ocean,
    Bay,
    River,
}

/// Plane through three control points, valid within a footprint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanarPatch {
    pub reach: Reach,
    pub p: Point3,
    pub q: Point3,
    pub r: Point3,
    pub footprint: Footprint,
}

impl PlanarPatch {
    pub fn new(reach: Reach, p: Point3, q: Point3, r: Point3, footprint: Footprint) -> Self {
        Self {
            reach,
            p,
            q,
            r,
            footprint,
        }
    }

    /// Plane normal N = (Q − P) × (R − P).
    pub fn normal(&self) -> Point3 {
        self.q.sub(self.p).cross(self.r.sub(self.p))
    }

    /// Elevation of the plane at (x, y), regardless of the footprint.
    pub fn elevation_at(&self, x: f64, y: f64) -> f64 {
        let n = self.normal();
        self.p.z - (n.x / n.z) * (x - self.p.x) - (n.y / n.z) * (y - self.p.y)
    }

    /// Elevation at (x, y) if the point lies in the footprint.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        self.footprint
            .contains(x, y)
            .then(|| self.elevation_at(x, y))
    }
}
