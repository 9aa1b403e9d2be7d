//! Rasterization of bay geometry onto a regular grid.
//!
//! Grid nodes are placed like `linspace`: `x_i = x_lower + i·dx` with
//! `dx = (x_upper − x_lower)/(nx − 1)`, so both ends are nodes. Each node
//! takes the elevation of the first patch (ocean, bay, river) whose
//! footprint contains it, otherwise the background elevation.

use super::{BayGeometry, GeometryError};

/// Elevation assigned to nodes outside every reach (dry land).
pub const LAND_ELEVATION: f64 = 10.0;

/// Regular grid of nodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TopographyGrid {
    pub x_lower: f64,
    pub x_upper: f64,
    pub y_lower: f64,
    pub y_upper: f64,
    pub nx: usize,
    pub ny: usize,
}

impl TopographyGrid {
    /// Create a grid with `nx × ny` nodes spanning the given bounds.
    pub fn new(
        x_lower: f64,
        x_upper: f64,
        y_lower: f64,
        y_upper: f64,
        nx: usize,
        ny: usize,
    ) -> Result<Self, GeometryError> {
        if nx < 2 || ny < 2 {
            return Err(GeometryError::InvalidGrid(format!(
                "need at least 2 nodes per direction, got {}x{}",
                nx, ny
            )));
        }
        if !(x_upper > x_lower) || !(y_upper > y_lower) {
            return Err(GeometryError::InvalidGrid(format!(
                "empty extent [{}, {}] x [{}, {}]",
                x_lower, x_upper, y_lower, y_upper
            )));
        }
        Ok(Self {
            x_lower,
            x_upper,
            y_lower,
            y_upper,
            nx,
            ny,
        })
    }

    /// Square-celled grid covering the full extent of a bay.
    ///
    /// Starts at `(x_o1, y0)`; the upper bounds are rounded outward to a
    /// whole number of cells.
    pub fn covering(geometry: &BayGeometry, cell_size: f64) -> Result<Self, GeometryError> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(GeometryError::NonPositive {
                field: "cell size",
                value: cell_size,
            });
        }
        let extent = geometry.extent();
        // Tolerance keeps exact multiples from gaining a cell
        let cells = |len: f64| ((len / cell_size) - 1e-9).ceil().max(1.0) as usize;
        let nx_cells = cells(extent.width());
        let ny_cells = cells(extent.height());

        Self::new(
            extent.x_min,
            extent.x_min + nx_cells as f64 * cell_size,
            extent.y_min,
            extent.y_min + ny_cells as f64 * cell_size,
            nx_cells + 1,
            ny_cells + 1,
        )
    }

    /// Node spacing in x.
    pub fn dx(&self) -> f64 {
        (self.x_upper - self.x_lower) / (self.nx - 1) as f64
    }

    /// Node spacing in y.
    pub fn dy(&self) -> f64 {
        (self.y_upper - self.y_lower) / (self.ny - 1) as f64
    }

    /// x-coordinate of column i.
    pub fn x(&self, i: usize) -> f64 {
        if i + 1 == self.nx {
            self.x_upper
        } else {
            self.x_lower + i as f64 * self.dx()
        }
    }

    /// y-coordinate of row j.
    pub fn y(&self, j: usize) -> f64 {
        if j + 1 == self.ny {
            self.y_upper
        } else {
            self.y_lower + j as f64 * self.dy()
        }
    }
}

/// Elevations on a grid.
///
/// Layout: `z[j * nx + i]` for row j (south to north), column i (west to east).
#[derive(Clone, Debug)]
pub struct Topography {
    pub grid: TopographyGrid,
    pub z: Vec<f64>,
}

impl Topography {
    /// Elevation at column i, row j.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.z[j * self.grid.nx + i]
    }

    /// One grid row (south to north index).
    pub fn row(&self, j: usize) -> &[f64] {
        &self.z[j * self.grid.nx..(j + 1) * self.grid.nx]
    }

    /// x-coordinate of column i.
    pub fn x(&self, i: usize) -> f64 {
        self.grid.x(i)
    }

    /// y-coordinate of row j.
    pub fn y(&self, j: usize) -> f64 {
        self.grid.y(j)
    }

    /// Minimum elevation.
    pub fn min(&self) -> f64 {
        self.z.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Maximum elevation.
    pub fn max(&self) -> f64 {
        self.z.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Sample a bay's patches at every grid node.
pub fn rasterize(geometry: &BayGeometry, grid: &TopographyGrid, background: f64) -> Topography {
    let xs: Vec<f64> = (0..grid.nx).map(|i| grid.x(i)).collect();
    let mut z = vec![background; grid.nx * grid.ny];

    for (j, row) in z.chunks_mut(grid.nx).enumerate() {
        let y = grid.y(j);
        for (value, &x) in row.iter_mut().zip(xs.iter()) {
            *value = geometry.elevation_at(x, y, background);
        }
    }

    log::debug!(
        "rasterized {}x{} nodes over [{}, {}] x [{}, {}]",
        grid.nx,
        grid.ny,
        grid.x_lower,
        grid.x_upper,
        grid.y_lower,
        grid.y_upper
    );

    Topography { grid: *grid, z }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BayShape, Reach, ShapeKind};

    const TOL: f64 = 1e-10;

    fn geometry() -> BayGeometry {
        BayShape::new(ShapeKind::Triangle, 10e3, 5.0, 2.0, 1.0, -8.0)
            .with_river_elevation(-1.0)
            .with_reach_lengths(20e3, 30e3)
            .geometry()
            .unwrap()
    }

    #[test]
    fn test_grid_spacing() {
        let grid = TopographyGrid::new(0.0, 50e3, 0.0, 130e3, 201, 521).unwrap();
        assert!((grid.dx() - 250.0).abs() < TOL);
        assert!((grid.dy() - 250.0).abs() < TOL);
        assert_eq!(grid.x(200), 50e3);
    }

    #[test]
    fn test_invalid_grid() {
        assert!(TopographyGrid::new(0.0, 1.0, 0.0, 1.0, 1, 5).is_err());
        assert!(TopographyGrid::new(1.0, 1.0, 0.0, 1.0, 3, 5).is_err());
    }

    #[test]
    fn test_covering_grid_contains_extent() {
        let g = geometry();
        let grid = TopographyGrid::covering(&g, 3e3).unwrap();
        let extent = g.extent();

        assert_eq!(grid.x_lower, extent.x_min);
        assert!(grid.x_upper >= extent.x_max);
        assert!(grid.y_upper >= extent.y_max);
        assert!((grid.dx() - grid.dy()).abs() < 1e-9);

        // Exact multiple: 30 km wide at 1 km cells gives 31 nodes
        let exact = TopographyGrid::covering(&g, 1e3).unwrap();
        assert_eq!(exact.nx, 31);
    }

    #[test]
    fn test_rasterize_precedence_and_background() {
        let g = geometry();
        let grid = TopographyGrid::covering(&g, 500.0).unwrap();
        let topo = rasterize(&g, &grid, LAND_ELEVATION);

        for j in 0..grid.ny {
            for i in 0..grid.nx {
                let (x, y) = (topo.x(i), topo.y(j));
                let z = topo.get(i, j);
                let owner = g.patches().iter().find(|p| p.footprint.contains(x, y));
                match owner {
                    Some(p) => assert!((z - p.elevation_at(x, y)).abs() < 1e-9),
                    None => assert_eq!(z, LAND_ELEVATION),
                }
            }
        }

        // Ocean wins on the shared edge y = y_o
        let j = ((g.y_o - grid.y_lower) / grid.dy()).round() as usize;
        let i = ((0.5 * (g.x_b1 + g.x_b2) - grid.x_lower) / grid.dx()).round() as usize;
        let ocean = g.patch(Reach::Ocean);
        assert!((topo.get(i, j) - ocean.elevation_at(topo.x(i), topo.y(j))).abs() < TOL);
        assert!(topo.min() < g.z_o);
        assert_eq!(topo.max(), LAND_ELEVATION);
    }
}
