//! GeoClaw topography file writer.
//!
//! # File Formats
//!
//! Rows run north to south, columns west to east.
//!
//! ## Topotype 1
//!
//! One `x y z` triple per line.
//!
//! ## Topotype 2
//!
//! ```text
//!    201                              ncols
//!    521                              nrows
//!  0.000000000000000e+00              xlower
//!  0.000000000000000e+00              ylower
//!  2.500000000000000e+02              cellsize
//!  -9999                              nodata_value
//!  1.000000000000000e+01
//!  ...
//! ```
//!
//! Header as above, then one `z` per line.
//!
//! ## Topotype 3
//!
//! Same header, then one grid row per line.
//!
//! Writing is idempotent: an existing file is left untouched. Files are
//! written to a temporary sibling and renamed into place, so an interrupted
//! write never leaves a partial file behind.

use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::geometry::{BayGeometry, LAND_ELEVATION, Topography, TopographyGrid, rasterize};

/// Missing-data marker in the header.
pub const NODATA_VALUE: i32 = -9999;

/// Error type for topography output.
#[derive(Debug, Error)]
pub enum TopoFileError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported topotype
    #[error("invalid topotype '{value}', expected one of: {allowed}")]
    InvalidValue { value: String, allowed: &'static str },

    /// Header formats need square cells
    #[error("topotype {kind} requires square cells, got dx = {dx}, dy = {dy}")]
    NonSquareCells { kind: TopoType, dx: f64, dy: f64 },
}

/// GeoClaw topography layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TopoType {
    One,
    #[default]
    Two,
    Three,
}

impl TopoType {
    pub fn number(&self) -> u8 {
        match self {
            TopoType::One => 1,
            TopoType::Two => 2,
            TopoType::Three => 3,
        }
    }
}

impl FromStr for TopoType {
    type Err = TopoFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(TopoType::One),
            "2" => Ok(TopoType::Two),
            "3" => Ok(TopoType::Three),
            _ => Err(TopoFileError::InvalidValue {
                value: s.to_string(),
                allowed: "1, 2, 3",
            }),
        }
    }
}

impl fmt::Display for TopoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Outcome of a memoized write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteStatus {
    Written(PathBuf),
    Skipped(PathBuf),
}

impl WriteStatus {
    pub fn path(&self) -> &Path {
        match self {
            WriteStatus::Written(p) | WriteStatus::Skipped(p) => p,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, WriteStatus::Written(_))
    }
}

/// C-style `%22.15e`: two-digit signed exponent, right-aligned in 22 columns.
fn sci(value: f64) -> String {
    let raw = format!("{:.15e}", value);
    let formatted = match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        // inf / NaN
        None => raw,
    };
    format!("{:>22}", formatted)
}

/// Write a topography file unless `path` already exists.
///
/// # Errors
/// - `NonSquareCells` for topotype 2/3 when `dx != dy`
pub fn write_topography(
    path: &Path,
    topo: &Topography,
    kind: TopoType,
) -> Result<WriteStatus, TopoFileError> {
    if path.exists() {
        log::info!("{} exists, skipping", path.display());
        return Ok(WriteStatus::Skipped(path.to_path_buf()));
    }

    let grid = &topo.grid;
    let (dx, dy) = (grid.dx(), grid.dy());
    if kind != TopoType::One && (dx - dy).abs() > 1e-9 * dx.abs().max(dy.abs()) {
        return Err(TopoFileError::NonSquareCells { kind, dx, dy });
    }

    write_atomically(path, |out| {
        match kind {
            TopoType::One => {
                for j in (0..grid.ny).rev() {
                    let y = grid.y(j);
                    for (i, &z) in topo.row(j).iter().enumerate() {
                        writeln!(out, "{} {} {}", sci(grid.x(i)), sci(y), sci(z))?;
                    }
                }
            }
            TopoType::Two | TopoType::Three => {
                writeln!(out, "{:6}                              ncols", grid.nx)?;
                writeln!(out, "{:6}                              nrows", grid.ny)?;
                writeln!(out, "{}              xlower", sci(grid.x_lower))?;
                writeln!(out, "{}              ylower", sci(grid.y_lower))?;
                writeln!(out, "{}              cellsize", sci(dx))?;
                writeln!(out, "{:10}                 nodata_value", NODATA_VALUE)?;

                for j in (0..grid.ny).rev() {
                    let row = topo.row(j);
                    if kind == TopoType::Two {
                        for &z in row {
                            writeln!(out, "{}", sci(z))?;
                        }
                    } else {
                        let line: Vec<String> = row.iter().map(|&z| sci(z)).collect();
                        writeln!(out, "{}", line.join(" "))?;
                    }
                }
            }
        }
        Ok(())
    })?;

    log::info!(
        "wrote topotype {} ({}x{}) to {}",
        kind,
        grid.nx,
        grid.ny,
        path.display()
    );
    Ok(WriteStatus::Written(path.to_path_buf()))
}

/// Write through `fill` into a temporary file next to `path`, then rename it
/// onto `path`. On error the temporary file is removed and `path` is not
/// created.
fn write_atomically<F>(path: &Path, fill: F) -> Result<(), TopoFileError>
where
    F: FnOnce(&mut BufWriter<NamedTempFile>) -> std::io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut out = BufWriter::new(NamedTempFile::new_in(dir)?);
    fill(&mut out)?;
    let tmp = out.into_inner().map_err(|e| e.into_error())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Rasterize a bay onto `grid` and write it, unless `path` already exists.
///
/// The existence check happens before rasterization.
pub fn write_topography_with(
    path: &Path,
    geometry: &BayGeometry,
    grid: &TopographyGrid,
    kind: TopoType,
) -> Result<WriteStatus, TopoFileError> {
    if path.exists() {
        log::info!("{} exists, skipping", path.display());
        return Ok(WriteStatus::Skipped(path.to_path_buf()));
    }
    let topo = rasterize(geometry, grid, LAND_ELEVATION);
    write_topography(path, &topo, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ramp() -> Topography {
        // 3 x 2 nodes, z = i + 10 j
        let grid = TopographyGrid::new(0.0, 2.0, 0.0, 1.0, 3, 2).unwrap();
        let z = (0..2)
            .flat_map(|j| (0..3).map(move |i| (i + 10 * j) as f64))
            .collect();
        Topography { grid, z }
    }

    #[test]
    fn test_sci_format() {
        assert_eq!(sci(10.0), " 1.000000000000000e+01");
        assert_eq!(sci(-2.5e-3), "-2.500000000000000e-03");
        assert_eq!(sci(0.0).len(), 22);
    }

    #[test]
    fn test_parse_topotype() {
        assert_eq!("3".parse::<TopoType>().unwrap(), TopoType::Three);
        match "4".parse::<TopoType>() {
            Err(TopoFileError::InvalidValue { allowed, .. }) => assert_eq!(allowed, "1, 2, 3"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_topotype2_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ramp.tt2");
        let status = write_topography(&path, &ramp(), TopoType::Two).unwrap();
        assert!(status.was_written());

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 6 + 6);
        assert!(lines[0].trim_start().starts_with("3 "));
        assert!(lines[1].trim_start().starts_with("2 "));
        assert!(lines[5].contains("-9999"));
        // North row first
        let first: f64 = lines[6].trim().parse().unwrap();
        let last: f64 = lines[11].trim().parse().unwrap();
        assert_eq!(first, 10.0);
        assert_eq!(last, 2.0);
    }

    #[test]
    fn test_topotype3_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ramp.tt3");
        write_topography(&path, &ramp(), TopoType::Three).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let rows: Vec<Vec<f64>> = content
            .lines()
            .skip(6)
            .map(|l| l.split_whitespace().map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows, vec![vec![10.0, 11.0, 12.0], vec![0.0, 1.0, 2.0]]);
    }

    #[test]
    fn test_topotype1_triples() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ramp.tt1");
        write_topography(&path, &ramp(), TopoType::One).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let first: Vec<f64> = content
            .lines()
            .next()
            .unwrap()
            .split_whitespace()
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(first, vec![0.0, 1.0, 10.0]);
        assert_eq!(content.lines().count(), 6);
    }

    #[test]
    fn test_existing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ramp.tt2");
        fs::write(&path, "keep me").unwrap();

        let status = write_topography(&path, &ramp(), TopoType::Two).unwrap();
        assert_eq!(status, WriteStatus::Skipped(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[test]
    fn test_interrupted_write_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.tt3");

        let result = write_atomically(&path, |out| {
            writeln!(out, "     3                              ncols")?;
            Err(std::io::Error::other("disk full"))
        });
        assert!(matches!(result, Err(TopoFileError::IoError(_))));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        // The next run writes the file instead of skipping it
        let status = write_topography(&path, &ramp(), TopoType::Three).unwrap();
        assert!(status.was_written());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_non_square_cells() {
        let dir = TempDir::new().unwrap();
        let grid = TopographyGrid::new(0.0, 4.0, 0.0, 1.0, 3, 2).unwrap();
        let topo = Topography {
            grid,
            z: vec![0.0; 6],
        };
        assert!(matches!(
            write_topography(&dir.path().join("a"), &topo, TopoType::Two),
            Err(TopoFileError::NonSquareCells { .. })
        ));
        assert!(write_topography(&dir.path().join("b"), &topo, TopoType::One).is_ok());
    }
}
