//! Boundary-condition files for D-Flow FM and GeoClaw.
//!
//! # D-Flow FM
//!
//! Forcing blocks in the `.bc` format:
//!
//! ```text
//! [forcing]
//! Name                            = WaterLevel_0001
//! Function                        = timeseries
//! Time-interpolation              = linear
//! Quantity                        = time
//! Unit                            = seconds since 2019-02-01 00:00:00
//! Quantity                        = waterlevelbnd
//! Unit                            = m
//! 0 0.1523
//! 360 0.1611
//! ```
//!
//! Water levels go to both open-boundary points (`WaterLevel_0001` and
//! `WaterLevel_0002`) in one `WaterLevel_<key>.bc`. Discharge files hold two
//! rows (start and end of the period) at a constant rate, one file per
//! forcing state.
//!
//! # GeoClaw
//!
//! - `water_level_<key>.bc`: `sec value` rows
//! - `discharge.bc`: `Q_low = …`, `Q_ref = …`, `Q_high = …`
//! - `tide.data`: copy of the low or high water-level file
//! - `discharge.data`: `q/w_r x_r1 x_r2` (unit discharge and river banks)

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{ConfigError, read_config_file};
use crate::analysis::PredictedSeries;
use crate::geometry::BayGeometry;

/// Error type for boundary-condition files.
#[derive(Debug, Error)]
pub enum BoundaryFileError {
    /// Input file does not exist
    #[error("input file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Discharge file lookup failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unsupported enumerated value
    #[error("invalid value '{value}', expected one of: {allowed}")]
    InvalidValue { value: String, allowed: &'static str },

    /// No usable discharge sample
    #[error("no finite discharge values")]
    NoDischarge,
}

/// Target hydrodynamic model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Solver {
    DFlow,
    GeoClaw,
}

impl FromStr for Solver {
    type Err = BoundaryFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dflow" => Ok(Solver::DFlow),
            "geoclaw" => Ok(Solver::GeoClaw),
            _ => Err(BoundaryFileError::InvalidValue {
                value: s.to_string(),
                allowed: "dflow, geoclaw",
            }),
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solver::DFlow => write!(f, "dflow"),
            Solver::GeoClaw => write!(f, "geoclaw"),
        }
    }
}

/// Forcing scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ForcingState {
    Low,
    Ref,
    High,
}

impl ForcingState {
    /// All states, in file order.
    pub const ALL: [ForcingState; 3] = [ForcingState::Low, ForcingState::Ref, ForcingState::High];

    /// Lowercase key used in file names.
    pub fn key(&self) -> &'static str {
        match self {
            ForcingState::Low => "low",
            ForcingState::Ref => "ref",
            ForcingState::High => "high",
        }
    }
}

impl FromStr for ForcingState {
    type Err = BoundaryFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(ForcingState::Low),
            "ref" => Ok(ForcingState::Ref),
            "high" => Ok(ForcingState::High),
            _ => Err(BoundaryFileError::InvalidValue {
                value: s.to_string(),
                allowed: "low, ref, high",
            }),
        }
    }
}

impl fmt::Display for ForcingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reference-time header replaced in every D-Flow template.
pub const TIME_UNIT_PLACEHOLDER: &str = "seconds since 2001-01-01 00:00:00";

const DISCHARGE_START_PLACEHOLDER: &str = "tmin     Q";
const DISCHARGE_END_PLACEHOLDER: &str = "tmax     Q";

const WATER_LEVEL_TEMPLATE_1: &str = "[forcing]
Name                            = WaterLevel_0001
Function                        = timeseries
Time-interpolation              = linear
Quantity                        = time
Unit                            = seconds since 2001-01-01 00:00:00
Quantity                        = waterlevelbnd
Unit                            = m
";

const WATER_LEVEL_TEMPLATE_2: &str = "[forcing]
Name                            = WaterLevel_0002
Function                        = timeseries
Time-interpolation              = linear
Quantity                        = time
Unit                            = seconds since 2001-01-01 00:00:00
Quantity                        = waterlevelbnd
Unit                            = m
";

const DISCHARGE_TEMPLATE: &str = "[forcing]
Name                            = Discharge_0001
Function                        = timeseries
Time-interpolation              = linear
Quantity                        = time
Unit                            = seconds since 2001-01-01 00:00:00
Quantity                        = dischargebnd
Unit                            = m3/s
tmin     Q
tmax     Q
";

/// D-Flow FM forcing-block templates.
#[derive(Clone, Debug)]
pub struct DFlowTemplates {
    /// One block per open-boundary point
    pub water_level: [String; 2],
    /// Discharge block with `tmin     Q` / `tmax     Q` rows
    pub discharge: String,
}

impl Default for DFlowTemplates {
    fn default() -> Self {
        Self {
            water_level: [
                WATER_LEVEL_TEMPLATE_1.to_string(),
                WATER_LEVEL_TEMPLATE_2.to_string(),
            ],
            discharge: DISCHARGE_TEMPLATE.to_string(),
        }
    }
}

impl DFlowTemplates {
    /// Load `WaterLevel_1.bc`, `WaterLevel_2.bc` and `Discharge.bc` from a
    /// template directory.
    pub fn from_dir(dir: &Path) -> Result<Self, BoundaryFileError> {
        let read = |name: &str| {
            let path = dir.join(name);
            if !path.exists() {
                return Err(BoundaryFileError::NotFound { path });
            }
            Ok(fs::read_to_string(path)?)
        };
        Ok(Self {
            water_level: [read("WaterLevel_1.bc")?, read("WaterLevel_2.bc")?],
            discharge: read("Discharge.bc")?,
        })
    }
}

fn time_unit(start: DateTime<Utc>) -> String {
    format!("seconds since {}", start.format("%Y-%m-%d %H:%M:%S"))
}

fn with_trailing_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

/// `(seconds since first sample, value)` rows of a prediction.
pub fn water_level_rows(series: &PredictedSeries) -> Vec<(i64, f64)> {
    let Some(first) = series.data.first() else {
        return Vec::new();
    };
    series
        .data
        .iter()
        .map(|p| ((p.time - first.time).num_seconds(), p.value))
        .collect()
}

fn format_rows(rows: &[(i64, f64)]) -> String {
    rows.iter()
        .map(|(sec, value)| format!("{} {}\n", sec, value))
        .collect()
}

/// Write a water-level boundary file with the built-in D-Flow templates.
///
/// Returns the path written: `<dir>/WaterLevel_<key>.bc` for D-Flow,
/// `<dir>/water_level_<key>.bc` for GeoClaw. Existing files are replaced.
pub fn write_water_level_bc(
    dir: &Path,
    key: &str,
    rows: &[(i64, f64)],
    start: DateTime<Utc>,
    solver: Solver,
) -> Result<PathBuf, BoundaryFileError> {
    write_water_level_bc_with(&DFlowTemplates::default(), dir, key, rows, start, solver)
}

/// Write a water-level boundary file with explicit D-Flow templates.
pub fn write_water_level_bc_with(
    templates: &DFlowTemplates,
    dir: &Path,
    key: &str,
    rows: &[(i64, f64)],
    start: DateTime<Utc>,
    solver: Solver,
) -> Result<PathBuf, BoundaryFileError> {
    fs::create_dir_all(dir)?;
    let key = key.trim();
    let body = format_rows(rows);

    let (path, content) = match solver {
        Solver::DFlow => {
            let unit = time_unit(start);
            let content: String = templates
                .water_level
                .iter()
                .map(|block| {
                    let header = with_trailing_newline(block.replace(TIME_UNIT_PLACEHOLDER, &unit));
                    header + &body
                })
                .collect();
            (dir.join(format!("WaterLevel_{}.bc", key)), content)
        }
        Solver::GeoClaw => (dir.join(format!("water_level_{}.bc", key)), body),
    };

    fs::write(&path, content)?;
    log::info!("wrote {} water-level rows to {}", rows.len(), path.display());
    Ok(path)
}

/// Discharge rates (m³/s) for the three forcing states.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DischargeLevels {
    pub low: f64,
    pub reference: f64,
    pub high: f64,
}

/// Cubic feet per second to cubic meters per second.
pub const CFS_TO_CMS: f64 = 0.028316846592;

impl DischargeLevels {
    pub fn new(low: f64, reference: f64, high: f64) -> Self {
        Self {
            low,
            reference,
            high,
        }
    }

    /// Minimum, mean and maximum of a gauge record in ft³/s, converted to
    /// m³/s. Non-finite samples are ignored.
    pub fn from_cfs(values: &[f64]) -> Result<Self, BoundaryFileError> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Err(BoundaryFileError::NoDischarge);
        }
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = finite.iter().sum::<f64>() / finite.len() as f64;
        Ok(Self::new(min * CFS_TO_CMS, mean * CFS_TO_CMS, max * CFS_TO_CMS))
    }

    /// Rate for one state.
    pub fn get(&self, state: ForcingState) -> f64 {
        match state {
            ForcingState::Low => self.low,
            ForcingState::Ref => self.reference,
            ForcingState::High => self.high,
        }
    }
}

/// Write discharge boundary files with the built-in D-Flow template.
///
/// D-Flow: `Discharge_low.bc`, `Discharge_ref.bc`, `Discharge_high.bc`;
/// GeoClaw: `discharge.bc`. Returns the paths written.
pub fn write_discharge_bc(
    dir: &Path,
    start: DateTime<Utc>,
    start_sec: i64,
    end_sec: i64,
    levels: &DischargeLevels,
    solver: Solver,
) -> Result<Vec<PathBuf>, BoundaryFileError> {
    write_discharge_bc_with(
        &DFlowTemplates::default(),
        dir,
        start,
        start_sec,
        end_sec,
        levels,
        solver,
    )
}

/// Write discharge boundary files with an explicit D-Flow template.
pub fn write_discharge_bc_with(
    templates: &DFlowTemplates,
    dir: &Path,
    start: DateTime<Utc>,
    start_sec: i64,
    end_sec: i64,
    levels: &DischargeLevels,
    solver: Solver,
) -> Result<Vec<PathBuf>, BoundaryFileError> {
    fs::create_dir_all(dir)?;

    let paths = match solver {
        Solver::DFlow => {
            let unit = time_unit(start);
            let mut paths = Vec::with_capacity(3);
            for state in ForcingState::ALL {
                let q = levels.get(state);
                let content = templates
                    .discharge
                    .replace(TIME_UNIT_PLACEHOLDER, &unit)
                    .replace(DISCHARGE_START_PLACEHOLDER, &format!("{}    {}", start_sec, q))
                    .replace(DISCHARGE_END_PLACEHOLDER, &format!("{}    {}", end_sec, q));
                let path = dir.join(format!("Discharge_{}.bc", state.key()));
                fs::write(&path, content)?;
                paths.push(path);
            }
            paths
        }
        Solver::GeoClaw => {
            let path = dir.join("discharge.bc");
            let content = format!(
                "Q_low = {:.5}\nQ_ref = {:.5}\nQ_high = {:.5}\n",
                levels.low, levels.reference, levels.high
            );
            fs::write(&path, content)?;
            vec![path]
        }
    };

    log::info!(
        "wrote {} discharge file(s) for {} to {}",
        paths.len(),
        solver,
        dir.display()
    );
    Ok(paths)
}

/// Read a GeoClaw `discharge.bc`.
///
/// Keys are `Q_low`, `Q_ref`, `Q_high`; bare `low`, `ref`, `high` are
/// accepted as well.
pub fn read_discharge_bc(path: &Path) -> Result<DischargeLevels, BoundaryFileError> {
    if !path.exists() {
        return Err(BoundaryFileError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let config = read_config_file(path)?;
    let rate = |state: ForcingState| -> Result<f64, ConfigError> {
        let key = format!("Q_{}", state.key());
        if config.contains(None, &key) {
            config.number(None, &key)
        } else {
            config.number(None, state.key())
        }
    };
    Ok(DischargeLevels::new(
        rate(ForcingState::Low)?,
        rate(ForcingState::Ref)?,
        rate(ForcingState::High)?,
    ))
}

/// Copy `water_level_<state>.bc` from `data_dir` to `<dest_dir>/tide.data`.
///
/// Only the low and high states have tide files.
pub fn stage_tide_data(
    data_dir: &Path,
    state: ForcingState,
    dest_dir: &Path,
) -> Result<PathBuf, BoundaryFileError> {
    if state == ForcingState::Ref {
        return Err(BoundaryFileError::InvalidValue {
            value: state.to_string(),
            allowed: "low, high",
        });
    }
    let source = data_dir.join(format!("water_level_{}.bc", state.key()));
    if !source.exists() {
        return Err(BoundaryFileError::NotFound { path: source });
    }
    fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join("tide.data");
    fs::copy(&source, &dest)?;
    log::debug!("staged {} as {}", source.display(), dest.display());
    Ok(dest)
}

/// Write `<dest_dir>/discharge.data` for one state: unit discharge over
/// the river width followed by the river bank coordinates.
pub fn write_discharge_data(
    discharge_bc: &Path,
    state: ForcingState,
    geometry: &BayGeometry,
    dest_dir: &Path,
) -> Result<PathBuf, BoundaryFileError> {
    let levels = read_discharge_bc(discharge_bc)?;
    let unit_discharge = levels.get(state) / geometry.river_width();

    fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join("discharge.data");
    fs::write(
        &dest,
        format!("{} {} {}", unit_discharge, geometry.x_r1, geometry.x_r2),
    )?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TidePoint;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const TOL: f64 = 1e-10;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 2, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("DFlow".parse::<Solver>().unwrap(), Solver::DFlow);
        assert_eq!("geoclaw".parse::<Solver>().unwrap(), Solver::GeoClaw);
        match "delft3d".parse::<Solver>() {
            Err(BoundaryFileError::InvalidValue { allowed, .. }) => {
                assert_eq!(allowed, "dflow, geoclaw")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!("high".parse::<ForcingState>().unwrap(), ForcingState::High);
        assert!("medium".parse::<ForcingState>().is_err());
    }

    #[test]
    fn test_water_level_rows() {
        let t0 = start();
        let series = PredictedSeries {
            data: (0..3)
                .map(|i| TidePoint {
                    time: t0 + chrono::Duration::minutes(6 * i),
                    value: 0.1 * i as f64,
                })
                .collect(),
        };
        let rows = water_level_rows(&series);
        assert_eq!(rows.iter().map(|r| r.0).collect::<Vec<_>>(), vec![0, 360, 720]);
        assert!(water_level_rows(&PredictedSeries::default()).is_empty());
    }

    #[test]
    fn test_dflow_water_level() {
        let dir = TempDir::new().unwrap();
        let rows = [(0, 0.25), (360, -0.5)];
        let path = write_water_level_bc(dir.path(), "low", &rows, start(), Solver::DFlow).unwrap();

        assert_eq!(path.file_name().unwrap(), "WaterLevel_low.bc");
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("2001-01-01"));
        assert_eq!(content.matches("seconds since 2019-02-01 00:00:00").count(), 2);
        assert_eq!(content.matches("[forcing]").count(), 2);
        assert!(content.contains("WaterLevel_0001"));
        assert!(content.contains("WaterLevel_0002"));
        assert_eq!(content.matches("360 -0.5\n").count(), 2);
    }

    #[test]
    fn test_geoclaw_water_level_replaces() {
        let dir = TempDir::new().unwrap();
        write_water_level_bc(dir.path(), "high", &[(0, 1.0)], start(), Solver::GeoClaw).unwrap();
        let path =
            write_water_level_bc(dir.path(), "high", &[(0, 2.0)], start(), Solver::GeoClaw)
                .unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "0 2\n");
    }

    #[test]
    fn test_discharge_from_cfs() {
        let levels = DischargeLevels::from_cfs(&[100.0, f64::NAN, 300.0, 200.0]).unwrap();
        assert!((levels.low - 100.0 * CFS_TO_CMS).abs() < TOL);
        assert!((levels.reference - 200.0 * CFS_TO_CMS).abs() < TOL);
        assert!((levels.high - 300.0 * CFS_TO_CMS).abs() < TOL);
        assert!(matches!(
            DischargeLevels::from_cfs(&[f64::NAN]),
            Err(BoundaryFileError::NoDischarge)
        ));
    }

    #[test]
    fn test_dflow_discharge() {
        let dir = TempDir::new().unwrap();
        let levels = DischargeLevels::new(10.0, 20.0, 30.5);
        let paths =
            write_discharge_bc(dir.path(), start(), 0, 86400, &levels, Solver::DFlow).unwrap();

        assert_eq!(paths.len(), 3);
        let high = fs::read_to_string(dir.path().join("Discharge_high.bc")).unwrap();
        assert!(high.contains("0    30.5\n86400    30.5\n"));
        assert!(high.contains("seconds since 2019-02-01 00:00:00"));
        assert!(!high.contains("tmin"));
    }

    #[test]
    fn test_geoclaw_discharge_and_read_back() {
        let dir = TempDir::new().unwrap();
        let levels = DischargeLevels::new(10.0, 20.123456, 30.5);
        let paths =
            write_discharge_bc(dir.path(), start(), 0, 86400, &levels, Solver::GeoClaw).unwrap();

        let content = fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(content, "Q_low = 10.00000\nQ_ref = 20.12346\nQ_high = 30.50000\n");

        let back = read_discharge_bc(&paths[0]).unwrap();
        assert!((back.reference - 20.12346).abs() < TOL);
    }

    #[test]
    fn test_stage_tide_data() {
        let data = TempDir::new().unwrap();
        let case = TempDir::new().unwrap();
        fs::write(data.path().join("water_level_low.bc"), "0 0.1\n").unwrap();

        let dest = stage_tide_data(data.path(), ForcingState::Low, case.path()).unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "0 0.1\n");

        assert!(matches!(
            stage_tide_data(data.path(), ForcingState::High, case.path()),
            Err(BoundaryFileError::NotFound { .. })
        ));
        assert!(matches!(
            stage_tide_data(data.path(), ForcingState::Ref, case.path()),
            Err(BoundaryFileError::InvalidValue { .. })
        ));
    }
}
