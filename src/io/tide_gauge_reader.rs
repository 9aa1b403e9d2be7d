//! Tide gauge observation and station list readers.
//!
//! # File Formats
//!
//! ## CO-OPS CSV Export
//!
//! ```text
//! Date Time, Water Level, Sigma, O or I (for verified), F, R, L, Quality
//! 2019-01-01 00:00,0.151,0.003,0,0,0,0,v
//! 2019-01-01 00:06,0.160,0.003,0,0,0,0,v
//! 2019-01-01 00:12,,,,,,,
//! ```
//!
//! Rows with an empty water level are skipped.
//!
//! ## Simple Text Format
//!
//! ```text
//! # station: 8735180
//! # longitude: -88.075
//! # latitude: 30.25
//! # datum: MSL
//! # units: m
//! 2019-01-01T00:00:00Z 0.151
//! 2019-01-01 00:06:00 0.160
//! ```
//!
//! ## Station List
//!
//! ```text
//! ID,Established,Longitude,Latitude
//! 8735180,1966,-88.075,30.25
//! 8737048,"Jan 1, 1980",88° 2.4' W,30° 42.5' N
//! ```
//!
//! Coordinates are decimal degrees or degree/minute strings.
//!
//! All timestamps are read as UTC.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::analysis::{
    CoordinateError, RecordError, TideGaugeStation, TidePoint, TideRecord, parse_dms,
};

/// Error type for tide gauge file operations.
#[derive(Debug, Error)]
pub enum TideGaugeFileError {
    /// Observation file does not exist
    #[error("tide gauge file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// IO error reading file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Parse error in file content
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Samples out of order
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Error type for station list files.
#[derive(Debug, Error)]
pub enum StationFileError {
    /// Station list does not exist
    #[error("station list not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Unreadable coordinate
    #[error("station {station}: {source}")]
    Coordinate {
        station: String,
        #[source]
        source: CoordinateError,
    },
}

/// Parsed tide gauge observation file.
#[derive(Clone, Debug)]
pub struct TideGaugeFile {
    /// Station metadata (if present in file)
    pub station: Option<TideGaugeStation>,
    /// Observations
    pub record: TideRecord,
    /// Original file path
    pub source_file: Option<String>,
    /// Reference datum (if specified)
    pub datum: Option<String>,
    /// Units (if specified)
    pub units: Option<String>,
}

impl TideGaugeFile {
    /// Create from a record without station metadata.
    pub fn from_record(record: TideRecord) -> Self {
        Self {
            station: None,
            record,
            source_file: None,
            datum: None,
            units: None,
        }
    }

    /// Set station metadata; the record takes the station's name and location.
    pub fn with_station(mut self, station: TideGaugeStation) -> Self {
        self.record.name = Some(station.name.clone());
        self.record.location = Some((station.longitude, station.latitude));
        self.station = Some(station);
        self
    }

    /// Set the datum label.
    pub fn with_datum(mut self, datum: impl Into<String>) -> Self {
        self.datum = Some(datum.into());
        self
    }

    /// Set source file path.
    pub fn with_source(mut self, path: impl Into<String>) -> Self {
        self.source_file = Some(path.into());
        self
    }
}

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
];

/// Parse a timestamp as UTC.
///
/// Accepts RFC 3339 (`2019-01-01T00:00:00Z`, offsets converted to UTC),
/// naive `YYYY-MM-DD HH:MM[:SS]` with a space or `T`, `MM/DD/YYYY HH:MM`,
/// and bare dates (midnight).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.and_utc())
}

/// Read a tide gauge observation file (CO-OPS CSV or simple text).
///
/// # Errors
/// - `NotFound` if the file does not exist
/// - `ParseError` for an unreadable timestamp or value
/// - `InvalidFormat` if no sample is found
pub fn read_tide_gauge_file(path: &Path) -> Result<TideGaugeFile, TideGaugeFileError> {
    if !path.exists() {
        return Err(TideGaugeFileError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;

    let first = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .unwrap_or("");
    let is_csv = first.contains(',') && first.chars().any(|c| c.is_alphabetic());

    let mut file = if is_csv {
        parse_coops_csv(&content)?
    } else {
        parse_text(&content)?
    };

    if file.record.is_empty() {
        return Err(TideGaugeFileError::InvalidFormat(
            "No data points found".to_string(),
        ));
    }
    log::debug!(
        "read {} samples from {}",
        file.record.len(),
        path.display()
    );
    file.source_file = Some(path.to_string_lossy().to_string());
    Ok(file)
}

fn parse_coops_csv(content: &str) -> Result<TideGaugeFile, TideGaugeFileError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let headers = rdr.headers()?.clone();
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let time_col = column(&["Date Time", "datetime", "time"]).unwrap_or(0);
    let value_col = column(&["Water Level", "water_level", "Prediction"]).unwrap_or(1);

    let mut data = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let line = i + 2;
        let raw_value = row.get(value_col).unwrap_or("");
        if raw_value.is_empty() {
            continue;
        }
        let raw_time = row.get(time_col).unwrap_or("");
        let time = parse_timestamp(raw_time).ok_or_else(|| TideGaugeFileError::ParseError {
            line,
            message: format!("unreadable timestamp '{}'", raw_time),
        })?;
        let value: f64 = raw_value
            .parse()
            .map_err(|e| TideGaugeFileError::ParseError {
                line,
                message: format!("water level '{}': {}", raw_value, e),
            })?;
        data.push(TidePoint { time, value });
    }

    Ok(TideGaugeFile::from_record(TideRecord::from_points(data)?))
}

fn parse_text(content: &str) -> Result<TideGaugeFile, TideGaugeFileError> {
    let mut metadata: HashMap<String, String> = HashMap::new();
    let mut data = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            if let Some((key, value)) = comment.trim().split_once(':') {
                metadata.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        // `date time value` or `datetime value`
        let (raw_time, raw_value) = match parts.as_slice() {
            [date, clock, value, ..] if clock.contains(':') => {
                (format!("{} {}", date, clock), *value)
            }
            [datetime, value, ..] => (datetime.to_string(), *value),
            _ => {
                return Err(TideGaugeFileError::ParseError {
                    line: line_num,
                    message: format!("expected 'time value', got '{}'", line),
                });
            }
        };

        let time = parse_timestamp(&raw_time).ok_or_else(|| TideGaugeFileError::ParseError {
            line: line_num,
            message: format!("unreadable timestamp '{}'", raw_time),
        })?;
        let value: f64 = raw_value
            .parse()
            .map_err(|e| TideGaugeFileError::ParseError {
                line: line_num,
                message: format!("water level '{}': {}", raw_value, e),
            })?;
        data.push(TidePoint { time, value });
    }

    let mut file = TideGaugeFile::from_record(TideRecord::from_points(data)?);

    if let Some(name) = metadata.get("station") {
        let coord = |keys: [&str; 2]| {
            keys.iter()
                .find_map(|k| metadata.get(*k))
                .and_then(|s| s.parse::<f64>().ok())
        };
        let lon = coord(["longitude", "lon"]);
        let lat = coord(["latitude", "lat"]);

        let mut station =
            TideGaugeStation::new(name.clone(), lon.unwrap_or(0.0), lat.unwrap_or(0.0));
        if let Some(est) = metadata.get("established") {
            station = station.with_established(est.clone());
        }
        file.record.name = Some(name.clone());
        if let (Some(lon), Some(lat)) = (lon, lat) {
            file.record.location = Some((lon, lat));
        }
        file.station = Some(station);
    }
    file.datum = metadata.get("datum").cloned();
    file.units = metadata.get("units").cloned();

    Ok(file)
}

/// Write observations in the simple text format with metadata headers.
pub fn write_tide_gauge_file(
    path: &Path,
    data: &TideGaugeFile,
) -> Result<(), TideGaugeFileError> {
    let mut file = File::create(path)?;

    writeln!(file, "# Tide gauge observations")?;
    if let Some(ref station) = data.station {
        writeln!(file, "# station: {}", station.name)?;
        writeln!(file, "# longitude: {:.4}", station.longitude)?;
        writeln!(file, "# latitude: {:.4}", station.latitude)?;
        if let Some(ref est) = station.established {
            writeln!(file, "# established: {}", est)?;
        }
    }
    if let Some(ref datum) = data.datum {
        writeln!(file, "# datum: {}", datum)?;
    }
    if let Some(ref units) = data.units {
        writeln!(file, "# units: {}", units)?;
    }

    for point in data.record.finite() {
        writeln!(
            file,
            "{} {:.6}",
            point.time.format("%Y-%m-%dT%H:%M:%SZ"),
            point.value
        )?;
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct StationRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Established", default)]
    established: Option<String>,
    #[serde(rename = "Longitude")]
    longitude: String,
    #[serde(rename = "Latitude")]
    latitude: String,
}

fn coordinate(text: &str) -> Result<f64, CoordinateError> {
    match text.trim().parse::<f64>() {
        Ok(v) => Ok(v),
        Err(_) => parse_dms(text),
    }
}

/// Read a station list (`ID, Established, Longitude, Latitude`).
pub fn read_station_list(path: &Path) -> Result<Vec<TideGaugeStation>, StationFileError> {
    if !path.exists() {
        return Err(StationFileError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut stations = Vec::new();
    for row in rdr.deserialize() {
        let row: StationRow = row?;
        let wrap = |source| StationFileError::Coordinate {
            station: row.id.clone(),
            source,
        };
        let longitude = coordinate(&row.longitude).map_err(wrap)?;
        let latitude = coordinate(&row.latitude).map_err(wrap)?;

        let mut station = TideGaugeStation::new(row.id.clone(), longitude, latitude);
        if let Some(est) = row.established.filter(|e| !e.is_empty()) {
            station = station.with_established(est);
        }
        stations.push(station);
    }

    Ok(stations)
}
