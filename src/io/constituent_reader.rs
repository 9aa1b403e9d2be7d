//! Reader and writer for fitted constituent tables.
//!
//! # File Format
//!
//! ```text
//! Constituent,Phase,Amplitude
//! Z0,0.0,0.12
//! M2,125.3,0.45
//! K1,45.2,0.08
//! O1,67.8,0.06
//! ```
//!
//! Phases are Greenwich phase lags in degrees, amplitudes in meters. The
//! `Z0` row carries the mean level in its amplitude column; without it the
//! mean is zero. Names are matched case-insensitively against the catalog.
//! Lines starting with `#` are comments.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{ConstituentSet, FittedConstituent, lookup};

/// Error type for constituent file parsing.
#[derive(Debug, Error)]
pub enum ConstituentFileError {
    /// Constituent file does not exist
    #[error("constituent file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Unknown constituent name
    #[error("Unknown constituent: {0}")]
    UnknownConstituent(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct ConstituentRow {
    #[serde(rename = "Constituent")]
    name: String,
    #[serde(rename = "Phase")]
    phase: f64,
    #[serde(rename = "Amplitude")]
    amplitude: f64,
}

const MEAN_LEVEL: &str = "Z0";

fn collect_rows<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
) -> Result<ConstituentSet, ConstituentFileError> {
    let mut set = ConstituentSet::default();
    for row in rdr.deserialize() {
        let row: ConstituentRow = row?;
        if row.name.eq_ignore_ascii_case(MEAN_LEVEL) {
            set.z0 = row.amplitude;
            continue;
        }
        let def = lookup(&row.name)
            .ok_or_else(|| ConstituentFileError::UnknownConstituent(row.name.clone()))?;
        set.constituents
            .push(FittedConstituent::new(def, row.amplitude, row.phase));
    }
    Ok(set)
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'));
    builder
}

/// Read a constituent table.
///
/// # Errors
/// - `NotFound` if the file does not exist
/// - `UnknownConstituent` for a name outside the catalog
pub fn read_constituent_file(path: &Path) -> Result<ConstituentSet, ConstituentFileError> {
    if !path.exists() {
        return Err(ConstituentFileError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let mut rdr = reader_builder().from_path(path)?;
    let set = collect_rows(&mut rdr)?;
    log::debug!(
        "read {} constituents (Z0 = {}) from {}",
        set.len(),
        set.z0,
        path.display()
    );
    Ok(set)
}

/// Parse a constituent table from a string.
pub fn parse_constituents(content: &str) -> Result<ConstituentSet, ConstituentFileError> {
    let mut rdr = reader_builder().from_reader(content.as_bytes());
    collect_rows(&mut rdr)
}

/// Write a constituent table, Z0 first.
pub fn write_constituent_file(
    path: &Path,
    set: &ConstituentSet,
) -> Result<(), ConstituentFileError> {
    let mut wtr = csv::Writer::from_writer(File::create(path)?);

    wtr.serialize(ConstituentRow {
        name: MEAN_LEVEL.to_string(),
        phase: 0.0,
        amplitude: set.z0,
    })?;
    for c in &set.constituents {
        wtr.serialize(ConstituentRow {
            name: c.name().to_string(),
            phase: c.phase_degrees,
            amplitude: c.amplitude,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const TOL: f64 = 1e-10;

    #[test]
    fn test_parse_table() {
        let content = "Constituent,Phase,Amplitude\n\
                       # Dauphin Island\n\
                       Z0,0.0,0.12\n\
                       m2,125.3,0.45\n\
                       K1, 45.2, 0.08\n";
        let set = parse_constituents(content).unwrap();

        assert!((set.z0 - 0.12).abs() < TOL);
        assert_eq!(set.names(), vec!["M2", "K1"]);
        let k1 = set.get("K1").unwrap();
        assert!((k1.phase_degrees - 45.2).abs() < TOL);
        assert!((k1.amplitude - 0.08).abs() < TOL);
    }

    #[test]
    fn test_missing_mean_defaults_to_zero() {
        let set = parse_constituents("Constituent,Phase,Amplitude\nS2,10,0.2\n").unwrap();
        assert_eq!(set.z0, 0.0);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_unknown_constituent() {
        let result = parse_constituents("Constituent,Phase,Amplitude\nXYZ9,10,0.2\n");
        match result {
            Err(ConstituentFileError::UnknownConstituent(name)) => assert_eq!(name, "XYZ9"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_write_and_read() {
        let set = ConstituentSet::from_named(
            -0.05,
            &[("M2", 0.45, 125.3), ("O1", 0.06, 67.8), ("M4", 0.01, 300.0)],
        )
        .unwrap();

        let file = NamedTempFile::new().unwrap();
        write_constituent_file(file.path(), &set).unwrap();
        let back = read_constituent_file(file.path()).unwrap();

        assert!((back.z0 + 0.05).abs() < TOL);
        assert_eq!(back.names(), set.names());
        for (a, b) in set.constituents.iter().zip(back.constituents.iter()) {
            assert!((a.amplitude - b.amplitude).abs() < TOL);
            assert!((a.phase_degrees - b.phase_degrees).abs() < TOL);
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_constituent_file(Path::new("/nonexistent/constituents.csv")),
            Err(ConstituentFileError::NotFound { .. })
        ));
    }
}
