//! Integration tests for the observation-to-forcing pipeline: gauge file,
//! harmonic fit, constituent table, predicted boundary files, and the
//! files a GeoClaw run reads.

use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use estuary_rs::io::{
    DischargeLevels, ForcingState, TIME_UNIT_PLACEHOLDER, read_constituent_file,
    read_discharge_bc, read_tide_gauge_file, stage_tide_data, water_level_rows,
    write_constituent_file, write_discharge_bc, write_discharge_data, write_water_level_bc,
};
use estuary_rs::{BayShape, ConstituentSet, HarmonicAnalysis, ShapeKind, Solver};
use std::fmt::Write as _;
use std::fs;
use tempfile::TempDir;

fn truth() -> ConstituentSet {
    ConstituentSet::from_named(0.2, &[("M2", 0.6, 80.0), ("K1", 0.3, 300.0)]).unwrap()
}

/// Six-minute CO-OPS export covering January 2019.
fn coops_export() -> String {
    let t0 = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
    let times: Vec<DateTime<Utc>> =
        (0..10 * 24 * 31).map(|k| t0 + Duration::minutes(6 * k)).collect();
    let series = truth().predict(&times);

    let mut csv =
        String::from("Date Time, Water Level, Sigma, O or I (for verified), F, R, L, Quality\n");
    for p in &series.data {
        writeln!(
            csv,
            "{},{:.6},0.003,0,0,0,0,v",
            p.time.format("%Y-%m-%d %H:%M"),
            p.value
        )
        .unwrap();
    }
    csv
}

#[test]
fn test_gauge_to_constituent_table() {
    let dir = TempDir::new().unwrap();
    let gauge_path = dir.path().join("8735180.csv");
    fs::write(&gauge_path, coops_export()).unwrap();

    let gauge = read_tide_gauge_file(&gauge_path).unwrap();
    assert_eq!(gauge.record.len(), 10 * 24 * 31);

    let outcome = HarmonicAnalysis::standard().analyze(&gauge.record).unwrap();
    assert_eq!(outcome.constituents.names(), vec!["M2", "S2", "K1", "O1"]);
    let m2 = outcome.constituents.get("M2").unwrap();
    assert_relative_eq!(m2.amplitude, 0.6, epsilon = 1e-4);
    assert!(outcome.constituents.get("S2").unwrap().amplitude < 1e-4);

    let table = dir.path().join("constituents.csv");
    write_constituent_file(&table, &outcome.constituents).unwrap();
    let loaded = read_constituent_file(&table).unwrap();

    assert_eq!(loaded.names(), outcome.constituents.names());
    assert_relative_eq!(loaded.z0, outcome.constituents.z0, epsilon = 1e-9);
    let k1 = loaded.get("K1").unwrap();
    assert_relative_eq!(k1.amplitude, 0.3, epsilon = 1e-4);
    assert_relative_eq!(k1.phase_degrees, 300.0, epsilon = 1e-2);
}

#[test]
fn test_geoclaw_forcing_files() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let start = Utc.with_ymd_and_hms(2019, 2, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2019, 3, 1, 0, 0, 0).unwrap() - Duration::minutes(6);

    let prediction = truth().predict_range(start, end, Duration::minutes(6));
    let rows = water_level_rows(&prediction);
    assert_eq!(rows.len(), 10 * 24 * 28);
    assert_eq!(rows[1].0, 360);

    for key in ["low", "high"] {
        let path = write_water_level_bc(&data_dir, key, &rows, start, Solver::GeoClaw).unwrap();
        assert_eq!(path, data_dir.join(format!("water_level_{}.bc", key)));
    }

    let levels = DischargeLevels::from_cfs(&[1000.0, 2000.0, f64::NAN, 6000.0]).unwrap();
    let end_seconds = rows.last().unwrap().0;
    let written =
        write_discharge_bc(&data_dir, start, 0, end_seconds, &levels, Solver::GeoClaw).unwrap();
    assert_eq!(written, vec![data_dir.join("discharge.bc")]);

    let read_back = read_discharge_bc(&written[0]).unwrap();
    assert_relative_eq!(read_back.high, 6000.0 * 0.028316846592, epsilon = 1e-5);

    // Stage one run directory
    let run_dir = dir.path().join("run_high");
    let tide = stage_tide_data(&data_dir, ForcingState::High, &run_dir).unwrap();
    let staged = fs::read_to_string(&tide).unwrap();
    assert_eq!(
        staged,
        fs::read_to_string(data_dir.join("water_level_high.bc")).unwrap()
    );
    assert!(staged.starts_with("0 "));

    let geometry = BayShape::new(ShapeKind::Triangle, 20e3, 4.0, 2.0, 1.0, -5.0)
        .geometry()
        .unwrap();
    let discharge =
        write_discharge_data(&written[0], ForcingState::High, &geometry, &run_dir).unwrap();
    let fields: Vec<f64> = fs::read_to_string(&discharge)
        .unwrap()
        .split_whitespace()
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(fields.len(), 3);
    assert_relative_eq!(fields[0], read_back.high / 5e3, max_relative = 1e-12);
    assert_relative_eq!(fields[1], geometry.x_r1);
    assert_relative_eq!(fields[2], geometry.x_r2);

    assert!(stage_tide_data(&data_dir, ForcingState::Ref, &run_dir).is_err());
}

#[test]
fn test_dflow_forcing_files() {
    let dir = TempDir::new().unwrap();
    let start = Utc.with_ymd_and_hms(2018, 7, 1, 0, 0, 0).unwrap();
    let prediction = truth().predict_range(start, start + Duration::hours(3), Duration::hours(1));
    let rows = water_level_rows(&prediction);

    let path = write_water_level_bc(dir.path(), "low", &rows, start, Solver::DFlow).unwrap();
    assert_eq!(path.file_name().unwrap(), "WaterLevel_low.bc");

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches("[forcing]").count(), 2);
    assert!(content.contains("WaterLevel_0001"));
    assert!(content.contains("WaterLevel_0002"));
    assert!(content.contains("seconds since 2018-07-01 00:00:00"));
    assert!(!content.contains(TIME_UNIT_PLACEHOLDER));
    assert_eq!(content.lines().filter(|l| l.starts_with("10800 ")).count(), 2);

    let levels = DischargeLevels::new(50.0, 150.0, 900.0);
    let paths = write_discharge_bc(dir.path(), start, 0, 10800, &levels, Solver::DFlow).unwrap();
    assert_eq!(paths.len(), 3);

    let high = fs::read_to_string(dir.path().join("Discharge_high.bc")).unwrap();
    assert!(high.contains("dischargebnd"));
    assert!(high.contains("0    900"));
    assert!(high.contains("10800    900"));
    assert!(!high.contains("tmin"));
}
