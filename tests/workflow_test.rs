//! Integration tests for batch post-processing.

use chrono::{Duration, TimeZone, Utc};
use estuary_rs::io::write_topography_with;
use estuary_rs::workflow::{FramePattern, decompose_cells};
use estuary_rs::{
    BayShape, ConstituentSet, HarmonicAnalysis, ShapeKind, TaskBatch, TopoType, TopographyGrid,
    WorkflowError,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_topography_sweep_is_resumable() {
    // One topography file per bay length ratio
    let dir = TempDir::new().unwrap();
    let ratios = [1.0, 1.5, 2.0, 2.5];
    let batch =
        TaskBatch::new(dir.path().join("topo")).with_pattern(FramePattern::new("bay_", 2, "tt3"));

    let job = |r_lb: &f64, path: &Path| -> Result<(), WorkflowError> {
        let geometry = BayShape::new(ShapeKind::Triangle, 20e3, 4.0, *r_lb, 1.0, -8.0)
            .geometry()
            .map_err(|e| WorkflowError::task(path, e))?;
        let grid =
            TopographyGrid::covering(&geometry, 5e3).map_err(|e| WorkflowError::task(path, e))?;
        write_topography_with(path, &geometry, &grid, TopoType::Three)
            .map_err(|e| WorkflowError::task(path, e))?;
        Ok(())
    };

    let first = batch.run(&ratios, job).unwrap();
    assert_eq!(first.produced.len(), 4);
    assert!(batch.output_path(3).ends_with("bay_03.tt3"));

    // Longer bays give taller grids
    let rows = |i: usize| -> usize {
        let content = fs::read_to_string(batch.output_path(i)).unwrap();
        content.lines().nth(1).unwrap().split_whitespace().next().unwrap().parse().unwrap()
    };
    assert!(rows(3) > rows(0));

    fs::remove_file(batch.output_path(1)).unwrap();
    let second = batch.run(&ratios, job).unwrap();
    assert_eq!(second.produced, vec![batch.output_path(1)]);
    assert_eq!(second.skipped.len(), 3);
}

#[test]
fn test_cell_decomposition_maps_amplitude_along_estuary() {
    // Amplification and lag increase toward the head of the bay
    let t0 = Utc.with_ymd_and_hms(2019, 7, 1, 0, 0, 0).unwrap();
    let times: Vec<_> = (0..3 * 24 * 20).map(|k| t0 + Duration::minutes(20 * k)).collect();

    let cells: Vec<Vec<f64>> = (0..6)
        .map(|k| {
            let amplitude = 0.5 + 0.1 * k as f64;
            let lag = 30.0 + 15.0 * k as f64;
            let m4 = 0.02 * k as f64;
            ConstituentSet::from_named(0.0, &[("M2", amplitude, lag), ("M4", m4, 2.0 * lag)])
                .unwrap()
                .predict(&times)
                .values()
        })
        .collect();

    let analysis = HarmonicAnalysis::with_constituents(&["M2", "M4"]).unwrap();
    let fits = decompose_cells(&times, &cells, &analysis, &["M2", "M4"]).unwrap();

    assert_eq!(fits.len(), cells.len());
    for pair in fits.windows(2) {
        assert!(pair[1].amplitude[0] > pair[0].amplitude[0]);
        assert!(pair[1].phase[0] > pair[0].phase[0]);
    }
    assert!((fits[5].amplitude[0] - 1.0).abs() < 1e-6);
    assert!((fits[5].amplitude[1] - 0.1).abs() < 1e-6);
    assert!(fits[0].amplitude[1] < 1e-6);
}
