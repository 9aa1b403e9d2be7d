//! Per-cell tidal decomposition of gridded model output.
//!
//! Every cell's water-level series is analyzed independently, so cells are
//! fitted in parallel. Constituents a cell cannot resolve are reported as
//! NaN amplitude and phase.

use chrono::{DateTime, Utc};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::WorkflowError;
use crate::analysis::{HarmonicAnalysis, HarmonicError, TideRecord, lookup};

/// Amplitude (m) and phase (degrees) of the requested constituents at one
/// cell, in request order.
#[derive(Clone, Debug, PartialEq)]
pub struct CellFit {
    pub amplitude: Vec<f64>,
    pub phase: Vec<f64>,
}

/// Fit each cell's series and extract the named constituents.
///
/// `cells[k]` holds the water levels of cell k at `times`.
///
/// # Errors
/// - `UnknownConstituent` for a name outside the catalog
/// - record errors if a series length differs from `times`
pub fn decompose_cells(
    times: &[DateTime<Utc>],
    cells: &[Vec<f64>],
    analysis: &HarmonicAnalysis,
    names: &[&str],
) -> Result<Vec<CellFit>, WorkflowError> {
    for name in names {
        if lookup(name).is_none() {
            return Err(HarmonicError::UnknownConstituent(name.to_string()).into());
        }
    }

    log::info!(
        "decomposing {} cells into {}",
        cells.len(),
        names.join(", ")
    );

    let fit = |values: &Vec<f64>| -> Result<CellFit, WorkflowError> {
        let record = TideRecord::new(times, values).map_err(HarmonicError::from)?;
        let outcome = analysis.analyze(&record)?;

        let mut cell = CellFit {
            amplitude: Vec::with_capacity(names.len()),
            phase: Vec::with_capacity(names.len()),
        };
        for name in names {
            match outcome.constituents.get(name) {
                Some(c) => {
                    cell.amplitude.push(c.amplitude);
                    cell.phase.push(c.phase_degrees);
                }
                None => {
                    cell.amplitude.push(f64::NAN);
                    cell.phase.push(f64::NAN);
                }
            }
        }
        Ok(cell)
    };

    #[cfg(feature = "parallel")]
    let fits = cells.par_iter().map(fit).collect();

    #[cfg(not(feature = "parallel"))]
    let fits = cells.iter().map(fit).collect();

    fits
}
