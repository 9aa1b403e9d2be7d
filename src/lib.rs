//! # estuary-rs
//!
//! Building blocks for idealized-estuary hydrodynamic studies.
//!
//! This crate provides:
//! - Parametric bay geometry (ocean, bay, river reaches as planar patches)
//! - Topography rasterization and GeoClaw topotype output
//! - Harmonic tidal analysis (astronomical arguments, nodal corrections,
//!   Rayleigh-limited constituent selection, least-squares fitting)
//! - Tidal prediction from fitted constituents
//! - Forcing-month selection from monthly tidal ranges
//! - D-Flow FM and GeoClaw boundary-condition files
//! - Memoized parallel task batches for per-frame and per-cell work

pub mod analysis;
pub mod geometry;
pub mod io;
pub mod workflow;

// Re-export main types for convenience
pub use analysis::{
    AnalysisOutcome, ConstituentSet, ExtremumSelector, ForcingMonths, HarmonicAnalysis,
    HarmonicError, PredictedSeries, TideRecord,
};
pub use geometry::{BayGeometry, BayShape, GeometryError, ShapeKind, Topography, TopographyGrid};
pub use io::{ConfigFile, Solver, TopoType, WriteStatus};
pub use workflow::{TaskBatch, WorkflowError};
