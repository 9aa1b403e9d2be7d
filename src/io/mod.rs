//! I/O utilities for reading and writing data files.
//!
//! This module provides:
//! - **Case configuration**: `key = value` files describing a bay and its runs
//! - **Tide gauge observations**: CO-OPS CSV exports and annotated text files
//! - **Station lists**: NOAA station tables for nearest-gauge lookup
//! - **Constituent tables**: fitted amplitudes and phases as CSV
//! - **Boundary conditions**: D-Flow FM `.bc` and GeoClaw forcing files
//! - **Topography**: GeoClaw topotype 1/2/3 files
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use estuary_rs::analysis::HarmonicAnalysis;
//! use estuary_rs::io::{read_tide_gauge_file, write_constituent_file};
//!
//! let gauge = read_tide_gauge_file(Path::new("8735180.csv"))?;
//! let outcome = HarmonicAnalysis::new().analyze(&gauge.record)?;
//! write_constituent_file(Path::new("constituents.csv"), &outcome.constituents)?;
//! ```

mod boundary;
mod config_file;
mod constituent_reader;
mod tide_gauge_reader;
mod topo_writer;

pub use boundary::{
    BoundaryFileError, CFS_TO_CMS, DFlowTemplates, DischargeLevels, ForcingState, Solver,
    TIME_UNIT_PLACEHOLDER, read_discharge_bc, stage_tide_data, water_level_rows,
    write_discharge_bc, write_discharge_bc_with, write_discharge_data, write_water_level_bc,
    write_water_level_bc_with,
};
pub use config_file::{
    ConfigError, ConfigFile, ConfigValue, Section, parse_config, read_config_file,
};
pub use constituent_reader::{
    ConstituentFileError, parse_constituents, read_constituent_file, write_constituent_file,
};
pub use tide_gauge_reader::{
    StationFileError, TideGaugeFile, TideGaugeFileError, parse_timestamp, read_station_list,
    read_tide_gauge_file, write_tide_gauge_file,
};
pub use topo_writer::{
    NODATA_VALUE, TopoFileError, TopoType, WriteStatus, write_topography, write_topography_with,
};
