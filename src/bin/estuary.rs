//! estuary - idealized-estuary case preparation tool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};

use estuary_rs::analysis::{
    ExtremumSelector, HarmonicAnalysis, MonthSelection, nearest_station,
};
use estuary_rs::geometry::{BayShape, RatioRange, TopographyGrid, read_survey};
use estuary_rs::io::{
    DischargeLevels, ForcingState, Solver, TideGaugeFile, TopoType, WriteStatus,
    parse_timestamp, read_config_file, read_constituent_file, read_station_list,
    read_tide_gauge_file, stage_tide_data, water_level_rows, write_constituent_file,
    write_discharge_bc, write_discharge_data, write_tide_gauge_file, write_topography_with,
    write_water_level_bc,
};

#[derive(Parser)]
#[command(
    name = "estuary",
    version,
    about = "Idealized estuary geometry, tides and boundary conditions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rasterize a bay described in a config file into a GeoClaw topography file
    Topo {
        /// Bay configuration file
        config: PathBuf,
        /// Output topography file (left untouched if it exists)
        output: PathBuf,
        /// GeoClaw topotype (1, 2 or 3)
        #[arg(long, default_value = "2")]
        topo_type: String,
        /// Config section holding the bay keys (root section if omitted)
        #[arg(long)]
        section: Option<String>,
        /// Grid spacing in meters (defaults to the config's cell_size)
        #[arg(long)]
        cell_size: Option<f64>,
    },

    /// Fit tidal constituents to a tide gauge record
    Analyze {
        /// Tide gauge file (CO-OPS CSV or text)
        gauge: PathBuf,
        /// Output constituent table (CSV)
        output: PathBuf,
        /// Rayleigh constant for constituent selection
        #[arg(long, default_value_t = 1.0)]
        rayleigh: f64,
        /// Restrict the fit to these constituents (comma separated)
        #[arg(long, value_delimiter = ',')]
        constituents: Vec<String>,
    },

    /// Predict water levels from a constituent table
    Predict {
        /// Constituent table (CSV)
        constituents: PathBuf,
        /// First prediction time (UTC)
        #[arg(long, value_parser = parse_time)]
        start: DateTime<Utc>,
        /// Last prediction time (UTC)
        #[arg(long, value_parser = parse_time)]
        end: DateTime<Utc>,
        /// Prediction step in minutes
        #[arg(long, default_value_t = 6)]
        step_minutes: i64,
        /// Output file (text tide gauge format)
        output: PathBuf,
    },

    /// Select low/high forcing months and write boundary-condition files
    Bc {
        /// Tide gauge file used for fitting and month ranking
        gauge: PathBuf,
        /// Output directory (dflow/ and geoclaw/ are created inside)
        out_dir: PathBuf,
        /// Rolling window length in samples
        #[arg(long, default_value_t = 30)]
        window: usize,
        /// Policy for the high month (second-lowest or widest)
        #[arg(long, default_value = "second-lowest")]
        high: String,
        /// Prediction step in minutes
        #[arg(long, default_value_t = 6)]
        step_minutes: i64,
        /// Discharge record in ft³/s (same formats as gauge files)
        #[arg(long)]
        discharge: Option<PathBuf>,
    },

    /// Stage GeoClaw tide.data and discharge.data for one forcing state
    Stage {
        /// Directory holding water_level_<state>.bc and discharge.bc
        data_dir: PathBuf,
        /// Forcing state (low, ref or high)
        state: String,
        /// Bay configuration file
        config: PathBuf,
        /// Case directory receiving the staged files
        dest: PathBuf,
        /// Config section holding the bay keys
        #[arg(long)]
        section: Option<String>,
    },

    /// Find the station closest to a point
    NearestStation {
        /// Station list CSV (ID, Established, Longitude, Latitude)
        stations: PathBuf,
        /// Longitude (degrees East)
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        /// Latitude (degrees North)
        #[arg(allow_hyphen_values = true)]
        lat: f64,
    },

    /// Summarize shape ratios of surveyed bays
    Survey {
        /// Survey CSV (Shape, Lon, Lat, Wb, Wr, Lb, Wt)
        measurements: PathBuf,
    },
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(s).ok_or_else(|| format!("unreadable timestamp '{}'", s))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run(cli.command)
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Topo {
            config,
            output,
            topo_type,
            section,
            cell_size,
        } => run_topo(&config, &output, &topo_type, section.as_deref(), cell_size),
        Command::Analyze {
            gauge,
            output,
            rayleigh,
            constituents,
        } => run_analyze(&gauge, &output, rayleigh, &constituents),
        Command::Predict {
            constituents,
            start,
            end,
            step_minutes,
            output,
        } => run_predict(&constituents, start, end, step_minutes, &output),
        Command::Bc {
            gauge,
            out_dir,
            window,
            high,
            step_minutes,
            discharge,
        } => run_bc(&gauge, &out_dir, window, &high, step_minutes, discharge.as_deref()),
        Command::Stage {
            data_dir,
            state,
            config,
            dest,
            section,
        } => run_stage(&data_dir, &state, &config, &dest, section.as_deref()),
        Command::NearestStation { stations, lon, lat } => run_nearest(&stations, lon, lat),
        Command::Survey { measurements } => run_survey(&measurements),
    }
}

fn load_shape(config: &Path, section: Option<&str>) -> Result<BayShape> {
    let cfg = read_config_file(config)?;
    BayShape::from_config(&cfg, section)
        .with_context(|| format!("reading bay description from {}", config.display()))
}

fn run_topo(
    config: &Path,
    output: &Path,
    topo_type: &str,
    section: Option<&str>,
    cell_size: Option<f64>,
) -> Result<()> {
    let kind: TopoType = topo_type.parse()?;
    let shape = load_shape(config, section)?;
    let geometry = shape.geometry()?;
    let grid = TopographyGrid::covering(&geometry, cell_size.unwrap_or(shape.cell_size))?;

    match write_topography_with(output, &geometry, &grid, kind)? {
        WriteStatus::Written(path) => {
            println!("wrote {} ({}x{} nodes)", path.display(), grid.nx, grid.ny)
        }
        WriteStatus::Skipped(path) => println!("{} already exists", path.display()),
    }
    Ok(())
}

fn build_analysis(rayleigh: f64, constituents: &[String]) -> Result<HarmonicAnalysis> {
    let analysis = if constituents.is_empty() {
        HarmonicAnalysis::new()
    } else {
        let names: Vec<&str> = constituents.iter().map(|s| s.trim()).collect();
        HarmonicAnalysis::with_constituents(&names)?
    };
    Ok(analysis.with_rayleigh(rayleigh)?)
}

fn run_analyze(gauge: &Path, output: &Path, rayleigh: f64, constituents: &[String]) -> Result<()> {
    let data = read_tide_gauge_file(gauge)?;
    let analysis = build_analysis(rayleigh, constituents)?;
    let outcome = analysis
        .analyze(&data.record)
        .with_context(|| format!("analyzing {}", gauge.display()))?;

    for dropped in &outcome.dropped {
        log::debug!("dropped {}: {}", dropped.name, dropped.reason);
    }
    write_constituent_file(output, &outcome.constituents)?;

    println!(
        "fitted {} constituents over {:.1} h ({} samples), dropped {}, R² = {:.4}",
        outcome.constituents.len(),
        outcome.window_hours,
        outcome.n_samples,
        outcome.dropped.len(),
        outcome.r_squared
    );
    Ok(())
}

fn run_predict(
    constituents: &Path,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step_minutes: i64,
    output: &Path,
) -> Result<()> {
    if step_minutes <= 0 {
        bail!("step must be positive, got {} minutes", step_minutes);
    }
    if end < start {
        bail!("end {} is before start {}", end, start);
    }
    let set = read_constituent_file(constituents)?;
    let series = set.predict_range(start, end, Duration::minutes(step_minutes));

    write_tide_gauge_file(output, &TideGaugeFile::from_record(series.into_record()))?;
    println!("wrote prediction to {}", output.display());
    Ok(())
}

fn run_bc(
    gauge: &Path,
    out_dir: &Path,
    window: usize,
    high: &str,
    step_minutes: i64,
    discharge: Option<&Path>,
) -> Result<()> {
    if step_minutes <= 0 {
        bail!("step must be positive, got {} minutes", step_minutes);
    }
    let high: MonthSelection = high.parse()?;
    let data = read_tide_gauge_file(gauge)?;

    let months = ExtremumSelector::default()
        .with_window(window)
        .with_high(high)
        .select(&data.record)?;
    let outcome = HarmonicAnalysis::new().analyze(&data.record)?;
    let step = Duration::minutes(step_minutes);

    for (key, ranked) in [("low", months.low), ("high", months.high)] {
        let month = ranked.month;
        let (start, next) = month
            .span()
            .ok_or_else(|| anyhow!("month {} out of range", month))?;
        let series = outcome.constituents.predict_range(start, next - step, step);
        let rows = water_level_rows(&series);

        for solver in [Solver::DFlow, Solver::GeoClaw] {
            write_water_level_bc(&out_dir.join(solver.to_string()), key, &rows, start, solver)?;
        }
        println!("{} month: {} (range {:.3} m)", key, month, ranked.range());
    }

    if let Some(path) = discharge {
        let flow = read_tide_gauge_file(path)?;
        let levels = DischargeLevels::from_cfs(&flow.record.values())?;
        let start = flow
            .record
            .start()
            .ok_or_else(|| anyhow!("discharge record {} is empty", path.display()))?;
        let end_sec = flow.record.duration().num_seconds();

        for solver in [Solver::DFlow, Solver::GeoClaw] {
            let dir = out_dir.join(solver.to_string());
            write_discharge_bc(&dir, start, 0, end_sec, &levels, solver)?;
        }
        println!(
            "discharge low/ref/high: {:.3} / {:.3} / {:.3} m³/s",
            levels.low, levels.reference, levels.high
        );
    }
    Ok(())
}

fn run_stage(
    data_dir: &Path,
    state: &str,
    config: &Path,
    dest: &Path,
    section: Option<&str>,
) -> Result<()> {
    let state: ForcingState = state.parse()?;
    let geometry = load_shape(config, section)?.geometry()?;

    if state != ForcingState::Ref {
        let tide = stage_tide_data(data_dir, state, dest)?;
        println!("staged {}", tide.display());
    }
    let discharge = write_discharge_data(&data_dir.join("discharge.bc"), state, &geometry, dest)?;
    println!("wrote {}", discharge.display());
    Ok(())
}

fn run_nearest(stations: &Path, lon: f64, lat: f64) -> Result<()> {
    let list = read_station_list(stations)?;
    let station = nearest_station(&list, lon, lat)
        .ok_or_else(|| anyhow!("{} lists no stations", stations.display()))?;
    println!(
        "{} ({:.4}, {:.4}) at {:.4} deg",
        station.name,
        station.longitude,
        station.latitude,
        station.distance_to(lon, lat)
    );
    Ok(())
}

fn run_survey(measurements: &Path) -> Result<()> {
    let data = read_survey(measurements)?;
    let ranges = RatioRange::by_shape(&data);

    println!("{:<10} {:>3} {:>17} {:>17} {:>17}", "shape", "n", "R_br", "R_lb", "R_bt");
    for (shape, range) in &ranges {
        let bt = match (range.min.r_bt, range.max.r_bt) {
            (Some(lo), Some(hi)) => format!("{:7.2} - {:7.2}", lo, hi),
            _ => "-".to_string(),
        };
        println!(
            "{:<10} {:>3} {:7.2} - {:7.2} {:7.2} - {:7.2} {:>17}",
            shape.to_string(),
            range.count,
            range.min.r_br,
            range.max.r_br,
            range.min.r_lb,
            range.max.r_lb,
            bt
        );
    }
    Ok(())
}
