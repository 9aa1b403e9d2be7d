//! Batch execution of independent per-item jobs.
//!
//! A batch maps items (frames, grid cells) to outputs. Each item is
//! independent, so the batch fans out across a rayon pool when the
//! `parallel` feature is enabled. An item whose output file already exists
//! is skipped, which makes re-running an interrupted batch cheap. After
//! the fan-out, a single [`Finalizer`] (e.g. [`VideoEncoder`], or
//! `(VideoEncoder, FrameCleanup)` to delete frames afterwards) may run
//! synchronously over the collected outputs.
//!
//! ```text
//!   items ──► TaskBatch::run ──► frame_000.png … frame_N.png ──► Finalizer
//!              (skip existing)                                    (ffmpeg)
//! ```

mod decompose;
mod encoder;
mod tasks;

pub use decompose::{CellFit, decompose_cells};
pub use encoder::{Finalizer, FrameCleanup, GifEncoder, VideoEncoder};
pub use tasks::{BatchReport, FramePattern, TaskBatch};

use std::path::PathBuf;

use thiserror::Error;

use crate::analysis::HarmonicError;

/// Error type for batch execution.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// IO error (directory creation, spawning a process)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// An item's job failed
    #[error("task for {} failed: {message}", .output.display())]
    Task { output: PathBuf, message: String },

    /// A job reported success without creating its output
    #[error("task reported success but {} was not created", .path.display())]
    MissingOutput { path: PathBuf },

    /// External finalization command failed
    #[error("{program} exited with {status}")]
    Finalizer { program: String, status: String },

    /// Per-cell analysis failed
    #[error(transparent)]
    Harmonic(#[from] HarmonicError),
}

impl WorkflowError {
    /// Wrap any displayable error as a task failure for `output`.
    pub fn task(output: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        WorkflowError::Task {
            output: output.into(),
            message: err.to_string(),
        }
    }
}
