//! Memoized parallel task batch.

use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::WorkflowError;

/// Numbered output file names, `frame_000.png`, `frame_001.png`, ….
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePattern {
    pub prefix: String,
    pub digits: usize,
    pub extension: String,
}

impl Default for FramePattern {
    fn default() -> Self {
        Self {
            prefix: "frame_".to_string(),
            digits: 3,
            extension: "png".to_string(),
        }
    }
}

impl FramePattern {
    pub fn new(prefix: impl Into<String>, digits: usize, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            digits,
            extension: extension.into(),
        }
    }

    /// File name of item `index`.
    pub fn file_name(&self, index: usize) -> String {
        format!(
            "{}{:0width$}.{}",
            self.prefix,
            index,
            self.extension,
            width = self.digits
        )
    }

    /// printf-style pattern (`frame_%03d.png`) for external tools.
    pub fn printf_pattern(&self) -> String {
        format!("{}%0{}d.{}", self.prefix, self.digits, self.extension)
    }
}

/// Outputs of one batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Outputs created in this run
    pub produced: Vec<PathBuf>,
    /// Outputs that already existed
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    /// Total outputs present after the run.
    pub fn total(&self) -> usize {
        self.produced.len() + self.skipped.len()
    }
}

/// Runs one job per item, writing into a directory.
#[derive(Clone, Debug)]
pub struct TaskBatch {
    out_dir: PathBuf,
    pattern: FramePattern,
}

impl TaskBatch {
    /// Batch writing `frame_NNN.png` files into `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            pattern: FramePattern::default(),
        }
    }

    /// Set the output naming pattern.
    pub fn with_pattern(mut self, pattern: FramePattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn pattern(&self) -> &FramePattern {
        &self.pattern
    }

    /// Output path of item `index`.
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.out_dir.join(self.pattern.file_name(index))
    }

    /// Run `job(item, output_path)` for every item whose output is missing.
    ///
    /// Items are independent and may run concurrently. The first failure
    /// aborts the batch; outputs already written stay on disk and are
    /// skipped on the next run.
    ///
    /// # Errors
    /// - the job's error
    /// - `MissingOutput` if a job returns `Ok` without creating its file
    pub fn run<T, F>(&self, items: &[T], job: F) -> Result<BatchReport, WorkflowError>
    where
        T: Sync,
        F: Fn(&T, &Path) -> Result<(), WorkflowError> + Sync,
    {
        fs::create_dir_all(&self.out_dir)?;

        let mut report = BatchReport::default();
        let mut pending = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let path = self.output_path(index);
            if path.exists() {
                report.skipped.push(path);
            } else {
                pending.push((item, path));
            }
        }

        log::info!(
            "running {} of {} tasks in {} ({} already present)",
            pending.len(),
            items.len(),
            self.out_dir.display(),
            report.skipped.len()
        );

        let execute = |(item, path): &(&T, PathBuf)| -> Result<(), WorkflowError> {
            job(item, path)?;
            if !path.exists() {
                return Err(WorkflowError::MissingOutput { path: path.clone() });
            }
            Ok(())
        };

        #[cfg(feature = "parallel")]
        pending.par_iter().try_for_each(execute)?;

        #[cfg(not(feature = "parallel"))]
        pending.iter().try_for_each(execute)?;

        report.produced = pending.into_iter().map(|(_, path)| path).collect();
        Ok(report)
    }
}
