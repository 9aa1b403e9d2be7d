//! Synchronous finalization after a batch.
//!
//! Finalizers compose as tuples: `(VideoEncoder, FrameCleanup)` encodes the
//! frames and then deletes them, stopping at the first failure so frames
//! survive a failed encode.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{BatchReport, FramePattern, WorkflowError};

/// A single step run once after all batch items finish.
pub trait Finalizer {
    /// Run the step. Failures are reported, never retried.
    fn finalize(&self, report: &BatchReport) -> Result<(), WorkflowError>;
}

impl<A: Finalizer, B: Finalizer> Finalizer for (A, B) {
    fn finalize(&self, report: &BatchReport) -> Result<(), WorkflowError> {
        self.0.finalize(report)?;
        self.1.finalize(report)
    }
}

fn run_program(program: &str, args: &[String]) -> Result<(), WorkflowError> {
    let status = Command::new(program).args(args).status()?;
    if !status.success() {
        return Err(WorkflowError::Finalizer {
            program: program.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), WorkflowError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Encodes numbered frames into an H.264 video with ffmpeg.
#[derive(Clone, Debug)]
pub struct VideoEncoder {
    program: String,
    frames_dir: PathBuf,
    pattern: FramePattern,
    framerate: u32,
    crf: u32,
    output: PathBuf,
}

impl VideoEncoder {
    /// Encoder reading `frame_%03d.png` from `frames_dir` into `output`.
    pub fn new(frames_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            program: "ffmpeg".to_string(),
            frames_dir: frames_dir.into(),
            pattern: FramePattern::default(),
            framerate: 12,
            crf: 22,
            output: output.into(),
        }
    }

    /// Use a different executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_pattern(mut self, pattern: FramePattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_framerate(mut self, framerate: u32) -> Self {
        self.framerate = framerate;
        self
    }

    /// Constant rate factor (lower is higher quality).
    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Command-line arguments passed to the encoder.
    pub fn args(&self) -> Vec<String> {
        let input = self.frames_dir.join(self.pattern.printf_pattern());
        vec![
            "-framerate".into(),
            self.framerate.to_string(),
            "-i".into(),
            input.display().to_string(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "slow".into(),
            "-profile:v".into(),
            "high".into(),
            "-level:v".into(),
            "4.0".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-crf".into(),
            self.crf.to_string(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "panic".into(),
            "-y".into(),
            self.output.display().to_string(),
        ]
    }
}

impl Finalizer for VideoEncoder {
    fn finalize(&self, report: &BatchReport) -> Result<(), WorkflowError> {
        log::info!(
            "encoding {} frames into {}",
            report.total(),
            self.output.display()
        );
        create_parent(&self.output)?;
        run_program(&self.program, &self.args())
    }
}

/// Assembles a batch's frames into a looping GIF with ImageMagick.
#[derive(Clone, Debug)]
pub struct GifEncoder {
    program: String,
    delay: u32,
    output: PathBuf,
}

impl GifEncoder {
    /// Encoder writing `output` with ImageMagick's `convert`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            program: "convert".to_string(),
            delay: 20,
            output: output.into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Frame delay in hundredths of a second.
    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay = delay;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Arguments for `report`'s frames, in file-name order.
    pub fn args(&self, report: &BatchReport) -> Vec<String> {
        let mut frames: Vec<&PathBuf> = report.produced.iter().chain(&report.skipped).collect();
        frames.sort();

        let mut args = vec![
            "-delay".to_string(),
            self.delay.to_string(),
            "-loop".to_string(),
            "0".to_string(),
        ];
        args.extend(frames.into_iter().map(|f| f.display().to_string()));
        args.push(self.output.display().to_string());
        args
    }
}

impl Finalizer for GifEncoder {
    fn finalize(&self, report: &BatchReport) -> Result<(), WorkflowError> {
        log::info!(
            "assembling {} frames into {}",
            report.total(),
            self.output.display()
        );
        create_parent(&self.output)?;
        run_program(&self.program, &self.args(report))
    }
}

/// Deletes a batch's frames once they have been encoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameCleanup;

impl Finalizer for FrameCleanup {
    fn finalize(&self, report: &BatchReport) -> Result<(), WorkflowError> {
        let mut removed = 0;
        for frame in report.produced.iter().chain(&report.skipped) {
            match std::fs::remove_file(frame) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("{} already removed", frame.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
        log::info!("removed {} frames", removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_arguments() {
        let encoder = VideoEncoder::new("images", "videos/bed_level.mp4");
        let args = encoder.args();

        assert_eq!(args[0..2], ["-framerate", "12"]);
        assert_eq!(
            Path::new(&args[3]),
            Path::new("images").join("frame_%03d.png")
        );
        let crf = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf + 1], "22");
        assert_eq!(args.last().unwrap(), "videos/bed_level.mp4");
        assert!(args.contains(&"-y".to_string()));
    }

    #[test]
    fn test_builder_overrides() {
        let encoder = VideoEncoder::new("frames", "out.mp4")
            .with_framerate(24)
            .with_crf(18)
            .with_pattern(FramePattern::new("wl_", 4, "png"));
        let args = encoder.args();
        assert_eq!(args[1], "24");
        assert!(args[3].ends_with("wl_%04d.png"));
        assert!(args.contains(&"18".to_string()));
    }

    #[test]
    fn test_gif_arguments_are_ordered() {
        let report = BatchReport {
            produced: vec![PathBuf::from("f/frame_002.png")],
            skipped: vec![PathBuf::from("f/frame_000.png"), PathBuf::from("f/frame_001.png")],
        };
        let args = GifEncoder::new("anim.gif").with_delay(10).args(&report);
        assert_eq!(
            args,
            [
                "-delay",
                "10",
                "-loop",
                "0",
                "f/frame_000.png",
                "f/frame_001.png",
                "f/frame_002.png",
                "anim.gif"
            ]
        );
    }

    #[test]
    fn test_cleanup_removes_frames() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("notes.txt");
        std::fs::write(&keep, "keep").unwrap();

        let pattern = FramePattern::default();
        let frames: Vec<PathBuf> = (0..3).map(|i| dir.path().join(pattern.file_name(i))).collect();
        for frame in &frames[..2] {
            std::fs::write(frame, "png").unwrap();
        }
        // The third frame is already gone
        let report = BatchReport {
            produced: frames[..1].to_vec(),
            skipped: frames[1..].to_vec(),
        };

        FrameCleanup.finalize(&report).unwrap();
        assert!(frames.iter().all(|f| !f.exists()));
        assert!(keep.exists());
    }

    #[test]
    fn test_failed_encode_keeps_frames() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join(FramePattern::default().file_name(0));
        std::fs::write(&frame, "png").unwrap();
        let report = BatchReport {
            produced: vec![frame.clone()],
            skipped: Vec::new(),
        };

        let encoder = VideoEncoder::new(dir.path(), dir.path().join("out.mp4"))
            .with_program("definitely-not-an-encoder-binary");
        assert!((encoder, FrameCleanup).finalize(&report).is_err());
        assert!(frame.exists());

        // A step that succeeds lets the cleanup run
        let gif = GifEncoder::new(dir.path().join("out.gif")).with_program("true");
        (gif, FrameCleanup).finalize(&report).unwrap();
        assert!(!frame.exists());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let encoder = VideoEncoder::new("frames", "out.mp4")
            .with_program("definitely-not-an-encoder-binary");
        assert!(matches!(
            encoder.finalize(&BatchReport::default()),
            Err(WorkflowError::IoError(_))
        ));
    }
}
