//! Stitches still frames into a video with ffmpeg's image2 demuxer.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use timelapse_core::models::error::EncodeError;
use timelapse_core::traits::frame_sequencer::FrameSequencer;

use crate::process::{self, RunOutcome};

/// Frame sequencer backed by an `ffmpeg` binary.
///
/// Frames are hard-linked (or copied, across filesystems) into a staging
/// directory as `000000.ext, 000001.ext, ...` in the order given, so the
/// video order is exactly the input order regardless of the original file
/// names. Output goes to a hidden sibling file that is renamed into place
/// when ffmpeg exits cleanly.
#[derive(Debug, Clone)]
pub struct FfmpegSequencer {
    ffmpeg: PathBuf,
    codec: String,
}

impl FfmpegSequencer {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            codec: "mpeg4".into(),
        }
    }

    /// Use a different video encoder (default: `mpeg4`, always built into ffmpeg).
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Arguments for encoding `pattern` (an image2 `%06d` pattern) at `fps`.
    pub fn args(&self, pattern: &Path, fps: f64, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-framerate".into(),
            format!("{}", fps).into(),
            "-start_number".into(),
            "0".into(),
            "-i".into(),
            pattern.as_os_str().to_owned(),
        ];
        for arg in [
            "-c:v",
            self.codec.as_str(),
            "-q:v",
            "2",
            "-pix_fmt",
            "yuv420p",
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
        ] {
            args.push(arg.into());
        }
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl FrameSequencer for FfmpegSequencer {
    fn encode(&self, frames: &[PathBuf], fps: f64, output: &Path) -> Result<(), EncodeError> {
        let first = frames
            .first()
            .ok_or_else(|| EncodeError::Failed("no frames given".into()))?;
        let extension = first
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "jpg".into());

        let staging_dir = sibling(output, "frames");
        let staged_output = sibling_with_name(output);
        let pattern = staging_dir.join(format!("%06d.{}", extension));

        let result = stage_frames(frames, &staging_dir, &extension)
            .map_err(|e| EncodeError::Failed(format!("failed to stage frames: {}", e)))
            .and_then(|()| self.run_encoder(&pattern, fps, &staged_output))
            .and_then(|()| {
                fs::rename(&staged_output, output)
                    .map_err(|e| EncodeError::Failed(format!("failed to move video into place: {}", e)))
            });

        if let Err(e) = fs::remove_dir_all(&staging_dir) {
            log::warn!("Failed to clean up {}: {}", staging_dir.display(), e);
        }
        if result.is_err() && staged_output.exists() {
            let _ = fs::remove_file(&staged_output);
        }
        result
    }
}

impl FfmpegSequencer {
    fn run_encoder(&self, pattern: &Path, fps: f64, output: &Path) -> Result<(), EncodeError> {
        let args = self.args(pattern, fps, output);
        match process::run(&self.ffmpeg, &args, None) {
            Ok(RunOutcome::Exited { status, .. }) if status.success() => Ok(()),
            Ok(RunOutcome::Exited { status, stderr }) => Err(EncodeError::Failed(format!(
                "ffmpeg failed ({}): {}",
                status,
                process::last_line(&stderr)
            ))),
            Ok(RunOutcome::TimedOut) => Err(EncodeError::Failed("ffmpeg timed out".into())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(EncodeError::Unavailable(format!(
                "{} not found",
                self.ffmpeg.display()
            ))),
            Err(e) => Err(EncodeError::Failed(format!("failed to run {}: {}", self.ffmpeg.display(), e))),
        }
    }
}

/// Link or copy `frames` into `dir` as a contiguous zero-based sequence.
pub fn stage_frames(frames: &[PathBuf], dir: &Path, extension: &str) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    for (index, frame) in frames.iter().enumerate() {
        let target = dir.join(format!("{:06}.{}", index, extension));
        if fs::hard_link(frame, &target).is_err() {
            fs::copy(frame, &target)?;
        }
    }
    Ok(())
}

/// `dir/.name.suffix` next to `output`.
fn sibling(output: &Path, suffix: &str) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "timelapse".into());
    output.with_file_name(format!(".{}.{}", name, suffix))
}

/// `dir/.partial.name` next to `output`, keeping the extension for muxer selection.
fn sibling_with_name(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "timelapse.mp4".into());
    output.with_file_name(format!(".partial.{}", name))
}
