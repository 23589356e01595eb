//! Single-frame grabs from a network stream via `ffmpeg -frames:v 1`.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use timelapse_core::models::config::Transport;
use timelapse_core::models::error::CaptureError;
use timelapse_core::traits::snapshot_provider::SnapshotProvider;

use crate::process::{self, RunOutcome};

/// Snapshot provider backed by an `ffmpeg` binary.
///
/// ffmpeg writes into a hidden staging file next to the destination, which
/// is renamed into place only after a clean exit. A killed or failed grab
/// never leaves a file under the destination name.
#[derive(Debug, Clone)]
pub struct FfmpegSnapshot {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfmpegSnapshot {
    pub fn new(ffmpeg: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout,
        }
    }

    /// Arguments for grabbing one frame from `source` into `output`.
    pub fn args(source: &str, transport: Transport, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y"]
            .iter()
            .map(OsString::from)
            .collect();
        if source.starts_with("rtsp://") || source.starts_with("rtsps://") {
            args.push("-rtsp_transport".into());
            args.push(transport.as_str().into());
        }
        args.push("-i".into());
        args.push(source.into());
        for arg in ["-frames:v", "1", "-update", "1", "-q:v", "2"] {
            args.push(arg.into());
        }
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl SnapshotProvider for FfmpegSnapshot {
    fn capture(&self, source: &str, transport: Transport, destination: &Path) -> Result<(), CaptureError> {
        let staging = staging_path(destination);
        let args = Self::args(source, transport, &staging);

        let outcome = process::run(&self.ffmpeg, &args, Some(self.timeout)).map_err(|e| {
            CaptureError::Provider(format!("failed to run {}: {}", self.ffmpeg.display(), e))
        });

        let result = match outcome {
            Ok(RunOutcome::Exited { status, .. }) if status.success() => {
                fs::rename(&staging, destination).map_err(|e| {
                    CaptureError::OutputUnwritable(format!("failed to move frame into place: {}", e))
                })
            }
            Ok(RunOutcome::Exited { status, stderr }) => Err(classify_failure(status.code(), &stderr)),
            Ok(RunOutcome::TimedOut) => Err(CaptureError::Timeout(self.timeout.as_secs_f64())),
            Err(e) => Err(e),
        };

        if result.is_err() && staging.exists() {
            let _ = fs::remove_file(&staging);
        }
        result
    }
}

/// Hidden sibling of `destination` that keeps the same extension, so ffmpeg
/// still picks the right image muxer.
fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame.jpg".into());
    destination.with_file_name(format!(".partial.{}", name))
}

/// Map ffmpeg's stderr to a capture error with a readable cause.
fn classify_failure(code: Option<i32>, stderr: &str) -> CaptureError {
    let line = process::last_line(stderr);
    let lower = stderr.to_lowercase();
    if lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("no route to host")
        || lower.contains("name or service not known")
        || lower.contains("server returned")
        || lower.contains("method describe failed")
    {
        CaptureError::Connection(line)
    } else if lower.contains("invalid data found") || lower.contains("could not find codec") {
        CaptureError::Decode(line)
    } else {
        match code {
            Some(code) => CaptureError::Provider(format!("ffmpeg exited with {}: {}", code, line)),
            None => CaptureError::Provider(format!("ffmpeg terminated by signal: {}", line)),
        }
    }
}
