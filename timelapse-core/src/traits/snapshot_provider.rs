use std::path::Path;

use crate::models::config::Transport;
use crate::models::error::CaptureError;

/// Source of single still frames from a network video stream.
///
/// Implemented by:
/// - `FfmpegSnapshot` (timelapse-ffmpeg)
/// - in-memory fakes in tests
pub trait SnapshotProvider: Send + Sync {
    /// Grab exactly one frame from `source` and write it to `destination`.
    ///
    /// On `Ok(())` the file must be complete. Implementations should never
    /// leave a partially written file at `destination`.
    fn capture(
        &self,
        source: &str,
        transport: Transport,
        destination: &Path,
    ) -> Result<(), CaptureError>;
}

impl<T: SnapshotProvider + ?Sized> SnapshotProvider for Box<T> {
    fn capture(&self, source: &str, transport: Transport, destination: &Path) -> Result<(), CaptureError> {
        (**self).capture(source, transport, destination)
    }
}
