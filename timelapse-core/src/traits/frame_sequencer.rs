use std::path::{Path, PathBuf};

use crate::models::error::EncodeError;

/// Muxes an ordered list of still images into one video file.
pub trait FrameSequencer: Send + Sync {
    /// Encode `frames` in the given order at `fps` into `output`.
    fn encode(&self, frames: &[PathBuf], fps: f64, output: &Path) -> Result<(), EncodeError>;
}

impl<T: FrameSequencer + ?Sized> FrameSequencer for Box<T> {
    fn encode(&self, frames: &[PathBuf], fps: f64, output: &Path) -> Result<(), EncodeError> {
        (**self).encode(frames, fps, output)
    }
}

impl<T: FrameSequencer + ?Sized> FrameSequencer for &T {
    fn encode(&self, frames: &[PathBuf], fps: f64, output: &Path) -> Result<(), EncodeError> {
        (**self).encode(frames, fps, output)
    }
}
