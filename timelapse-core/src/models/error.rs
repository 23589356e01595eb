use std::path::PathBuf;

use thiserror::Error;

/// Configuration rejected before any capture attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    FileRead { path: PathBuf, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("output directory {path} is not usable: {message}")]
    OutputDirectory { path: PathBuf, message: String },
}

/// Failure of a single snapshot attempt.
///
/// Recorded into the frame and never retried within the same slot.
/// `OutputUnwritable` is the one variant that stops the capture loop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CaptureError {
    #[error("capture timed out after {0:.1}s")]
    Timeout(f64),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("snapshot could not be decoded: {0}")]
    Decode(String),

    #[error("snapshot file missing or empty: {0}")]
    MissingOutput(PathBuf),

    #[error("output directory not writable: {0}")]
    OutputUnwritable(String),

    #[error("snapshot provider failed: {0}")]
    Provider(String),
}

impl CaptureError {
    /// Whether further attempts in this session cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutputUnwritable(_))
    }
}

/// Failure reported by a `FrameSequencer`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("encoder not available: {0}")]
    Unavailable(String),

    #[error("encoder failed: {0}")]
    Failed(String),
}

/// Failure of the assembly step. Fatal for assembly only; capture results
/// are kept regardless.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("no frames to assemble")]
    NoFrames,

    #[error("frame rate must be a positive number, got {0}")]
    InvalidFrameRate(f64),

    #[error("frame {path} could not be decoded: {message}")]
    UnreadableFrame { path: PathBuf, message: String },

    #[error(
        "frame {path} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        path: PathBuf,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("encoding failed: {0}")]
    EncodeFailure(#[from] EncodeError),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors that end a session early.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("capture aborted: {0}")]
    CapabilityFatal(CaptureError),

    #[error("storage error: {0}")]
    Storage(String),
}
