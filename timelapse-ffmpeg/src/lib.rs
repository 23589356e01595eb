//! # timelapse-ffmpeg
//!
//! ffmpeg subprocess backend for timelapse-core.
//!
//! Provides:
//! - `FfmpegSnapshot` — one still frame per call from an RTSP/HTTP stream
//! - `FfmpegSequencer` — ordered stills muxed into a video at a fixed frame rate
//!
//! ## Requirements
//! - An `ffmpeg` binary on `PATH`, or an explicit path in the configuration
//!
//! ## Usage
//! ```ignore
//! use timelapse_core::{CaptureConfiguration, Session};
//! use timelapse_ffmpeg::{FfmpegSequencer, FfmpegSnapshot};
//!
//! let config = CaptureConfiguration::load("timelapse.yaml".as_ref())?;
//! let snapshot = FfmpegSnapshot::new(&config.ffmpeg_path, config.capture_timeout);
//! let sequencer = FfmpegSequencer::new(&config.ffmpeg_path);
//! let session = Session::new(config, snapshot, sequencer);
//! ```

mod process;
pub mod sequencer;
pub mod snapshot;

pub use sequencer::FfmpegSequencer;
pub use snapshot::FfmpegSnapshot;
