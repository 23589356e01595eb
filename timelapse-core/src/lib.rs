//! # timelapse-core
//!
//! Platform-agnostic timelapse capture core library.
//!
//! Schedules periodic snapshots of a network video source, keeps an ordered
//! record of every attempt, and stitches the successful frames into a video.
//! Concrete grabbing and encoding backends (the ffmpeg subprocess backend in
//! `timelapse-ffmpeg`, or test fakes) implement the `SnapshotProvider` and
//! `FrameSequencer` traits and plug into the generic `Session`.
//!
//! ## Architecture
//!
//! ```text
//! timelapse-core (this crate)
//! ├── traits/       ← SnapshotProvider, FrameSequencer, SessionObserver
//! ├── models/       ← CaptureConfiguration, Frame, SessionResult, errors, SessionPhase
//! ├── scheduling/   ← CaptureScheduler, CancellationToken
//! ├── assembly/     ← TimelapseAssembler
//! ├── session/      ← Session (orchestrator)
//! └── storage/      ← FrameStore, session manifest
//! ```

pub mod assembly;
pub mod models;
pub mod scheduling;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use assembly::assembler::{EncodePlan, TimelapseAssembler};
pub use models::config::{CaptureConfiguration, MismatchPolicy, RawConfig, SessionLength, TimelapseSettings, Transport};
pub use models::error::{AssemblyError, CaptureError, ConfigError, EncodeError, SessionError};
pub use models::frame::{Frame, FrameStatus};
pub use models::session_result::{AssemblyOutcome, ExitStatus, FrameError, SessionResult, TimelapseVideo};
pub use models::state::SessionPhase;
pub use scheduling::cancel::CancellationToken;
pub use scheduling::scheduler::{CaptureScheduler, ScheduleOutcome, SessionPlan};
pub use session::orchestrator::Session;
pub use storage::frame_store::FrameStore;
pub use storage::manifest::{read_manifest, write_manifest, SessionManifest};
pub use traits::frame_sequencer::FrameSequencer;
pub use traits::session_observer::SessionObserver;
pub use traits::snapshot_provider::SnapshotProvider;
