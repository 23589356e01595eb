use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::error::{AssemblyError, SessionError};

/// Video produced by a successful assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelapseVideo {
    pub path: PathBuf,
    pub frame_count: usize,
    /// Frames left out under the lenient mismatch policy.
    pub dropped_frames: usize,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Hex SHA-256 of the output file.
    pub checksum: String,
}

/// What happened to the assembly step.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyOutcome {
    /// Timelapse generation is turned off in the configuration.
    Disabled,
    /// The session ended before assembly could run (fatal error).
    NotRun,
    /// No frame was captured successfully; nothing to assemble.
    SkippedNoFrames,
    Completed(TimelapseVideo),
    Failed(AssemblyError),
}

impl AssemblyOutcome {
    pub fn video(&self) -> Option<&TimelapseVideo> {
        match self {
            Self::Completed(video) => Some(video),
            _ => None,
        }
    }
}

/// A failed capture attempt as surfaced in the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameError {
    pub sequence: u64,
    pub reason: String,
}

/// Process exit status derived from a session result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Fatal,
    AssemblyFailed,
    NoFrames,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Fatal => 1,
            Self::AssemblyFailed => 2,
            Self::NoFrames => 3,
        }
    }
}

/// Summary of a whole session. The single object reported to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub planned: u64,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub frame_errors: Vec<FrameError>,
    pub cancelled: bool,
    pub fatal_error: Option<SessionError>,
    pub assembly: AssemblyOutcome,
    pub manifest_path: Option<PathBuf>,
}

impl SessionResult {
    /// Result for a session that never started capturing.
    pub fn rejected(session_id: String, error: SessionError) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            started_at: now,
            finished_at: now,
            planned: 0,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            frame_errors: Vec::new(),
            cancelled: false,
            fatal_error: Some(error),
            assembly: AssemblyOutcome::NotRun,
            manifest_path: None,
        }
    }

    pub fn video_path(&self) -> Option<&PathBuf> {
        self.assembly.video().map(|v| &v.path)
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.fatal_error.is_some() {
            return ExitStatus::Fatal;
        }
        match &self.assembly {
            AssemblyOutcome::Completed(_) => ExitStatus::Success,
            AssemblyOutcome::Failed(_) => ExitStatus::AssemblyFailed,
            AssemblyOutcome::SkippedNoFrames => ExitStatus::NoFrames,
            AssemblyOutcome::NotRun => ExitStatus::Fatal,
            AssemblyOutcome::Disabled if self.succeeded == 0 => ExitStatus::NoFrames,
            AssemblyOutcome::Disabled => ExitStatus::Success,
        }
    }
}

impl fmt::Display for SessionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "session {}", self.session_id)?;
        writeln!(
            f,
            "  captures: {} attempted, {} succeeded, {} failed (planned {})",
            self.attempted, self.succeeded, self.failed, self.planned
        )?;
        if self.cancelled {
            writeln!(f, "  cancelled before all attempts ran")?;
        }
        for error in &self.frame_errors {
            writeln!(f, "  frame {:06}: {}", error.sequence, error.reason)?;
        }
        if let Some(ref error) = self.fatal_error {
            writeln!(f, "  fatal: {}", error)?;
        }
        match &self.assembly {
            AssemblyOutcome::Disabled => writeln!(f, "  timelapse: disabled")?,
            AssemblyOutcome::NotRun => writeln!(f, "  timelapse: not run")?,
            AssemblyOutcome::SkippedNoFrames => writeln!(f, "  timelapse: no frames to assemble")?,
            AssemblyOutcome::Completed(video) => writeln!(
                f,
                "  timelapse: {} ({} frames, {} dropped, {}x{} @ {} fps)",
                video.path.display(),
                video.frame_count,
                video.dropped_frames,
                video.width,
                video.height,
                video.fps
            )?,
            AssemblyOutcome::Failed(error) => writeln!(f, "  timelapse failed: {}", error)?,
        }
        if let Some(ref path) = self.manifest_path {
            write!(f, "  manifest: {}", path.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::ConfigError;

    fn result_with(assembly: AssemblyOutcome, succeeded: u64) -> SessionResult {
        SessionResult {
            succeeded,
            attempted: 6,
            failed: 6 - succeeded,
            assembly,
            fatal_error: None,
            ..SessionResult::rejected("s".into(), SessionError::Storage("unused".into()))
        }
    }

    #[test]
    fn exit_codes_are_distinct() {
        let video = TimelapseVideo {
            path: PathBuf::from("out.mp4"),
            frame_count: 6,
            dropped_frames: 0,
            width: 4,
            height: 4,
            fps: 24.0,
            checksum: String::new(),
        };
        assert_eq!(result_with(AssemblyOutcome::Completed(video), 6).exit_status().code(), 0);
        assert_eq!(
            result_with(AssemblyOutcome::Failed(AssemblyError::NoFrames), 6)
                .exit_status()
                .code(),
            2
        );
        assert_eq!(result_with(AssemblyOutcome::SkippedNoFrames, 0).exit_status().code(), 3);
        assert_eq!(result_with(AssemblyOutcome::Disabled, 6).exit_status().code(), 0);
        assert_eq!(result_with(AssemblyOutcome::Disabled, 0).exit_status().code(), 3);
    }

    #[test]
    fn rejected_session_is_fatal() {
        let result = SessionResult::rejected(
            "s".into(),
            SessionError::Config(ConfigError::Invalid("interval".into())),
        );
        assert_eq!(result.exit_status(), ExitStatus::Fatal);
        assert_eq!(result.attempted, 0);
        assert!(result.to_string().contains("fatal: invalid configuration: interval"));
    }
}
