use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};

/// Outcome of a single capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    Success,
    Failed(String),
}

impl FrameStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// One capture attempt. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub path: PathBuf,
    pub status: FrameStatus,
}

impl Frame {
    pub fn success(sequence: u64, captured_at: DateTime<Utc>, path: PathBuf) -> Self {
        Self {
            sequence,
            captured_at,
            path,
            status: FrameStatus::Success,
        }
    }

    pub fn failed(
        sequence: u64,
        captured_at: DateTime<Utc>,
        path: PathBuf,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            captured_at,
            path,
            status: FrameStatus::Failed(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            FrameStatus::Success => None,
            FrameStatus::Failed(reason) => Some(reason),
        }
    }

    /// Assembly order: capture timestamp, then sequence index.
    pub fn temporal_cmp(&self, other: &Self) -> Ordering {
        self.captured_at
            .cmp(&other.captured_at)
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// File stem for a frame: zero-padded attempt index then local wall time.
///
/// The index keeps names unique at sub-second intervals and makes
/// lexicographic order match capture order. Only a convenience for people
/// browsing the directory; the store's records decide assembly order.
pub fn frame_identifier(sequence: u64, at: DateTime<Local>) -> String {
    format!("{:06}_{}", sequence, at.format("%Y%m%d_%H%M%S"))
}
