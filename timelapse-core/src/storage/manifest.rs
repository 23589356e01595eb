use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::config::{CaptureConfiguration, Transport};
use crate::models::error::SessionError;
use crate::models::frame::{Frame, FrameStatus};
use crate::models::session_result::{AssemblyOutcome, SessionResult};

/// File name of the manifest written next to the captured frames.
pub const MANIFEST_FILE_NAME: &str = "session.json";

/// Outcome of an attempt as written to the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Failed,
}

/// One capture attempt as persisted in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    /// File name relative to the manifest's directory.
    pub file: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameRecord {
    fn from_frame(frame: &Frame) -> Self {
        let file = frame
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| frame.path.to_string_lossy().into_owned());
        let (status, error) = match &frame.status {
            FrameStatus::Success => (RecordStatus::Success, None),
            FrameStatus::Failed(reason) => (RecordStatus::Failed, Some(reason.clone())),
        };
        Self {
            sequence: frame.sequence,
            captured_at: frame.captured_at,
            file,
            status,
            error,
        }
    }

    fn to_frame(&self, base_dir: &Path) -> Frame {
        let path = base_dir.join(&self.file);
        match self.status {
            RecordStatus::Success => Frame::success(self.sequence, self.captured_at, path),
            RecordStatus::Failed => {
                let reason = self.error.clone().unwrap_or_else(|| "unknown".into());
                Frame::failed(self.sequence, self.captured_at, path, reason)
            }
        }
    }
}

/// Assembled video as persisted in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelapseRecord {
    pub path: String,
    pub frame_count: usize,
    pub dropped_frames: usize,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub checksum: String,
}

/// JSON sidecar describing a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    pub id: String,
    pub created_at: String,
    pub finished_at: String,
    pub source_address: String,
    pub transport: Transport,
    pub interval_secs: f64,
    pub planned_attempts: u64,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: bool,
    pub frames: Vec<FrameRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timelapse: Option<TimelapseRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
}

impl SessionManifest {
    pub fn from_session(config: &CaptureConfiguration, frames: &[Frame], result: &SessionResult) -> Self {
        let timelapse = result.assembly.video().map(|video| TimelapseRecord {
            path: video.path.to_string_lossy().into_owned(),
            frame_count: video.frame_count,
            dropped_frames: video.dropped_frames,
            width: video.width,
            height: video.height,
            fps: video.fps,
            checksum: video.checksum.clone(),
        });
        let assembly_error = match &result.assembly {
            AssemblyOutcome::Failed(error) => Some(error.to_string()),
            _ => None,
        };

        Self {
            id: result.session_id.clone(),
            created_at: result.started_at.to_rfc3339(),
            finished_at: result.finished_at.to_rfc3339(),
            source_address: config.source_address.clone(),
            transport: config.transport,
            interval_secs: config.interval.as_secs_f64(),
            planned_attempts: result.planned,
            attempted: result.attempted,
            succeeded: result.succeeded,
            failed: result.failed,
            cancelled: result.cancelled,
            frames: frames.iter().map(FrameRecord::from_frame).collect(),
            timelapse,
            assembly_error,
            fatal_error: result.fatal_error.as_ref().map(|e| e.to_string()),
        }
    }

    /// Frames with paths resolved against `base_dir` (the manifest's directory).
    pub fn frames_in(&self, base_dir: &Path) -> Vec<Frame> {
        self.frames.iter().map(|r| r.to_frame(base_dir)).collect()
    }
}

/// Write the manifest as `session.json` inside `dir`.
pub fn write_manifest(manifest: &SessionManifest, dir: &Path) -> Result<PathBuf, SessionError> {
    let path = dir.join(MANIFEST_FILE_NAME);
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| SessionError::Storage(format!("failed to serialize manifest: {}", e)))?;
    fs::write(&path, json)
        .map_err(|e| SessionError::Storage(format!("failed to write manifest: {}", e)))?;
    Ok(path)
}

/// Read a manifest file written by [`write_manifest`].
pub fn read_manifest(path: &Path) -> Result<SessionManifest, SessionError> {
    let json = fs::read_to_string(path)
        .map_err(|e| SessionError::Storage(format!("failed to read manifest: {}", e)))?;
    let manifest: SessionManifest = serde_json::from_str(&json)
        .map_err(|e| SessionError::Storage(format!("failed to parse manifest: {}", e)))?;
    Ok(manifest)
}
