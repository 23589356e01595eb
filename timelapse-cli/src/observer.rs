use timelapse_core::{Frame, FrameStatus, SessionObserver, SessionPhase, SessionResult};

/// SessionObserver that reports progress through the `log` facade.
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_phase_changed(&self, phase: &SessionPhase) {
        match phase {
            SessionPhase::Capturing { attempt, total } => {
                log::info!("Capture {}/{}", attempt, total);
            }
            SessionPhase::Assembling { frames } => {
                log::info!("Assembling timelapse from {} frames", frames);
            }
            SessionPhase::Failed(error) => log::error!("Session failed: {}", error),
            other => log::debug!("Session {}", other.name()),
        }
    }

    fn on_frame_recorded(&self, frame: &Frame) {
        if let FrameStatus::Failed(ref reason) = frame.status {
            log::warn!("Frame {} not captured: {}", frame.sequence, reason);
        }
    }

    fn on_session_finished(&self, result: &SessionResult) {
        log::info!(
            "Session {} finished: {}/{} frames captured",
            result.session_id,
            result.succeeded,
            result.attempted
        );
    }
}
