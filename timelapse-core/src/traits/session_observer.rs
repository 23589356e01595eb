use crate::models::frame::Frame;
use crate::models::session_result::SessionResult;
use crate::models::state::SessionPhase;

/// Event observer for session progress.
///
/// All methods are called synchronously from the thread running the
/// session, so implementations should return quickly.
pub trait SessionObserver: Send + Sync {
    /// Called when the session moves to a new phase.
    fn on_phase_changed(&self, phase: &SessionPhase);

    /// Called after each capture attempt has been recorded.
    fn on_frame_recorded(&self, frame: &Frame);

    /// Called once with the final result.
    fn on_session_finished(&self, result: &SessionResult);
}
