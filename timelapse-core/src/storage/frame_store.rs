use parking_lot::Mutex;

use crate::models::frame::Frame;

/// Authoritative record of every capture attempt in a session.
///
/// Assembly order comes from the recorded timestamps and sequence numbers,
/// never from directory listings or file mtimes. Protected by a
/// `parking_lot::Mutex`, so a record becomes visible to readers only once
/// `record` has returned and readers never see a torn entry.
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Mutex<Vec<Frame>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously recorded frames (e.g. a manifest).
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self {
            frames: Mutex::new(frames),
        }
    }

    pub fn record(&self, frame: Frame) {
        self.frames.lock().push(frame);
    }

    /// All records in the order they were recorded.
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.frames.lock().iter().filter(|f| f.is_success()).count()
    }

    /// Successful frames ordered by capture time, ties by sequence index.
    ///
    /// Deterministic: with no intervening `record`, repeated calls return
    /// the same order.
    pub fn list_successful(&self) -> Vec<Frame> {
        let mut successful: Vec<Frame> = self
            .frames
            .lock()
            .iter()
            .filter(|f| f.is_success())
            .cloned()
            .collect();
        successful.sort_by(Frame::temporal_cmp);
        successful
    }
}
