pub mod frame_sequencer;
pub mod session_observer;
pub mod snapshot_provider;
