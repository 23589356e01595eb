pub mod frame_store;
pub mod manifest;
