pub mod config;
pub mod error;
pub mod frame;
pub mod session_result;
pub mod state;
