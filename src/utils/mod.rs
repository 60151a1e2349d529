//! Utility functions module
//!
//! Process-level helpers for the screen's input loop.

pub mod signals;

// Re-export main functions
pub use signals::shutdown_signal;
