//! Terminal screen module
//!
//! This module hosts the timer screen: input handling, countdown rendering
//! and user-facing notices.

pub mod command;
pub mod screen;

// Re-export main types
pub use command::Command;
pub use screen::{Control, Screen};
