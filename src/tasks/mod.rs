//! Background tasks module
//!
//! This module contains the countdown tick task and the passive
//! notification listeners.

pub mod countdown;
pub mod listeners;

// Re-export main functions
pub(crate) use countdown::countdown_task;
pub use listeners::{spawn_listeners, ListenerGuard};
