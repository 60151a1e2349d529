//! Focus Timer - a countdown screen with local completion notifications
//!
//! This library provides the timer controller, the notification gateway and
//! its hosts, and the terminal screen that ties them together.

pub mod config;
pub mod controller;
pub mod error;
pub mod notifications;
pub mod state;
pub mod tasks;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use controller::{ControllerSnapshot, TimerController};
pub use error::{NotificationError, TimerError};
pub use notifications::{DesktopHost, InMemoryHost, NotificationGateway, NotificationHost};
pub use state::{format_time, parse_minutes, Notice, TimerState};
pub use ui::Screen;
pub use utils::signals::shutdown_signal;
