//! State management module
//!
//! This module contains the countdown state, the notification data model
//! and the messages surfaced to the user.

pub mod notice;
pub mod notification_state;
pub mod timer_state;

// Re-export main types
pub use notice::Notice;
pub use notification_state::{
    DeliveredNotification, HandlerPolicy, Importance, NotificationChannel, NotificationContent,
    NotificationId, NotificationRegistration, NotificationResponse, PermissionStatus,
    RegistrationStatus, ScheduledNotification,
};
pub use timer_state::{format_time, parse_minutes, TimerState, DEFAULT_MINUTES};
