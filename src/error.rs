//! Error types for the timer and notification layers

use thiserror::Error;

use crate::state::Notice;

/// Failures reported by the notification host or gateway
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification permission was not granted")]
    PermissionDenied,
    #[error("notifications are unavailable on this host: {0}")]
    Unavailable(String),
    #[error("notification gateway has not been initialized")]
    NotInitialized,
    #[error("notification host error: {0}")]
    Host(String),
}

impl NotificationError {
    /// Errors that leave the countdown usable without notifications
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::Unavailable(_))
    }
}

/// Failures reported by the timer controller
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("please enter a positive whole number of minutes (got {0:?})")]
    InvalidDuration(String),
    #[error("the timer is already running")]
    AlreadyRunning,
    #[error("the duration can only be changed while the timer is stopped")]
    NotIdle,
    #[error("could not schedule the completion notification: {0}")]
    Scheduling(#[source] NotificationError),
    #[error("timer state lock poisoned")]
    StatePoisoned,
}

impl TimerError {
    /// Translate the error into the message shown on screen
    pub fn notice(&self) -> Notice {
        match self {
            Self::InvalidDuration(_) | Self::NotIdle => Notice::Alert(self.to_string()),
            _ => Notice::Advisory(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_errors() {
        assert!(NotificationError::PermissionDenied.is_degraded());
        assert!(NotificationError::Unavailable("no device".into()).is_degraded());
        assert!(!NotificationError::Host("boom".into()).is_degraded());
        assert!(!NotificationError::NotInitialized.is_degraded());
    }

    #[test]
    fn validation_errors_are_blocking_alerts() {
        let notice = TimerError::InvalidDuration("-5".into()).notice();
        assert!(matches!(notice, Notice::Alert(msg) if msg.contains("-5")));

        let notice = TimerError::Scheduling(NotificationError::Host("boom".into())).notice();
        assert!(matches!(notice, Notice::Advisory(msg) if msg.contains("boom")));
    }
}
