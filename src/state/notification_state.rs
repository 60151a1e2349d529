//! Notification data model shared by the gateway and its hosts

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Advisory shown when the permission handshake does not end in a grant
pub const PERMISSION_ADVISORY: &str = "Failed to get push token for push notification";

/// Payload key marking the completion notification
pub const TIMER_FINISHED_KEY: &str = "timerFinished";

/// Opaque handle of a notification queued with the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission status reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Outcome of the permission handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RegistrationStatus {
    Granted,
    Denied,
    Unavailable(String),
}

/// Result of gateway initialization, fixed for the rest of the process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRegistration {
    pub status: RegistrationStatus,
    /// Kept for forward compatibility; nothing is sent anywhere
    pub device_token: Option<String>,
}

impl NotificationRegistration {
    pub fn granted(device_token: Option<String>) -> Self {
        Self {
            status: RegistrationStatus::Granted,
            device_token,
        }
    }

    pub fn denied() -> Self {
        Self {
            status: RegistrationStatus::Denied,
            device_token: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            status: RegistrationStatus::Unavailable(reason.into()),
            device_token: None,
        }
    }

    pub fn permission_granted(&self) -> bool {
        self.status == RegistrationStatus::Granted
    }

    /// Message to surface when running in degraded mode
    pub fn advisory(&self) -> Option<String> {
        match &self.status {
            RegistrationStatus::Granted => None,
            RegistrationStatus::Denied => Some(PERMISSION_ADVISORY.to_string()),
            RegistrationStatus::Unavailable(reason) => {
                Some(format!("{PERMISSION_ADVISORY}: {reason}"))
            }
        }
    }
}

/// The single pending completion notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub id: NotificationId,
    pub fire_after_seconds: u64,
    pub fire_at: DateTime<Utc>,
}

/// Title, body, sound and data of a local notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub play_sound: bool,
    pub data: Value,
}

impl NotificationContent {
    /// Content of the "timer finished" notification
    pub fn timer_finished(minutes: u64) -> Self {
        Self {
            title: "Time's up!".to_string(),
            body: format!("Your {minutes}-minute focus session has finished."),
            play_sound: true,
            data: json!({ TIMER_FINISHED_KEY: true }),
        }
    }

    pub fn is_timer_finished(&self) -> bool {
        self.data
            .get(TIMER_FINISHED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// How notifications are presented while the app is in the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerPolicy {
    pub show_alert: bool,
    pub play_sound: bool,
    /// Raise the app badge per delivery, on hosts that have one
    pub set_badge: bool,
}

impl Default for HandlerPolicy {
    fn default() -> Self {
        Self {
            show_alert: true,
            play_sound: true,
            set_badge: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Min,
    Low,
    Default,
    High,
    Max,
}

/// Notification channel, for hosts that group notifications into channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: Importance,
    pub vibration_pattern: Vec<u64>,
}

impl NotificationChannel {
    pub fn default_channel() -> Self {
        Self {
            id: "default".to_string(),
            name: "default".to_string(),
            importance: Importance::Max,
            vibration_pattern: vec![0, 250, 250, 250],
        }
    }
}

/// A notification the host delivered while the app was in the foreground
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredNotification {
    pub id: NotificationId,
    pub content: NotificationContent,
    pub delivered_at: DateTime<Utc>,
}

/// The user interacted with a delivered notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: NotificationId,
    pub action: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_finished_content_carries_marker() {
        let content = NotificationContent::timer_finished(25);
        assert_eq!(content.title, "Time's up!");
        assert!(content.body.contains("25-minute"));
        assert!(content.play_sound);
        assert!(content.is_timer_finished());
        assert_eq!(content.data.to_string(), r#"{"timerFinished":true}"#);
    }

    #[test]
    fn registration_advisories() {
        assert_eq!(NotificationRegistration::granted(None).advisory(), None);
        assert_eq!(
            NotificationRegistration::denied().advisory().as_deref(),
            Some(PERMISSION_ADVISORY)
        );
        let unavailable = NotificationRegistration::unavailable("not a physical device");
        assert!(!unavailable.permission_granted());
        assert!(unavailable.advisory().unwrap().ends_with("not a physical device"));
    }

    #[test]
    fn default_channel_matches_platform_defaults() {
        let channel = NotificationChannel::default_channel();
        assert_eq!(channel.importance, Importance::Max);
        assert_eq!(channel.vibration_pattern, vec![0, 250, 250, 250]);
    }
}
