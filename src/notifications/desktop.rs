//! Desktop notification host backed by notify-rust

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::{sync::broadcast, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use super::NotificationHost;
use crate::{
    error::NotificationError,
    state::{
        DeliveredNotification, HandlerPolicy, Importance, NotificationChannel, NotificationContent,
        NotificationId, NotificationResponse, PermissionStatus,
    },
};

/// Action name the notification server reports when a notification is dismissed
#[cfg(all(unix, not(target_os = "macos")))]
const CLOSED_ACTION: &str = "__closed";

#[derive(Debug, Clone, Copy)]
struct Presentation {
    policy: HandlerPolicy,
    importance: Importance,
}

/// Schedules local notifications and shows them through the desktop's
/// notification service when they come due.
///
/// Desktop notification servers keep no application badge, so the
/// policy's `set_badge` has nothing to drive here.
#[derive(Debug)]
pub struct DesktopHost {
    app_name: String,
    presentation: Arc<Mutex<Presentation>>,
    pending: Arc<Mutex<HashMap<NotificationId, JoinHandle<()>>>>,
    received_tx: broadcast::Sender<DeliveredNotification>,
    response_tx: broadcast::Sender<NotificationResponse>,
}

impl DesktopHost {
    pub fn new(app_name: impl Into<String>) -> Self {
        let (received_tx, _) = broadcast::channel(16);
        let (response_tx, _) = broadcast::channel(16);
        let host = Self {
            app_name: app_name.into(),
            presentation: Arc::new(Mutex::new(Presentation {
                policy: HandlerPolicy::default(),
                importance: Importance::Default,
            })),
            pending: Arc::new(Mutex::new(HashMap::new())),
            received_tx,
            response_tx,
        };
        debug!(app = %host.app_name, "Desktop notification host created");
        host
    }

    fn presentation(&self) -> Result<Presentation, NotificationError> {
        self.presentation
            .lock()
            .map(|p| *p)
            .map_err(|e| NotificationError::Host(format!("presentation lock poisoned: {}", e)))
    }
}

#[async_trait]
impl NotificationHost for DesktopHost {
    fn name(&self) -> &'static str {
        "desktop"
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    async fn is_capable(&self) -> bool {
        match tokio::task::spawn_blocking(notify_rust::get_server_information).await {
            Ok(Ok(server)) => {
                debug!(server = %server.name, version = %server.version, "Notification server found");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "No desktop notification server reachable");
                false
            }
            Err(e) => {
                warn!(error = %e, "Notification server probe did not complete");
                false
            }
        }
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    async fn is_capable(&self) -> bool {
        true
    }

    fn set_handler_policy(&self, policy: HandlerPolicy) {
        if let Ok(mut presentation) = self.presentation.lock() {
            presentation.policy = policy;
        }
    }

    // Desktop sessions have no permission prompt; a reachable server is consent.
    async fn permission_status(&self) -> Result<PermissionStatus, NotificationError> {
        Ok(PermissionStatus::Granted)
    }

    async fn request_permission(&self) -> Result<PermissionStatus, NotificationError> {
        Ok(PermissionStatus::Granted)
    }

    async fn push_token(&self) -> Result<String, NotificationError> {
        Ok(format!("DesktopPushToken[{}]", uuid::Uuid::new_v4()))
    }

    fn supports_channels(&self) -> bool {
        cfg!(all(unix, not(target_os = "macos")))
    }

    async fn ensure_channel(&self, channel: &NotificationChannel) -> Result<(), NotificationError> {
        let mut presentation = self
            .presentation
            .lock()
            .map_err(|e| NotificationError::Host(format!("presentation lock poisoned: {}", e)))?;
        presentation.importance = channel.importance;
        debug!(channel = %channel.id, importance = ?channel.importance, "Notification channel configured");
        Ok(())
    }

    async fn schedule(
        &self,
        content: NotificationContent,
        after: Duration,
    ) -> Result<NotificationId, NotificationError> {
        let presentation = self.presentation()?;
        let id = NotificationId::generate();

        let app_name = self.app_name.clone();
        let pending = Arc::clone(&self.pending);
        let received_tx = self.received_tx.clone();
        let response_tx = self.response_tx.clone();
        let task_id = id.clone();

        let mut pending_guard = self
            .pending
            .lock()
            .map_err(|e| NotificationError::Host(format!("pending lock poisoned: {}", e)))?;

        let handle = tokio::spawn(async move {
            sleep(after).await;
            if let Ok(mut pending) = pending.lock() {
                pending.remove(&task_id);
            }

            let delivered = DeliveredNotification {
                id: task_id.clone(),
                content: content.clone(),
                delivered_at: Utc::now(),
            };

            if !presentation.policy.show_alert {
                info!(id = %task_id, "{}: {}", content.title, content.body);
                if received_tx.send(delivered).is_err() {
                    debug!("No listener attached for received notifications");
                }
                return;
            }

            let shown = tokio::task::spawn_blocking(move || {
                show_blocking(&app_name, &content, presentation, task_id, delivered, received_tx, response_tx)
            })
            .await;

            match shown {
                Ok(Ok(())) => debug!("Desktop notification finished"),
                Ok(Err(e)) => warn!(error = %e, "notify-rust failed to show notification"),
                Err(e) => warn!(error = %e, "Notification display task failed"),
            }
        });
        pending_guard.insert(id.clone(), handle);

        debug!(id = %id, after_secs = after.as_secs(), "Desktop notification scheduled");
        Ok(id)
    }

    async fn cancel_all_scheduled(&self) -> Result<(), NotificationError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|e| NotificationError::Host(format!("pending lock poisoned: {}", e)))?;
        for (id, handle) in pending.drain() {
            handle.abort();
            debug!(id = %id, "Cancelled desktop notification");
        }
        Ok(())
    }

    fn received_events(&self) -> broadcast::Receiver<DeliveredNotification> {
        self.received_tx.subscribe()
    }

    fn response_events(&self) -> broadcast::Receiver<NotificationResponse> {
        self.response_tx.subscribe()
    }
}

/// Show the notification and, where the server supports it, wait for the
/// user to act on it. Runs on the blocking pool.
fn show_blocking(
    app_name: &str,
    content: &NotificationContent,
    presentation: Presentation,
    id: NotificationId,
    delivered: DeliveredNotification,
    received_tx: broadcast::Sender<DeliveredNotification>,
    response_tx: broadcast::Sender<NotificationResponse>,
) -> Result<(), String> {
    let mut n = notify_rust::Notification::new();
    n.appname(app_name).summary(&content.title).body(&content.body);

    #[cfg(unix)]
    if content.play_sound && presentation.policy.play_sound {
        n.sound_name("message-new-instant");
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        n.urgency(urgency_for(presentation.importance));
        n.action("default", "Open");
    }

    let handle = n.show().map_err(|e| e.to_string())?;
    if received_tx.send(delivered).is_err() {
        debug!("No listener attached for received notifications");
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    handle.wait_for_action(|action| {
        if action != CLOSED_ACTION {
            let response = NotificationResponse {
                id,
                action: action.to_string(),
            };
            if response_tx.send(response).is_err() {
                debug!("No listener attached for notification responses");
            }
        }
    });

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    {
        let _ = (handle, id, response_tx);
    }

    Ok(())
}

#[cfg(all(unix, not(target_os = "macos")))]
fn urgency_for(importance: Importance) -> notify_rust::Urgency {
    match importance {
        Importance::Min | Importance::Low => notify_rust::Urgency::Low,
        Importance::Default => notify_rust::Urgency::Normal,
        Importance::High | Importance::Max => notify_rust::Urgency::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn channel_importance_maps_to_urgency() {
        assert!(matches!(urgency_for(Importance::Max), notify_rust::Urgency::Critical));
        assert!(matches!(urgency_for(Importance::Default), notify_rust::Urgency::Normal));
        assert!(matches!(urgency_for(Importance::Min), notify_rust::Urgency::Low));
    }

    #[tokio::test]
    async fn cancel_all_with_nothing_pending_is_a_no_op() {
        let host = DesktopHost::new("Focus Timer");
        host.cancel_all_scheduled().await.unwrap();
        host.cancel_all_scheduled().await.unwrap();
    }

    #[tokio::test]
    async fn channel_sets_importance() {
        let host = DesktopHost::new("Focus Timer");
        host.ensure_channel(&NotificationChannel::default_channel())
            .await
            .unwrap();
        assert_eq!(host.presentation().unwrap().importance, Importance::Max);
    }
}
