//! Notification gateway: permission handshake, completion scheduling and
//! listener lifetime on top of a `NotificationHost`.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::NotificationHost;
use crate::{
    error::NotificationError,
    state::{
        HandlerPolicy, NotificationChannel, NotificationContent, NotificationId,
        NotificationRegistration, PermissionStatus, RegistrationStatus, ScheduledNotification,
    },
    tasks::listeners::{spawn_listeners, ListenerGuard},
};

/// Counters kept by the passive listeners
#[derive(Debug, Default)]
pub struct ObservedEvents {
    pub received: AtomicU64,
    pub responded: AtomicU64,
}

impl ObservedEvents {
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }

    pub fn responded(&self) -> u64 {
        self.responded.load(Ordering::SeqCst)
    }
}

/// Owns the process's notification registration and the single scheduled
/// completion notification.
pub struct NotificationGateway {
    host: Arc<dyn NotificationHost>,
    registration: OnceCell<NotificationRegistration>,
    scheduled: Mutex<Option<ScheduledNotification>>,
    listeners: Mutex<Option<ListenerGuard>>,
    observed: Arc<ObservedEvents>,
}

impl NotificationGateway {
    /// Create a gateway and apply the foreground presentation policy to its host
    pub fn new(host: Arc<dyn NotificationHost>, policy: HandlerPolicy) -> Self {
        host.set_handler_policy(policy);
        debug!(host = host.name(), ?policy, "Notification handler policy applied");
        Self {
            host,
            registration: OnceCell::new(),
            scheduled: Mutex::new(None),
            listeners: Mutex::new(None),
            observed: Arc::new(ObservedEvents::default()),
        }
    }

    /// Run the permission handshake once and attach the passive listeners.
    /// Later calls return the first registration unchanged.
    pub async fn initialize(&self) -> NotificationRegistration {
        self.registration
            .get_or_init(|| self.register())
            .await
            .clone()
    }

    async fn register(&self) -> NotificationRegistration {
        // Listeners are detached by the guard's drop if registration bails out early
        let guard = spawn_listeners(self.host.as_ref(), Arc::clone(&self.observed));

        let registration = match self.handshake().await {
            Ok(registration) => registration,
            Err(NotificationError::PermissionDenied) => NotificationRegistration::denied(),
            Err(NotificationError::Unavailable(reason)) => NotificationRegistration::unavailable(reason),
            Err(e) => NotificationRegistration::unavailable(e.to_string()),
        };

        match registration.advisory() {
            Some(advisory) => {
                warn!(host = self.host.name(), "{}", advisory);
                drop(guard);
            }
            None => {
                info!(host = self.host.name(), "Notification permission granted");
                match self.listeners.lock() {
                    Ok(mut listeners) => *listeners = Some(guard),
                    Err(e) => warn!("Failed to keep notification listeners: {}", e),
                }
            }
        }

        registration
    }

    async fn handshake(&self) -> Result<NotificationRegistration, NotificationError> {
        if !self.host.is_capable().await {
            return Err(NotificationError::Unavailable(
                "must use a device with a notification service".to_string(),
            ));
        }

        if self.host.supports_channels() {
            self.host
                .ensure_channel(&NotificationChannel::default_channel())
                .await?;
        }

        let mut status = self.host.permission_status().await?;
        if status != PermissionStatus::Granted {
            debug!(?status, "Requesting notification permission");
            status = self.host.request_permission().await?;
        }
        if status != PermissionStatus::Granted {
            return Err(NotificationError::PermissionDenied);
        }

        let token = match self.host.push_token().await {
            Ok(token) => {
                debug!(%token, "Obtained push token");
                Some(token)
            }
            Err(e) => {
                warn!("Failed to obtain push token: {}", e);
                None
            }
        };

        Ok(NotificationRegistration::granted(token))
    }

    /// Registration, if `initialize` has completed
    pub fn registration(&self) -> Option<&NotificationRegistration> {
        self.registration.get()
    }

    /// Replace any pending notification with a "timer finished" notification
    /// due `after_seconds` from now.
    pub async fn schedule_completion(
        &self,
        after_seconds: u64,
    ) -> Result<ScheduledNotification, NotificationError> {
        let registration = self.registration().ok_or(NotificationError::NotInitialized)?;
        if !registration.permission_granted() {
            return Err(match &registration.status {
                RegistrationStatus::Unavailable(reason) => {
                    NotificationError::Unavailable(reason.clone())
                }
                _ => NotificationError::PermissionDenied,
            });
        }

        self.cancel_all().await?;

        let content = NotificationContent::timer_finished(after_seconds / 60);
        let id = self
            .host
            .schedule(content, Duration::from_secs(after_seconds))
            .await?;

        let scheduled = ScheduledNotification {
            id,
            fire_after_seconds: after_seconds,
            fire_at: Utc::now() + chrono::Duration::seconds(after_seconds as i64),
        };
        self.set_scheduled(Some(scheduled.clone()))?;

        info!(
            id = %scheduled.id,
            fire_at = %scheduled.fire_at.format("%H:%M:%S"),
            "Completion notification scheduled"
        );
        Ok(scheduled)
    }

    /// Cancel every pending scheduled notification. The local record is
    /// dropped even when the host fails, since no timer backs it any more.
    pub async fn cancel_all(&self) -> Result<(), NotificationError> {
        let cancelled = self.host.cancel_all_scheduled().await;
        if let Some(previous) = self.set_scheduled(None)? {
            debug!(id = %previous.id, "Scheduled notification record cleared");
        }
        cancelled
    }

    /// Forget the scheduled notification because it is firing now.
    /// Leaves the host untouched.
    pub fn complete(&self, id: &NotificationId) {
        match self.scheduled.lock() {
            Ok(mut scheduled) => {
                if scheduled.as_ref().is_some_and(|s| &s.id == id) {
                    *scheduled = None;
                    debug!(id = %id, "Completion notification released");
                }
            }
            Err(e) => warn!("Failed to release scheduled notification: {}", e),
        }
    }

    /// Currently scheduled completion notification
    pub fn scheduled(&self) -> Option<ScheduledNotification> {
        self.scheduled.lock().ok().and_then(|s| s.clone())
    }

    /// Detach the passive listeners
    pub fn dispose(&self) {
        match self.listeners.lock() {
            Ok(mut listeners) => {
                if listeners.take().is_some() {
                    info!("Notification listeners detached");
                }
            }
            Err(e) => warn!("Failed to detach notification listeners: {}", e),
        }
    }

    pub fn listeners_attached(&self) -> bool {
        self.listeners
            .lock()
            .map(|l| l.is_some())
            .unwrap_or(false)
    }

    pub fn observed(&self) -> &ObservedEvents {
        &self.observed
    }

    fn set_scheduled(
        &self,
        value: Option<ScheduledNotification>,
    ) -> Result<Option<ScheduledNotification>, NotificationError> {
        let mut scheduled = self
            .scheduled
            .lock()
            .map_err(|e| NotificationError::Host(format!("scheduled lock poisoned: {}", e)))?;
        Ok(std::mem::replace(&mut *scheduled, value))
    }
}
