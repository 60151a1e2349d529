//! In-process notification host
//!
//! Keeps scheduled notifications in memory and "delivers" them by logging and
//! publishing a received event once their delay elapses. Used for headless
//! runs and as the host behind the test suite.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::{sync::broadcast, task::JoinHandle, time::sleep};
use tracing::{debug, info};

use super::NotificationHost;
use crate::{
    error::NotificationError,
    state::{
        DeliveredNotification, HandlerPolicy, NotificationChannel, NotificationContent,
        NotificationId, NotificationResponse, PermissionStatus,
    },
};

/// Most recent schedule and delivery records kept for inspection
pub const RECORD_LIMIT: usize = 64;

/// A notification handed to `schedule`, kept for inspection
#[derive(Debug, Clone)]
pub struct ScheduleRecord {
    pub id: NotificationId,
    pub content: NotificationContent,
    pub after: Duration,
}

#[derive(Debug)]
struct MemoryInner {
    capable: bool,
    status: PermissionStatus,
    grant_on_request: bool,
    fail_scheduling: bool,
    fail_cancels: bool,
    schedule_delay: Option<Duration>,
    policy: Option<HandlerPolicy>,
    channels: Vec<NotificationChannel>,
    pending: HashMap<NotificationId, JoinHandle<()>>,
    scheduled: VecDeque<ScheduleRecord>,
    delivered: VecDeque<NotificationId>,
    badge: u64,
    permission_requests: usize,
    cancel_calls: usize,
}

fn push_bounded<T>(records: &mut VecDeque<T>, record: T) {
    if records.len() == RECORD_LIMIT {
        records.pop_front();
    }
    records.push_back(record);
}

/// Notification host that lives entirely inside the process
#[derive(Debug)]
pub struct InMemoryHost {
    inner: Arc<Mutex<MemoryInner>>,
    received_tx: broadcast::Sender<DeliveredNotification>,
    response_tx: broadcast::Sender<NotificationResponse>,
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHost {
    /// A capable host that grants permission when asked
    pub fn new() -> Self {
        let (received_tx, _) = broadcast::channel(16);
        let (response_tx, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                capable: true,
                status: PermissionStatus::Undetermined,
                grant_on_request: true,
                fail_scheduling: false,
                fail_cancels: false,
                schedule_delay: None,
                policy: None,
                channels: Vec::new(),
                pending: HashMap::new(),
                scheduled: VecDeque::new(),
                delivered: VecDeque::new(),
                badge: 0,
                permission_requests: 0,
                cancel_calls: 0,
            })),
            received_tx,
            response_tx,
        }
    }

    /// Permission already granted before the app asks
    pub fn pre_granted(self) -> Self {
        self.update(|inner| inner.status = PermissionStatus::Granted);
        self
    }

    /// The user declines the permission prompt
    pub fn denying(self) -> Self {
        self.update(|inner| inner.grant_on_request = false);
        self
    }

    /// Host without a notification service (e.g. not a physical device)
    pub fn incapable(self) -> Self {
        self.update(|inner| inner.capable = false);
        self
    }

    /// Make every `schedule` call fail with a host error
    pub fn failing_schedules(self) -> Self {
        self.update(|inner| inner.fail_scheduling = true);
        self
    }

    /// Make `schedule` take `delay` before it answers
    pub fn slow_schedules(self, delay: Duration) -> Self {
        self.update(|inner| inner.schedule_delay = Some(delay));
        self
    }

    /// Make `cancel_all_scheduled` fail with a host error from now on
    pub fn fail_cancels(&self, fail: bool) {
        self.update(|inner| inner.fail_cancels = fail);
    }

    fn update(&self, f: impl FnOnce(&mut MemoryInner)) {
        if let Ok(mut inner) = self.inner.lock() {
            f(&mut inner);
        }
    }

    fn read<R: Default>(&self, f: impl FnOnce(&MemoryInner) -> R) -> R {
        self.inner.lock().map(|inner| f(&inner)).unwrap_or_default()
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, NotificationError> {
        self.inner
            .lock()
            .map_err(|e| NotificationError::Host(format!("in-memory host lock poisoned: {}", e)))
    }

    /// Number of notifications queued and not yet delivered or cancelled
    pub fn pending_count(&self) -> usize {
        self.read(|inner| inner.pending.len())
    }

    /// The most recent notifications handed to `schedule`, oldest first
    pub fn scheduled(&self) -> Vec<ScheduleRecord> {
        self.read(|inner| inner.scheduled.iter().cloned().collect())
    }

    /// Ids of the most recent notifications that fired
    pub fn delivered(&self) -> Vec<NotificationId> {
        self.read(|inner| inner.delivered.iter().cloned().collect())
    }

    /// Badge count, raised per delivery when the handler policy sets badges
    pub fn badge_count(&self) -> u64 {
        self.read(|inner| inner.badge)
    }

    pub fn cancel_calls(&self) -> usize {
        self.read(|inner| inner.cancel_calls)
    }

    pub fn permission_requests(&self) -> usize {
        self.read(|inner| inner.permission_requests)
    }

    pub fn handler_policy(&self) -> Option<HandlerPolicy> {
        self.read(|inner| inner.policy)
    }

    pub fn channels(&self) -> Vec<NotificationChannel> {
        self.read(|inner| inner.channels.clone())
    }

    /// Simulate the user tapping a delivered notification
    pub fn respond(&self, id: NotificationId, action: impl Into<String>) {
        let response = NotificationResponse {
            id,
            action: action.into(),
        };
        if self.response_tx.send(response).is_err() {
            debug!("No listener attached for notification responses");
        }
    }
}

#[async_trait]
impl NotificationHost for InMemoryHost {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn is_capable(&self) -> bool {
        self.read(|inner| inner.capable)
    }

    fn set_handler_policy(&self, policy: HandlerPolicy) {
        self.update(|inner| inner.policy = Some(policy));
    }

    async fn permission_status(&self) -> Result<PermissionStatus, NotificationError> {
        Ok(self.locked()?.status)
    }

    async fn request_permission(&self) -> Result<PermissionStatus, NotificationError> {
        let mut inner = self.locked()?;
        inner.permission_requests += 1;
        inner.status = if inner.grant_on_request {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        Ok(inner.status)
    }

    async fn push_token(&self) -> Result<String, NotificationError> {
        Ok(format!("LocalPushToken[{}]", uuid::Uuid::new_v4()))
    }

    fn supports_channels(&self) -> bool {
        true
    }

    async fn ensure_channel(&self, channel: &NotificationChannel) -> Result<(), NotificationError> {
        let mut inner = self.locked()?;
        inner.channels.retain(|existing| existing.id != channel.id);
        inner.channels.push(channel.clone());
        Ok(())
    }

    async fn schedule(
        &self,
        content: NotificationContent,
        after: Duration,
    ) -> Result<NotificationId, NotificationError> {
        let delay = self.locked()?.schedule_delay;
        if let Some(delay) = delay {
            sleep(delay).await;
        }

        let mut inner = self.locked()?;
        if inner.fail_scheduling {
            return Err(NotificationError::Host("scheduling rejected by host".to_string()));
        }

        let id = NotificationId::generate();
        push_bounded(
            &mut inner.scheduled,
            ScheduleRecord {
                id: id.clone(),
                content: content.clone(),
                after,
            },
        );

        let shared = Arc::clone(&self.inner);
        let received_tx = self.received_tx.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            sleep(after).await;
            if let Ok(mut inner) = shared.lock() {
                inner.pending.remove(&task_id);
                push_bounded(&mut inner.delivered, task_id.clone());
                if inner.policy.is_some_and(|policy| policy.set_badge) {
                    inner.badge += 1;
                }
            }
            info!(id = %task_id, "{}: {}", content.title, content.body);
            let delivered = DeliveredNotification {
                id: task_id,
                content,
                delivered_at: Utc::now(),
            };
            if received_tx.send(delivered).is_err() {
                debug!("No listener attached for received notifications");
            }
        });
        inner.pending.insert(id.clone(), handle);

        debug!(id = %id, after_secs = after.as_secs(), "Notification queued in memory");
        Ok(id)
    }

    async fn cancel_all_scheduled(&self) -> Result<(), NotificationError> {
        let mut inner = self.locked()?;
        inner.cancel_calls += 1;
        if inner.fail_cancels {
            return Err(NotificationError::Host("cancellation rejected by host".to_string()));
        }
        for (id, handle) in inner.pending.drain() {
            handle.abort();
            debug!(id = %id, "Cancelled in-memory notification");
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
