//! Timer controller: countdown state, the one-second tick source and the
//! coordination with the notification gateway.

use std::{
    num::NonZeroU32,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::Serialize;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::TimerError,
    notifications::NotificationGateway,
    state::{parse_minutes, Notice, NotificationId, ScheduledNotification, TimerState},
    tasks::countdown_task,
};

/// Point-in-time view of the controller, including its resources
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub timer: TimerState,
    /// Live tick sources; never more than one
    pub active_tick_sources: usize,
    pub scheduled: Option<ScheduledNotification>,
    /// How many times a tick source has been torn down
    pub tick_sources_cleared: u64,
}

/// What a tick did to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    Completed,
    /// The tick source is no longer the live one
    Stale,
}

#[derive(Debug)]
struct Ticker {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct ControllerInner {
    timer: TimerState,
    ticker: Option<Ticker>,
    generation: u64,
    tick_sources_cleared: u64,
    completion: Option<NotificationId>,
}

/// State shared between the controller and its tick task
pub(crate) struct ControllerShared {
    inner: Mutex<ControllerInner>,
    gateway: Arc<NotificationGateway>,
    timer_update_tx: watch::Sender<TimerState>,
    /// Keep the receiver alive to prevent channel closure
    _timer_update_rx: watch::Receiver<TimerState>,
}

impl ControllerShared {
    fn lock(&self) -> Result<MutexGuard<'_, ControllerInner>, TimerError> {
        self.inner.lock().map_err(|_| TimerError::StatePoisoned)
    }

    fn publish(&self, state: TimerState) {
        if let Err(e) = self.timer_update_tx.send(state) {
            warn!("Failed to send timer update: {}", e);
        }
    }

    /// Start counting from the full duration with a fresh tick source
    fn begin(
        self: &Arc<Self>,
        duration_seconds: u64,
        completion: Option<NotificationId>,
    ) -> Result<TimerState, TimerError> {
        let mut inner = self.lock()?;

        if let Some(stale) = inner.ticker.take() {
            warn!(generation = stale.generation, "Clearing leftover tick source");
            stale.handle.abort();
            inner.tick_sources_cleared += 1;
        }

        inner.generation += 1;
        let generation = inner.generation;
        inner.timer.begin(duration_seconds);
        inner.completion = completion;

        let handle = tokio::spawn(countdown_task(Arc::clone(self), generation));
        inner.ticker = Some(Ticker { generation, handle });

        let state = inner.timer.clone();
        drop(inner);

        self.publish(state.clone());
        Ok(state)
    }

    /// Manual stop: freeze the countdown and clear the tick source.
    /// Returns `None` when the timer was not running.
    fn halt(&self) -> Result<Option<TimerState>, TimerError> {
        let mut inner = self.lock()?;
        if !inner.timer.running {
            return Ok(None);
        }

        if let Some(ticker) = inner.ticker.take() {
            ticker.handle.abort();
            inner.tick_sources_cleared += 1;
        }
        inner.timer.halt();
        inner.completion = None;

        let state = inner.timer.clone();
        drop(inner);

        self.publish(state.clone());
        Ok(Some(state))
    }

    /// Tick handler for the tick source identified by `generation`
    pub(crate) fn on_tick(&self, generation: u64) -> TickOutcome {
        let mut inner = match self.lock() {
            Ok(inner) => inner,
            Err(e) => {
                error!("Dropping tick: {}", e);
                return TickOutcome::Stale;
            }
        };

        if inner.ticker.as_ref().map(|t| t.generation) != Some(generation) {
            return TickOutcome::Stale;
        }

        let completed = inner.timer.tick();
        let completion = if completed {
            // The tick task ends on its own; dropping the handle detaches it
            inner.ticker = None;
            inner.tick_sources_cleared += 1;
            inner.completion.take()
        } else {
            None
        };

        let state = inner.timer.clone();
        drop(inner);

        self.publish(state);

        if !completed {
            return TickOutcome::Continue;
        }

        // Natural completion: the notification is firing now, so it is
        // released rather than cancelled.
        if let Some(id) = completion {
            self.gateway.complete(&id);
        }
        info!("Timer finished");
        TickOutcome::Completed
    }
}

/// Drives the countdown and keeps the scheduled notification in step with it
pub struct TimerController {
    shared: Arc<ControllerShared>,
    /// Serializes start/stop/shutdown
    transaction: tokio::sync::Mutex<()>,
    notice_tx: broadcast::Sender<Notice>,
}

impl TimerController {
    pub fn new(gateway: Arc<NotificationGateway>, minutes: NonZeroU32) -> Self {
        let timer = TimerState::new(minutes);
        let (timer_update_tx, timer_update_rx) = watch::channel(timer.clone());
        let (notice_tx, _) = broadcast::channel(32);

        Self {
            shared: Arc::new(ControllerShared {
                inner: Mutex::new(ControllerInner {
                    timer,
                    ticker: None,
                    generation: 0,
                    tick_sources_cleared: 0,
                    completion: None,
                }),
                gateway,
                timer_update_tx,
                _timer_update_rx: timer_update_rx,
            }),
            transaction: tokio::sync::Mutex::new(()),
            notice_tx,
        }
    }

    /// Current timer state
    pub fn state(&self) -> Result<TimerState, TimerError> {
        Ok(self.shared.lock()?.timer.clone())
    }

    pub fn is_running(&self) -> Result<bool, TimerError> {
        Ok(self.shared.lock()?.timer.running)
    }

    /// Timer state plus the resources currently held
    pub fn snapshot(&self) -> Result<ControllerSnapshot, TimerError> {
        let inner = self.shared.lock()?;
        Ok(ControllerSnapshot {
            timer: inner.timer.clone(),
            active_tick_sources: usize::from(inner.ticker.is_some()),
            scheduled: self.shared.gateway.scheduled(),
            tick_sources_cleared: inner.tick_sources_cleared,
        })
    }

    /// Watch every change to the timer state
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.shared.timer_update_tx.subscribe()
    }

    /// Messages the controller raises on its own (degraded mode, cancel failures)
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    fn notify(&self, notice: Notice) {
        if self.notice_tx.send(notice).is_err() {
            debug!("No notice subscribers");
        }
    }

    /// Set the duration in whole minutes. Rejected while running or while a
    /// start/stop is in flight.
    pub fn set_configured_minutes(&self, minutes: NonZeroU32) -> Result<TimerState, TimerError> {
        let Ok(_transaction) = self.transaction.try_lock() else {
            return Err(TimerError::NotIdle);
        };
        let mut inner = self.shared.lock()?;
        inner.timer.set_configured_minutes(minutes)?;
        let state = inner.timer.clone();
        drop(inner);

        debug!(minutes = minutes.get(), "Configured duration updated");
        self.shared.publish(state.clone());
        Ok(state)
    }

    /// Parse the duration field and apply it
    pub fn set_configured_duration(&self, input: &str) -> Result<TimerState, TimerError> {
        let minutes = parse_minutes(input)?;
        self.set_configured_minutes(minutes)
    }

    /// Schedule the completion notification, then start the tick source.
    pub async fn start(&self) -> Result<TimerState, TimerError> {
        let _transaction = self.transaction.lock().await;

        let configured = {
            let inner = self.shared.lock()?;
            if inner.timer.running {
                return Err(TimerError::AlreadyRunning);
            }
            inner.timer.configured_duration_seconds
        };
        if configured == 0 {
            return Err(TimerError::InvalidDuration("0".to_string()));
        }

        let gateway = &self.shared.gateway;
        let completion = match gateway.schedule_completion(configured).await {
            Ok(scheduled) => Some(scheduled.id),
            Err(e) if e.is_degraded() => {
                warn!("Starting without a completion notification: {}", e);
                self.notify(Notice::Advisory(format!(
                    "{}; the timer will run without a notification",
                    e
                )));
                None
            }
            Err(e) => {
                error!("Failed to schedule completion notification: {}", e);
                return Err(TimerError::Scheduling(e));
            }
        };

        match self.shared.begin(configured, completion) {
            Ok(state) => {
                info!(seconds = configured, "Timer started");
                Ok(state)
            }
            Err(e) => {
                // Roll back the notification so nothing fires for a timer that never ran
                if let Err(cancel) = gateway.cancel_all().await {
                    warn!("Failed to cancel notification during rollback: {}", cancel);
                }
                Err(e)
            }
        }
    }

    /// Freeze the countdown and cancel pending notifications. No-op when idle.
    pub async fn stop(&self) -> Result<TimerState, TimerError> {
        let _transaction = self.transaction.lock().await;

        let Some(state) = self.shared.halt()? else {
            debug!("Stop requested while idle");
            return self.state();
        };

        if let Err(e) = self.shared.gateway.cancel_all().await {
            warn!("Failed to cancel scheduled notifications: {}", e);
            self.notify(Notice::Advisory(format!(
                "The timer stopped but its notification may still fire: {}",
                e
            )));
        }

        info!(remaining = %state.display(), "Timer stopped");
        Ok(state)
    }

    /// Single entry point behind the start/stop button
    pub async fn toggle(&self, input: &str) -> Result<TimerState, TimerError> {
        if self.is_running()? {
            return self.stop().await;
        }
        self.set_configured_duration(input)?;
        self.start().await
    }

    /// Tear down before the screen goes away: clear the tick source and
    /// request cancellation of any pending notification.
    pub async fn shutdown(&self) {
        let _transaction = self.transaction.lock().await;

        match self.shared.halt() {
            Ok(Some(state)) => info!(remaining = %state.display(), "Timer halted for shutdown"),
            Ok(None) => {}
            Err(e) => error!("Failed to halt timer during shutdown: {}", e),
        }

        if let Err(e) = self.shared.gateway.cancel_all().await {
            warn!("Failed to cancel notifications during shutdown: {}", e);
        }
    }
}

impl Drop for TimerController {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.shared.inner.lock() {
            if let Some(ticker) = inner.ticker.take() {
                ticker.handle.abort();
                inner.tick_sources_cleared += 1;
                debug!("Tick source aborted on drop");
            }
        }
    }
}
