//! Passive notification listeners
//!
//! Two independent observers: one for notifications delivered while the app
//! is in the foreground, one for user responses. Both only log and count.

use std::sync::{atomic::Ordering, Arc};

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    notifications::{NotificationHost, ObservedEvents},
    state::{DeliveredNotification, NotificationResponse},
};

/// Keeps the listener tasks alive; dropping it detaches them
#[derive(Debug)]
pub struct ListenerGuard {
    handles: Vec<JoinHandle<()>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        debug!("Notification listener tasks aborted");
    }
}

/// Attach both listeners to the host's event channels
pub fn spawn_listeners(host: &dyn NotificationHost, observed: Arc<ObservedEvents>) -> ListenerGuard {
    let received = tokio::spawn(received_listener_task(
        host.received_events(),
        Arc::clone(&observed),
    ));
    let responded = tokio::spawn(response_listener_task(host.response_events(), observed));
    debug!(host = host.name(), "Notification listeners attached");

    ListenerGuard {
        handles: vec![received, responded],
    }
}

async fn received_listener_task(
    mut rx: broadcast::Receiver<DeliveredNotification>,
    observed: Arc<ObservedEvents>,
) {
    loop {
        match rx.recv().await {
            Ok(notification) => {
                observed.received.fetch_add(1, Ordering::SeqCst);
                info!(
                    id = %notification.id,
                    timer_finished = notification.content.is_timer_finished(),
                    "Notification received in foreground"
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Received-notification listener skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn response_listener_task(
    mut rx: broadcast::Receiver<NotificationResponse>,
    observed: Arc<ObservedEvents>,
) {
    loop {
        match rx.recv().await {
            Ok(response) => {
                observed.responded.fetch_add(1, Ordering::SeqCst);
                info!(id = %response.id, action = %response.action, "Notification response");
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Notification response listener skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
