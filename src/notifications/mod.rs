//! Notification module
//!
//! `NotificationHost` is the seam to the operating system's notification
//! service. `NotificationGateway` sits on top of a host and owns the
//! permission handshake, the single scheduled completion notification and
//! the passive listeners.

pub mod desktop;
pub mod gateway;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    error::NotificationError,
    state::{
        DeliveredNotification, HandlerPolicy, NotificationChannel, NotificationContent,
        NotificationId, NotificationResponse, PermissionStatus,
    },
};

pub use desktop::DesktopHost;
pub use gateway::{NotificationGateway, ObservedEvents};
pub use memory::InMemoryHost;

/// Interface to the host OS notification service
#[async_trait]
pub trait NotificationHost: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether this host can deliver notifications at all
    async fn is_capable(&self) -> bool;

    /// Presentation policy for notifications delivered in the foreground
    fn set_handler_policy(&self, policy: HandlerPolicy);

    async fn permission_status(&self) -> Result<PermissionStatus, NotificationError>;

    async fn request_permission(&self) -> Result<PermissionStatus, NotificationError>;

    async fn push_token(&self) -> Result<String, NotificationError>;

    /// Whether the host groups notifications into channels
    fn supports_channels(&self) -> bool;

    async fn ensure_channel(&self, channel: &NotificationChannel) -> Result<(), NotificationError>;

    /// Queue a local notification to fire `after` from now
    async fn schedule(
        &self,
        content: NotificationContent,
        after: Duration,
    ) -> Result<NotificationId, NotificationError>;

    /// Drop every pending scheduled notification. Never fails when none are pending.
    async fn cancel_all_scheduled(&self) -> Result<(), NotificationError>;

    /// Notifications delivered while the app is in the foreground
    fn received_events(&self) -> broadcast::Receiver<DeliveredNotification>;

    /// User responses to delivered notifications
    fn response_events(&self) -> broadcast::Receiver<NotificationResponse>;
}
