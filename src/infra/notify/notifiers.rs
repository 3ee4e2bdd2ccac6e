// Notifier implementations.
//
// TracingNotifier is the default sink when no messaging client is wired in;
// RecordingNotifier captures deliveries so tests can assert on them.

use crate::core::error::ModResult;
use crate::core::ids::UserId;
use crate::core::notify::{Notification, Notifier};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Logs every delivery instead of sending it anywhere.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify_user(&self, user_id: &UserId, notification: &Notification) -> ModResult<()> {
        tracing::info!(user_id = %user_id, ?notification, "user notification");
        Ok(())
    }

    async fn notify_moderators(&self, notification: &Notification) -> ModResult<()> {
        tracing::info!(?notification, "moderator notification");
        Ok(())
    }
}

/// Records deliveries in memory for test assertions.
pub struct RecordingNotifier {
    user: Mutex<Vec<(UserId, Notification)>>,
    moderators: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            user: Mutex::new(Vec::new()),
            moderators: Mutex::new(Vec::new()),
        }
    }

    /// Everything delivered to individual users, in delivery order.
    pub async fn user_notifications(&self) -> Vec<(UserId, Notification)> {
        self.user.lock().await.clone()
    }

    /// Everything delivered to the moderator channel, in delivery order.
    pub async fn moderator_notifications(&self) -> Vec<Notification> {
        self.moderators.lock().await.clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_user(&self, user_id: &UserId, notification: &Notification) -> ModResult<()> {
        self.user
            .lock()
            .await
            .push((user_id.clone(), notification.clone()));
        Ok(())
    }

    async fn notify_moderators(&self, notification: &Notification) -> ModResult<()> {
        self.moderators.lock().await.push(notification.clone());
        Ok(())
    }
}
