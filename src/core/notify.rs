// Outbound notifications.
//
// Delivery is best effort. Failures are retried with exponential backoff,
// then logged and dropped; they never roll back the moderation write that
// triggered them.

use crate::core::actions::ModerationAction;
use crate::core::config::ModerationConfig;
use crate::core::error::ModResult;
use crate::core::ids::{ContentId, ReportId, SanctionId, UserId};
use crate::core::queue::Priority;
use crate::core::sanctions::SanctionType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Everything the subsystem tells users or the moderator team about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Sent to a content author when their content is actioned.
    ContentModerated {
        content_id: ContentId,
        action: ModerationAction,
        reason: Option<String>,
    },
    /// Sent to the moderator team when an urgent report lands.
    ReportFiled {
        report_id: ReportId,
        content_id: ContentId,
        priority: Priority,
    },
    /// Sent to the sanctioned user.
    SanctionIssued {
        sanction_id: SanctionId,
        sanction_type: SanctionType,
        reason: String,
        ends_at: Option<DateTime<Utc>>,
    },
    /// Sent to the sanctioned user when an admin lifts the sanction.
    SanctionRevoked {
        sanction_id: SanctionId,
        reason: String,
    },
    /// Sent to the moderator team when a user appeals.
    AppealFiled {
        sanction_id: SanctionId,
        user_id: UserId,
    },
    /// Sent to the appellant once the appeal is decided.
    AppealDecided {
        sanction_id: SanctionId,
        approved: bool,
        notes: Option<String>,
    },
}

/// Delivery port. Implementations talk to whatever the platform uses for
/// user messaging and the moderator channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, user_id: &UserId, notification: &Notification) -> ModResult<()>;
    async fn notify_moderators(&self, notification: &Notification) -> ModResult<()>;
}

/// Delivers to one user, retrying per config, swallowing final failure.
pub async fn notify_user_best_effort<N>(
    notifier: &N,
    config: &ModerationConfig,
    user_id: &UserId,
    notification: &Notification,
) where
    N: Notifier + ?Sized,
{
    let attempts = config.notify_max_attempts.max(1);
    for attempt in 1..=attempts {
        match notifier.notify_user(user_id, notification).await {
            Ok(()) => return,
            Err(err) if attempt == attempts => {
                tracing::warn!(
                    user_id = %user_id,
                    attempt,
                    error = %err,
                    "dropping user notification after final delivery attempt"
                );
            }
            Err(err) => {
                let delay = backoff_delay(config, attempt);
                tracing::debug!(
                    user_id = %user_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "user notification attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Delivers to the moderator channel, retrying per config, swallowing final
/// failure.
pub async fn notify_moderators_best_effort<N>(
    notifier: &N,
    config: &ModerationConfig,
    notification: &Notification,
) where
    N: Notifier + ?Sized,
{
    let attempts = config.notify_max_attempts.max(1);
    for attempt in 1..=attempts {
        match notifier.notify_moderators(notification).await {
            Ok(()) => return,
            Err(err) if attempt == attempts => {
                tracing::warn!(
                    attempt,
                    error = %err,
                    "dropping moderator notification after final delivery attempt"
                );
            }
            Err(err) => {
                let delay = backoff_delay(config, attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "moderator notification attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(config: &ModerationConfig, attempt: u32) -> Duration {
    // Doubles per attempt: base, 2x base, 4x base, capped at 16 doublings.
    let factor = 1u64 << (attempt - 1).min(16);
    Duration::from_millis(config.notify_backoff_ms.saturating_mul(factor))
}
