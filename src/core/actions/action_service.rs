// Moderation action engine.
//
// Applies hide/show/delete/restore to a content item's moderation
// projection. The store captures before/after snapshots and appends the
// audit entry inside the same atomic operation as the state write, so the
// log can never disagree with the projection history.

use crate::core::actions::{AppliedAction, ApplyAction, ModerationAction, ModerationState};
use crate::core::config::ModerationConfig;
use crate::core::content::{require_content, require_discussion, ContentGateway};
use crate::core::error::{ModResult, ModerationError};
use crate::core::identity::{require_admin_or_owner, Caller};
use crate::core::ids::ContentId;
use crate::core::notify::{notify_user_best_effort, Notification, Notifier};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for content moderation projections.
#[async_trait]
pub trait ModerationStateStore: Send + Sync {
    /// The stored projection, if the content was ever moderated.
    async fn moderation_state(&self, content_id: &ContentId) -> ModResult<Option<ModerationState>>;

    /// Applies one action atomically: loads or creates the projection,
    /// mutates it, and appends the log entry with before/after snapshots.
    /// Re-applying an action the state already reflects still appends an
    /// entry (before equals after).
    async fn apply_action(&self, apply: &ApplyAction) -> ModResult<AppliedAction>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Content action application with permission checks and author
/// notification.
pub struct ActionService<S, C, N> {
    store: Arc<S>,
    gateway: Arc<C>,
    notifier: Arc<N>,
    config: ModerationConfig,
}

impl<S, C, N> ActionService<S, C, N>
where
    S: ModerationStateStore,
    C: ContentGateway,
    N: Notifier,
{
    pub fn new(
        store: Arc<S>,
        gateway: Arc<C>,
        notifier: Arc<N>,
        config: ModerationConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            config,
        }
    }

    /// Applies one action. Allowed for admins and for the owner of the
    /// content's parent discussion.
    pub async fn moderate(
        &self,
        caller: &Caller,
        content_id: &ContentId,
        action: ModerationAction,
        reason: Option<String>,
    ) -> ModResult<AppliedAction> {
        if let Some(reason) = &reason {
            if reason.chars().count() > self.config.max_reason_chars {
                return Err(ModerationError::Validation(format!(
                    "reason exceeds {} characters",
                    self.config.max_reason_chars
                )));
            }
        }

        let content = require_content(&*self.gateway, content_id).await?;
        if !caller.is_admin() {
            let discussion = require_discussion(&*self.gateway, &content.discussion_id).await?;
            require_admin_or_owner(caller, &discussion.owner_id)?;
        }

        let applied = self
            .store
            .apply_action(&ApplyAction {
                content_id: content.id.clone(),
                discussion_id: content.discussion_id.clone(),
                author_id: Some(content.author_id.clone()),
                moderator_id: caller.user_id.clone(),
                action,
                reason: reason.clone(),
                at: Utc::now(),
            })
            .await?;

        tracing::info!(
            content_id = %content.id,
            action = %action,
            moderator = %caller.user_id,
            is_hidden = applied.state.is_hidden,
            is_deleted = applied.state.is_deleted,
            "moderation action applied"
        );

        // Authors are told about actions on their content, unless they are
        // the acting moderator. Delivery failure never unwinds the action.
        if content.author_id != caller.user_id {
            notify_user_best_effort(
                &*self.notifier,
                &self.config,
                &content.author_id,
                &Notification::ContentModerated {
                    content_id: content.id.clone(),
                    action,
                    reason,
                },
            )
            .await;
        }

        Ok(applied)
    }

    /// The projection for one content item; `None` means never moderated
    /// and therefore fully visible.
    pub async fn state(&self, content_id: &ContentId) -> ModResult<Option<ModerationState>> {
        self.store.moderation_state(content_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
