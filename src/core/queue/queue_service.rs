// Moderation queue.
//
// Items move pending -> in_review -> resolved, with unassign stepping back
// to pending. All transitions are conditional writes in the store: two
// moderators racing for the same item produce exactly one winner and one
// conflict, never a silent overwrite.

use crate::core::config::ModerationConfig;
use crate::core::error::{ModResult, ModerationError};
use crate::core::identity::{require_moderator, Caller};
use crate::core::ids::{QueueItemId, ReportId, UserId};
use crate::core::queue::{Priority, QueueItem, QueuePage, QueueQuery, QueueStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for queue items.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn insert_item(&self, item: &QueueItem) -> ModResult<()>;

    async fn queue_item(&self, id: &QueueItemId) -> ModResult<Option<QueueItem>>;

    /// Conditionally moves pending -> in_review and records the assignee.
    /// Conflict if the item is already assigned or resolved.
    async fn assign_item(
        &self,
        id: &QueueItemId,
        moderator_id: &UserId,
        assigned_by: &UserId,
        at: DateTime<Utc>,
    ) -> ModResult<QueueItem>;

    /// Conditionally moves in_review -> pending and clears assignee fields.
    /// Conflict if the item is not in review.
    async fn unassign_item(&self, id: &QueueItemId) -> ModResult<QueueItem>;

    /// Conditionally moves any unresolved item -> resolved.
    /// Conflict if already resolved.
    async fn resolve_item(
        &self,
        id: &QueueItemId,
        resolved_by: &UserId,
        at: DateTime<Utc>,
    ) -> ModResult<QueueItem>;

    /// Resolves the item created for a report, if one exists and is still
    /// unresolved. Used by report review; absent or already-resolved items
    /// are not an error there.
    async fn resolve_item_for_report(
        &self,
        report_id: &ReportId,
        resolved_by: &UserId,
        at: DateTime<Utc>,
    ) -> ModResult<Option<QueueItem>>;

    /// One page of items: urgent buckets first, newest first within a
    /// bucket.
    async fn list_items(&self, query: &QueueQuery) -> ModResult<QueuePage>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Queue triage operations, all restricted to moderation staff.
pub struct QueueService<S> {
    store: Arc<S>,
    config: ModerationConfig,
}

impl<S: QueueStore> QueueService<S> {
    pub fn new(store: Arc<S>, config: ModerationConfig) -> Self {
        Self { store, config }
    }

    /// Claims an item for a moderator. The caller may assign someone else
    /// (lead handing out work) or themselves.
    pub async fn assign(
        &self,
        caller: &Caller,
        item_id: &QueueItemId,
        moderator_id: &UserId,
    ) -> ModResult<QueueItem> {
        require_moderator(caller)?;
        let item = self
            .store
            .assign_item(item_id, moderator_id, &caller.user_id, Utc::now())
            .await?;
        tracing::info!(
            item_id = %item.id,
            assigned_to = %moderator_id,
            assigned_by = %caller.user_id,
            "queue item assigned"
        );
        Ok(item)
    }

    /// Releases an in-review item back to pending.
    pub async fn unassign(&self, caller: &Caller, item_id: &QueueItemId) -> ModResult<QueueItem> {
        require_moderator(caller)?;
        let item = self.store.unassign_item(item_id).await?;
        tracing::info!(item_id = %item.id, by = %caller.user_id, "queue item unassigned");
        Ok(item)
    }

    /// Marks an item resolved. Report-backed items normally resolve through
    /// report review; this is the path for automated items.
    pub async fn resolve(&self, caller: &Caller, item_id: &QueueItemId) -> ModResult<QueueItem> {
        require_moderator(caller)?;
        let item = self
            .store
            .resolve_item(item_id, &caller.user_id, Utc::now())
            .await?;
        tracing::info!(item_id = %item.id, by = %caller.user_id, "queue item resolved");
        Ok(item)
    }

    pub async fn get(&self, caller: &Caller, item_id: &QueueItemId) -> ModResult<QueueItem> {
        require_moderator(caller)?;
        self.store
            .queue_item(item_id)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("queue item {item_id}")))
    }

    pub async fn list(
        &self,
        caller: &Caller,
        priority: Option<Priority>,
        status: Option<QueueStatus>,
        assigned_to: Option<UserId>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ModResult<QueuePage> {
        require_moderator(caller)?;
        let query = QueueQuery {
            priority,
            status,
            assigned_to,
            limit: self.config.clamp_page_size(limit),
            offset: offset.unwrap_or(0),
        };
        self.store.list_items(&query).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
