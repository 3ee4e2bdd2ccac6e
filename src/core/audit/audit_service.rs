use crate::core::audit::{ModLogQuery, ModerationLogEntry};
use crate::core::config::ModerationConfig;
use crate::core::error::ModResult;
use crate::core::identity::{require_moderator, Caller};
use crate::core::ids::{ContentId, DiscussionId};
use async_trait::async_trait;
use std::sync::Arc;

/// Read port onto the moderation log.
///
/// There is deliberately no append method here. Entries are written by the
/// entity stores inside the same atomic operation as the mutation they
/// describe, so the per-entity ordering guarantee cannot be bypassed.
#[async_trait]
pub trait ModLogStore: Send + Sync {
    /// Entries matching the query, most recent first.
    async fn log_entries(&self, query: &ModLogQuery) -> ModResult<Vec<ModerationLogEntry>>;
}

/// Read access to the audit trail, restricted to moderation staff.
pub struct AuditService<S> {
    store: Arc<S>,
    config: ModerationConfig,
}

impl<S: ModLogStore> AuditService<S> {
    pub fn new(store: Arc<S>, config: ModerationConfig) -> Self {
        Self { store, config }
    }

    pub async fn entries(
        &self,
        caller: &Caller,
        content_id: Option<ContentId>,
        discussion_id: Option<DiscussionId>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ModResult<Vec<ModerationLogEntry>> {
        require_moderator(caller)?;
        let query = ModLogQuery {
            content_id,
            discussion_id,
            limit: self.config.clamp_page_size(limit),
            offset: offset.unwrap_or(0),
        };
        self.store.log_entries(&query).await
    }
}
