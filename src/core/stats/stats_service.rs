// Derived-read statistics. Nothing here mutates state.

use crate::core::audit::{ModLogQuery, ModLogStore};
use crate::core::error::ModResult;
use crate::core::identity::{require_moderator, Caller};
use crate::core::stats::{
    ModerationOverview, QueueCounts, QueueDepth, ReportCounts, RuleCounts, SanctionCount,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// How many recent log entries the overview carries.
const RECENT_ACTIONS: u32 = 10;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Aggregate counts over the stored entities.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn report_counts(&self) -> ModResult<ReportCounts>;

    async fn queue_counts(&self) -> ModResult<QueueCounts>;

    /// Pending backlog per priority bucket, urgent first.
    async fn queue_depths(&self) -> ModResult<Vec<QueueDepth>>;

    /// Active sanction counts per type, evaluated lazily against `now`.
    async fn active_sanction_counts(&self, now: DateTime<Utc>) -> ModResult<Vec<SanctionCount>>;

    async fn rule_counts(&self) -> ModResult<RuleCounts>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Dashboard reads for moderation staff.
pub struct StatsService<S> {
    store: Arc<S>,
}

impl<S: StatsStore + ModLogStore> StatsService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn overview(&self, caller: &Caller) -> ModResult<ModerationOverview> {
        require_moderator(caller)?;
        let now = Utc::now();
        let reports = self.store.report_counts().await?;
        let queue = self.store.queue_counts().await?;
        let queue_depths = self.store.queue_depths().await?;
        let active_sanctions = self.store.active_sanction_counts(now).await?;
        let rules = self.store.rule_counts().await?;
        let recent_actions = self
            .store
            .log_entries(&ModLogQuery {
                limit: RECENT_ACTIONS,
                ..ModLogQuery::default()
            })
            .await?;

        Ok(ModerationOverview {
            reports,
            queue,
            queue_depths,
            active_sanctions,
            rules,
            recent_actions,
            generated_at: now,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
