use crate::core::audit::ModerationLogEntry;
use crate::core::queue::Priority;
use crate::core::sanctions::SanctionType;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    pub pending: u64,
    pub reviewed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: u64,
    pub in_review: u64,
    pub resolved: u64,
}

/// Pending backlog in one priority bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    pub priority: Priority,
    pub count: u64,
}

/// Currently-active sanctions of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SanctionCount {
    pub sanction_type: SanctionType,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuleCounts {
    pub active: u64,
    pub test_mode: u64,
}

/// Dashboard snapshot derived entirely from the other components' state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationOverview {
    pub reports: ReportCounts,
    pub queue: QueueCounts,
    /// Pending items per priority bucket, urgent first.
    pub queue_depths: Vec<QueueDepth>,
    pub active_sanctions: Vec<SanctionCount>,
    pub rules: RuleCounts,
    pub recent_actions: Vec<ModerationLogEntry>,
    pub generated_at: DateTime<Utc>,
}
