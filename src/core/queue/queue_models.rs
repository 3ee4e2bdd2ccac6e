use crate::core::ids::{ContentId, DiscussionId, QueueItemId, ReportId, RuleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority bucket. Declaration order gives `Low < Medium < High < Urgent`,
/// which the queue ordering and filter severities rely on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Numeric rank used for persisted ordering. Higher sorts first.
    pub fn rank(&self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    pub fn all() -> [Priority; 4] {
        [Self::Low, Self::Medium, Self::High, Self::Urgent]
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    InReview,
    Resolved,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InReview => "in_review",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_review" => Some(Self::InReview),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the item got into the queue.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueSource {
    /// Filed by a user report.
    Report,
    /// Enqueued by an automated filter rule.
    Automated,
}

impl QueueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Automated => "automated",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "report" => Some(Self::Report),
            "automated" => Some(Self::Automated),
            _ => None,
        }
    }
}

/// One unit of moderator work.
///
/// Items are ordered urgent-first; within a priority bucket, newest first.
/// At most one moderator holds an item at a time; the pending -> in_review
/// -> resolved transitions are enforced with conditional writes in the
/// stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    /// Present when the item was created by a report.
    pub report_id: Option<ReportId>,
    pub content_id: ContentId,
    pub discussion_id: DiscussionId,
    pub priority: Priority,
    pub status: QueueStatus,
    pub source: QueueSource,
    /// Present when an automated filter rule enqueued the item.
    pub rule_id: Option<RuleId>,
    /// Short excerpt of the content so moderators can triage from the list.
    pub preview: String,
    pub is_urgent: bool,
    pub assigned_to: Option<UserId>,
    pub assigned_by: Option<UserId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl QueueItem {
    /// Item backing a user report.
    pub fn for_report(
        report_id: ReportId,
        content_id: ContentId,
        discussion_id: DiscussionId,
        priority: Priority,
        preview: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: QueueItemId::new(),
            report_id: Some(report_id),
            content_id,
            discussion_id,
            priority,
            status: QueueStatus::Pending,
            source: QueueSource::Report,
            rule_id: None,
            preview,
            is_urgent: priority == Priority::Urgent,
            assigned_to: None,
            assigned_by: None,
            assigned_at: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
        }
    }

    /// Item enqueued by a filter rule firing on submitted content.
    pub fn automated(
        rule_id: RuleId,
        content_id: ContentId,
        discussion_id: DiscussionId,
        severity: Priority,
        preview: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: QueueItemId::new(),
            report_id: None,
            content_id,
            discussion_id,
            priority: severity,
            status: QueueStatus::Pending,
            source: QueueSource::Automated,
            rule_id: Some(rule_id),
            preview,
            is_urgent: severity == Priority::Urgent,
            assigned_to: None,
            assigned_by: None,
            assigned_at: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
        }
    }
}

/// Store-level listing filter. All fields are conjunctive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueQuery {
    pub priority: Option<Priority>,
    pub status: Option<QueueStatus>,
    pub assigned_to: Option<UserId>,
    pub limit: u32,
    pub offset: u32,
}

/// One page of queue items plus the total matching count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuePage {
    pub items: Vec<QueueItem>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_matches_ranks() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        for p in Priority::all() {
            for q in Priority::all() {
                assert_eq!(p.cmp(&q), p.rank().cmp(&q.rank()));
            }
        }
    }

    #[test]
    fn priority_strings_round_trip() {
        for p in Priority::all() {
            assert_eq!(Priority::parse_str(p.as_str()), Some(p));
        }
        assert_eq!(Priority::parse_str("critical"), None);
    }

    #[test]
    fn report_items_start_pending_and_flag_urgency() {
        let item = QueueItem::for_report(
            ReportId::new(),
            ContentId::from("c-1"),
            DiscussionId::from("d-1"),
            Priority::Urgent,
            "preview".to_string(),
            Utc::now(),
        );
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.source, QueueSource::Report);
        assert!(item.is_urgent);
        assert!(item.assigned_to.is_none());
    }
}
