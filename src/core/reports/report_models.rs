use crate::core::ids::{ContentId, DiscussionId, ReportId, UserId};
use crate::core::queue::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report categories. Anything a client sends that is not in this list
/// deserializes to `Other` and lands in the low-priority bucket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    HateSpeech,
    Violence,
    Harassment,
    Misinformation,
    Privacy,
    Spam,
    Inappropriate,
    Copyright,
    #[serde(other)]
    Other,
}

impl ReportCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HateSpeech => "hate_speech",
            Self::Violence => "violence",
            Self::Harassment => "harassment",
            Self::Misinformation => "misinformation",
            Self::Privacy => "privacy",
            Self::Spam => "spam",
            Self::Inappropriate => "inappropriate",
            Self::Copyright => "copyright",
            Self::Other => "other",
        }
    }

    /// Unknown strings map to `Other`, mirroring the serde fallback.
    pub fn parse_str(s: &str) -> Self {
        match s {
            "hate_speech" => Self::HateSpeech,
            "violence" => Self::Violence,
            "harassment" => Self::Harassment,
            "misinformation" => Self::Misinformation,
            "privacy" => Self::Privacy,
            "spam" => Self::Spam,
            "inappropriate" => Self::Inappropriate,
            "copyright" => Self::Copyright,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed category to priority table. Pure and total.
pub fn compute_priority(category: ReportCategory) -> Priority {
    match category {
        ReportCategory::HateSpeech | ReportCategory::Violence => Priority::Urgent,
        ReportCategory::Harassment | ReportCategory::Misinformation | ReportCategory::Privacy => {
            Priority::High
        }
        ReportCategory::Spam | ReportCategory::Inappropriate | ReportCategory::Copyright => {
            Priority::Medium
        }
        ReportCategory::Other => Priority::Low,
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "reviewed" => Some(Self::Reviewed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user report about one content item. Created on intake, mutated only by
/// review, never deleted. At most one pending report may exist per
/// (reporter, content) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub content_id: ContentId,
    pub discussion_id: DiscussionId,
    pub reporter_id: UserId,
    pub category: ReportCategory,
    pub reason: String,
    pub priority: Priority,
    pub status: ReportStatus,
    pub resolution: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        content_id: ContentId,
        discussion_id: DiscussionId,
        reporter_id: UserId,
        category: ReportCategory,
        reason: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReportId::new(),
            content_id,
            discussion_id,
            reporter_id,
            category,
            reason,
            priority: compute_priority(category),
            status: ReportStatus::Pending,
            resolution: None,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            created_at: now,
        }
    }
}

/// Review verdict applied to a pending report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportReview {
    pub reviewed_by: UserId,
    pub resolution: String,
    pub notes: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_table_is_deterministic() {
        assert_eq!(compute_priority(ReportCategory::HateSpeech), Priority::Urgent);
        assert_eq!(compute_priority(ReportCategory::Violence), Priority::Urgent);
        assert_eq!(compute_priority(ReportCategory::Harassment), Priority::High);
        assert_eq!(compute_priority(ReportCategory::Misinformation), Priority::High);
        assert_eq!(compute_priority(ReportCategory::Privacy), Priority::High);
        assert_eq!(compute_priority(ReportCategory::Spam), Priority::Medium);
        assert_eq!(compute_priority(ReportCategory::Inappropriate), Priority::Medium);
        assert_eq!(compute_priority(ReportCategory::Copyright), Priority::Medium);
        assert_eq!(compute_priority(ReportCategory::Other), Priority::Low);
        // Same category, same priority, every time.
        assert_eq!(
            compute_priority(ReportCategory::Spam),
            compute_priority(ReportCategory::Spam)
        );
    }

    #[test]
    fn unknown_categories_fall_back_to_other() {
        assert_eq!(ReportCategory::parse_str("gibberish"), ReportCategory::Other);
        let parsed: ReportCategory = serde_json::from_str("\"totally_new\"").unwrap();
        assert_eq!(parsed, ReportCategory::Other);
        assert_eq!(compute_priority(parsed), Priority::Low);
    }

    #[test]
    fn new_reports_start_pending_with_computed_priority() {
        let report = Report::new(
            ContentId::from("c-1"),
            DiscussionId::from("d-1"),
            UserId::from("u-1"),
            ReportCategory::HateSpeech,
            "slurs in the second paragraph".to_string(),
            Utc::now(),
        );
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.priority, Priority::Urgent);
        assert!(report.reviewed_by.is_none());
    }
}
