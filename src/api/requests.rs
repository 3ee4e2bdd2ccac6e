// Request and response shapes for the moderation surface.
//
// These are the types an embedding server deserializes request bodies into
// and serializes responses from. Validation beyond shape (closed enums,
// presence) lives in the services; nothing here touches storage.

use crate::core::actions::{AppliedAction, ModerationAction};
use crate::core::ids::{ContentId, DiscussionId, UserId};
use crate::core::queue::{Priority, QueueItem, QueueStatus};
use crate::core::reports::{Report, ReportCategory};
use crate::core::sanctions::{Sanction, SanctionType};
use serde::{Deserialize, Serialize};

/// Body for filing a report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitReportRequest {
    pub content_id: ContentId,
    /// Unknown categories deserialize to `other`.
    pub category: ReportCategory,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReportResponse {
    pub report: Report,
    pub queue_item: QueueItem,
}

/// Body for applying a content action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModerateContentRequest {
    pub action: ModerationAction,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Queue listing filters. All optional and conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueueListParams {
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<QueueStatus>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Body for claiming or releasing a queue item. A present `moderator_id`
/// assigns the item to that moderator; an absent one releases it back to
/// pending.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub moderator_id: Option<UserId>,
}

/// Sanction issued as part of a report review. The target is always the
/// reported content's author, so no user id is accepted here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewSanction {
    pub sanction_type: SanctionType,
    pub reason: String,
    #[serde(default)]
    pub duration_hours: Option<i64>,
}

/// Body for reviewing a report, with optional follow-up steps: a content
/// action and a sanction against the author.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewReportRequest {
    pub resolution: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub action: Option<ModerationAction>,
    #[serde(default)]
    pub sanction: Option<ReviewSanction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewReportResponse {
    pub report: Report,
    /// The report's queue item, when one still existed to resolve.
    pub queue_item: Option<QueueItem>,
    /// Present when the review carried a content action.
    pub action: Option<AppliedAction>,
    /// Present when the review sanctioned the author.
    pub sanction: Option<Sanction>,
}

/// Body for dry-running a rule against arbitrary text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestRuleRequest {
    pub content: String,
}

/// Reviewer verdict about one rule match.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleFeedbackRequest {
    #[serde(default)]
    pub content_id: Option<ContentId>,
    pub was_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RevokeSanctionRequest {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppealRequest {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewAppealRequest {
    pub approved: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Moderation log listing filters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModLogParams {
    #[serde(default)]
    pub content_id: Option<ContentId>,
    #[serde(default)]
    pub discussion_id: Option<DiscussionId>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}
