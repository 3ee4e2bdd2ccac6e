use crate::core::ids::{ContentId, DiscussionId, LogEntryId, SanctionId, UserId};
use crate::core::sanctions::AppealStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action recorded in the moderation log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Hide,
    Show,
    Delete,
    Restore,
    Warn,
    Suspend,
    Ban,
    RevokeSanction,
    AppealApproved,
    AppealDenied,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hide => "hide",
            Self::Show => "show",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::Warn => "warn",
            Self::Suspend => "suspend",
            Self::Ban => "ban",
            Self::RevokeSanction => "revoke_sanction",
            Self::AppealApproved => "appeal_approved",
            Self::AppealDenied => "appeal_denied",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "hide" => Some(Self::Hide),
            "show" => Some(Self::Show),
            "delete" => Some(Self::Delete),
            "restore" => Some(Self::Restore),
            "warn" => Some(Self::Warn),
            "suspend" => Some(Self::Suspend),
            "ban" => Some(Self::Ban),
            "revoke_sanction" => Some(Self::RevokeSanction),
            "appeal_approved" => Some(Self::AppealApproved),
            "appeal_denied" => Some(Self::AppealDenied),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Before/after state captured around a logged mutation. Only the states
/// this subsystem actually mutates are representable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateSnapshot {
    Content {
        is_hidden: bool,
        is_deleted: bool,
    },
    Sanction {
        is_active: bool,
        appeal_status: Option<AppealStatus>,
    },
}

/// Append-only audit record. `seq` is assigned by the store and is strictly
/// increasing in the order mutations of the same entity were applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationLogEntry {
    pub id: LogEntryId,
    pub seq: i64,
    pub content_id: Option<ContentId>,
    pub discussion_id: Option<DiscussionId>,
    pub sanction_id: Option<SanctionId>,
    /// The user the action is about (content author or sanctioned user).
    pub subject_user_id: Option<UserId>,
    pub moderator_id: UserId,
    pub action: LogAction,
    pub reason: Option<String>,
    pub before: StateSnapshot,
    pub after: StateSnapshot,
    pub created_at: DateTime<Utc>,
}

/// Log entry awaiting its store-assigned sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub content_id: Option<ContentId>,
    pub discussion_id: Option<DiscussionId>,
    pub sanction_id: Option<SanctionId>,
    pub subject_user_id: Option<UserId>,
    pub moderator_id: UserId,
    pub action: LogAction,
    pub reason: Option<String>,
    pub before: StateSnapshot,
    pub after: StateSnapshot,
    pub created_at: DateTime<Utc>,
}

impl NewLogEntry {
    /// Entry for a content-level action.
    pub fn content_action(
        content_id: ContentId,
        discussion_id: DiscussionId,
        subject_user_id: Option<UserId>,
        moderator_id: UserId,
        action: LogAction,
        reason: Option<String>,
        before: StateSnapshot,
        after: StateSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            content_id: Some(content_id),
            discussion_id: Some(discussion_id),
            sanction_id: None,
            subject_user_id,
            moderator_id,
            action,
            reason,
            before,
            after,
            created_at: now,
        }
    }

    /// Entry for a sanction lifecycle event.
    pub fn sanction_action(
        sanction_id: SanctionId,
        subject_user_id: UserId,
        content_id: Option<ContentId>,
        moderator_id: UserId,
        action: LogAction,
        reason: Option<String>,
        before: StateSnapshot,
        after: StateSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            content_id,
            discussion_id: None,
            sanction_id: Some(sanction_id),
            subject_user_id: Some(subject_user_id),
            moderator_id,
            action,
            reason,
            before,
            after,
            created_at: now,
        }
    }

    /// Finalizes the entry with the sequence number the store assigned.
    pub fn into_entry(self, seq: i64) -> ModerationLogEntry {
        ModerationLogEntry {
            id: LogEntryId::new(),
            seq,
            content_id: self.content_id,
            discussion_id: self.discussion_id,
            sanction_id: self.sanction_id,
            subject_user_id: self.subject_user_id,
            moderator_id: self.moderator_id,
            action: self.action,
            reason: self.reason,
            before: self.before,
            after: self.after,
            created_at: self.created_at,
        }
    }
}

/// Filter for reading the log. All fields are conjunctive; `offset` skips
/// that many newest-first entries before `limit` applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModLogQuery {
    pub content_id: Option<ContentId>,
    pub discussion_id: Option<DiscussionId>,
    pub limit: u32,
    pub offset: u32,
}
