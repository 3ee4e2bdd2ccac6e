use crate::core::audit::{LogAction, ModerationLogEntry, StateSnapshot};
use crate::core::ids::{ContentId, DiscussionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderator-visible actions on a content item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Hide,
    Show,
    Delete,
    Restore,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hide => "hide",
            Self::Show => "show",
            Self::Delete => "delete",
            Self::Restore => "restore",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "hide" => Some(Self::Hide),
            "show" => Some(Self::Show),
            "delete" => Some(Self::Delete),
            "restore" => Some(Self::Restore),
            _ => None,
        }
    }

    pub fn log_action(&self) -> LogAction {
        match self {
            Self::Hide => LogAction::Hide,
            Self::Show => LogAction::Show,
            Self::Delete => LogAction::Delete,
            Self::Restore => LogAction::Restore,
        }
    }
}

impl std::fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation projection on an externally-owned content item.
///
/// The two flags are independent; deletion implies effectively hidden
/// regardless of the hidden flag. Content that was never moderated has no
/// stored row and reads back as the visible default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationState {
    pub content_id: ContentId,
    pub discussion_id: DiscussionId,
    pub is_hidden: bool,
    pub hidden_by: Option<UserId>,
    pub hidden_at: Option<DateTime<Utc>>,
    pub hide_reason: Option<String>,
    pub is_deleted: bool,
    pub deleted_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ModerationState {
    /// Default projection for content never touched by moderation.
    pub fn visible(content_id: ContentId, discussion_id: DiscussionId, now: DateTime<Utc>) -> Self {
        Self {
            content_id,
            discussion_id,
            is_hidden: false,
            hidden_by: None,
            hidden_at: None,
            hide_reason: None,
            is_deleted: false,
            deleted_by: None,
            deleted_at: None,
            delete_reason: None,
            updated_at: now,
        }
    }

    pub fn is_effectively_hidden(&self) -> bool {
        self.is_deleted || self.is_hidden
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::Content {
            is_hidden: self.is_hidden,
            is_deleted: self.is_deleted,
        }
    }

    /// Applies one action in place. Re-applying an action the state already
    /// reflects leaves the flags unchanged; callers still log the attempt.
    pub fn apply(
        &mut self,
        action: ModerationAction,
        moderator_id: &UserId,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) {
        match action {
            ModerationAction::Hide => {
                self.is_hidden = true;
                self.hidden_by = Some(moderator_id.clone());
                self.hidden_at = Some(now);
                self.hide_reason = reason.map(str::to_string);
            }
            ModerationAction::Show => {
                self.is_hidden = false;
                self.hidden_by = None;
                self.hidden_at = None;
                self.hide_reason = None;
            }
            ModerationAction::Delete => {
                self.is_deleted = true;
                self.deleted_by = Some(moderator_id.clone());
                self.deleted_at = Some(now);
                self.delete_reason = reason.map(str::to_string);
            }
            ModerationAction::Restore => {
                self.is_deleted = false;
                self.deleted_by = None;
                self.deleted_at = None;
                self.delete_reason = None;
            }
        }
        self.updated_at = now;
    }
}

/// Everything a store needs to apply one action atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyAction {
    pub content_id: ContentId,
    pub discussion_id: DiscussionId,
    pub author_id: Option<UserId>,
    pub moderator_id: UserId,
    pub action: ModerationAction,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// Result of an applied action: the new projection and its audit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedAction {
    pub state: ModerationState,
    pub log_entry: ModerationLogEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ModerationState {
        ModerationState::visible(ContentId::from("c-1"), DiscussionId::from("d-1"), Utc::now())
    }

    #[test]
    fn hide_and_delete_are_independent_flags() {
        let moderator = UserId::from("mod-1");
        let now = Utc::now();
        let mut s = state();

        s.apply(ModerationAction::Hide, &moderator, Some("off topic"), now);
        assert!(s.is_hidden && !s.is_deleted);

        s.apply(ModerationAction::Delete, &moderator, Some("spam"), now);
        assert!(s.is_hidden && s.is_deleted);

        s.apply(ModerationAction::Show, &moderator, None, now);
        assert!(!s.is_hidden && s.is_deleted);
        assert!(s.is_effectively_hidden());

        s.apply(ModerationAction::Restore, &moderator, None, now);
        assert!(!s.is_effectively_hidden());
    }

    #[test]
    fn show_clears_hide_metadata() {
        let moderator = UserId::from("mod-1");
        let now = Utc::now();
        let mut s = state();
        s.apply(ModerationAction::Hide, &moderator, Some("abuse"), now);
        assert_eq!(s.hide_reason.as_deref(), Some("abuse"));

        s.apply(ModerationAction::Show, &moderator, None, now);
        assert!(s.hidden_by.is_none());
        assert!(s.hidden_at.is_none());
        assert!(s.hide_reason.is_none());
    }

    #[test]
    fn reapplying_hide_keeps_flags_stable() {
        let moderator = UserId::from("mod-1");
        let now = Utc::now();
        let mut s = state();
        s.apply(ModerationAction::Hide, &moderator, None, now);
        let before = s.snapshot();
        s.apply(ModerationAction::Hide, &moderator, None, now);
        assert_eq!(s.snapshot(), before);
    }
}
