// Read-only view of the content service.
//
// Content and discussions live in another service. The moderation subsystem
// never stores their bodies; it resolves them through this gateway when an
// operation needs to check existence, ownership or build a preview.

use crate::core::error::{ModResult, ModerationError};
use crate::core::ids::{ContentId, DiscussionId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Snapshot of a content item as the content service reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRef {
    pub id: ContentId,
    pub discussion_id: DiscussionId,
    pub author_id: UserId,
    pub title: Option<String>,
    pub body: String,
}

impl ContentRef {
    /// Short excerpt for queue item display, truncated on a char boundary.
    pub fn preview(&self, max_chars: usize) -> String {
        let source = match &self.title {
            Some(title) if !title.trim().is_empty() => format!("{}: {}", title.trim(), self.body),
            _ => self.body.clone(),
        };
        excerpt(&source, max_chars)
    }
}

/// Snapshot of a discussion, enough to answer ownership checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionRef {
    pub id: DiscussionId,
    pub owner_id: UserId,
    pub title: String,
}

/// Lookup port onto the content service.
///
/// `Ok(None)` means the entity does not exist; `Err` is reserved for the
/// gateway itself failing and is surfaced as an external dependency error.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    async fn content(&self, id: &ContentId) -> ModResult<Option<ContentRef>>;
    async fn discussion(&self, id: &DiscussionId) -> ModResult<Option<DiscussionRef>>;
}

pub async fn require_content<G>(gateway: &G, id: &ContentId) -> ModResult<ContentRef>
where
    G: ContentGateway + ?Sized,
{
    gateway
        .content(id)
        .await?
        .ok_or_else(|| ModerationError::NotFound(format!("content {id}")))
}

pub async fn require_discussion<G>(gateway: &G, id: &DiscussionId) -> ModResult<DiscussionRef>
where
    G: ContentGateway + ?Sized,
{
    gateway
        .discussion(id)
        .await?
        .ok_or_else(|| ModerationError::NotFound(format!("discussion {id}")))
}

/// Trims and truncates text on a char boundary, marking elision.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
