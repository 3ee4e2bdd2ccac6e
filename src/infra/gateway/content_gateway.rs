// In-memory content gateway.
//
// Production deployments implement ContentGateway against the platform's
// content service. This one holds snapshots in DashMaps and backs the tests
// and embedded setups where the host pushes content refs in directly.

use crate::core::content::{ContentGateway, ContentRef, DiscussionRef};
use crate::core::error::ModResult;
use crate::core::ids::{ContentId, DiscussionId};
use async_trait::async_trait;
use dashmap::DashMap;

/// Content lookup backed by maps the embedder fills.
pub struct MemoryContentGateway {
    contents: DashMap<ContentId, ContentRef>,
    discussions: DashMap<DiscussionId, DiscussionRef>,
}

impl MemoryContentGateway {
    pub fn new() -> Self {
        Self {
            contents: DashMap::new(),
            discussions: DashMap::new(),
        }
    }

    /// Registers or replaces a content snapshot.
    pub fn insert_content(&self, content: ContentRef) {
        self.contents.insert(content.id.clone(), content);
    }

    /// Registers or replaces a discussion snapshot.
    pub fn insert_discussion(&self, discussion: DiscussionRef) {
        self.discussions.insert(discussion.id.clone(), discussion);
    }

    pub fn remove_content(&self, id: &ContentId) {
        self.contents.remove(id);
    }
}

impl Default for MemoryContentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGateway for MemoryContentGateway {
    async fn content(&self, id: &ContentId) -> ModResult<Option<ContentRef>> {
        Ok(self.contents.get(id).map(|entry| entry.value().clone()))
    }

    async fn discussion(&self, id: &DiscussionId) -> ModResult<Option<DiscussionRef>> {
        Ok(self.discussions.get(id).map(|entry| entry.value().clone()))
    }
}
