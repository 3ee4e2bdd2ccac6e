// Report intake and review.
//
// Intake validates, deduplicates against the reporter's own pending reports,
// computes priority from the category table and creates the report together
// with its queue item as one consistent write. Review is the only mutation a
// report ever sees.

use crate::core::config::ModerationConfig;
use crate::core::content::{require_content, require_discussion, ContentGateway};
use crate::core::error::{ModResult, ModerationError};
use crate::core::identity::{require_admin_or_owner, require_moderator, Caller};
use crate::core::ids::{ContentId, ReportId, UserId};
use crate::core::notify::{notify_moderators_best_effort, Notification, Notifier};
use crate::core::queue::{Priority, QueueItem, QueueStore};
use crate::core::reports::{Report, ReportCategory, ReportReview};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Inserts the report and its queue item as one consistent write. A
    /// report must never exist without its item. An existing pending report
    /// by the same reporter for the same content fails with a conflict;
    /// this guard also decides races between concurrent submissions.
    async fn insert_report_with_item(&self, report: &Report, item: &QueueItem) -> ModResult<()>;

    async fn report(&self, id: &ReportId) -> ModResult<Option<Report>>;

    async fn find_pending_by_reporter(
        &self,
        reporter_id: &UserId,
        content_id: &ContentId,
    ) -> ModResult<Option<Report>>;

    /// Conditionally moves pending -> reviewed and records the verdict.
    /// Conflict if the report is already reviewed.
    async fn mark_reviewed(&self, id: &ReportId, review: &ReportReview) -> ModResult<Report>;

    /// All reports for one content id, newest first.
    async fn reports_for_content(&self, content_id: &ContentId) -> ModResult<Vec<Report>>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Report intake and review logic.
pub struct ReportService<S, C, N> {
    store: Arc<S>,
    gateway: Arc<C>,
    notifier: Arc<N>,
    config: ModerationConfig,
}

impl<S, C, N> ReportService<S, C, N>
where
    S: ReportStore + QueueStore,
    C: ContentGateway,
    N: Notifier,
{
    pub fn new(
        store: Arc<S>,
        gateway: Arc<C>,
        notifier: Arc<N>,
        config: ModerationConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            config,
        }
    }

    /// Files a report. Any member may report; one pending report per
    /// (reporter, content) pair.
    pub async fn submit(
        &self,
        caller: &Caller,
        content_id: &ContentId,
        category: ReportCategory,
        reason: &str,
    ) -> ModResult<(Report, QueueItem)> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ModerationError::Validation(
                "report reason must not be empty".to_string(),
            ));
        }
        if reason.chars().count() > self.config.max_reason_chars {
            return Err(ModerationError::Validation(format!(
                "report reason exceeds {} characters",
                self.config.max_reason_chars
            )));
        }

        let content = require_content(&*self.gateway, content_id).await?;

        // Cheap pre-check; the store-level guard decides actual races.
        if self
            .store
            .find_pending_by_reporter(&caller.user_id, content_id)
            .await?
            .is_some()
        {
            return Err(ModerationError::Conflict(
                "content already reported".to_string(),
            ));
        }

        let now = Utc::now();
        let report = Report::new(
            content.id.clone(),
            content.discussion_id.clone(),
            caller.user_id.clone(),
            category,
            reason.to_string(),
            now,
        );
        let item = QueueItem::for_report(
            report.id,
            content.id.clone(),
            content.discussion_id.clone(),
            report.priority,
            content.preview(self.config.preview_max_chars),
            now,
        );
        self.store.insert_report_with_item(&report, &item).await?;

        tracing::info!(
            report_id = %report.id,
            content_id = %report.content_id,
            category = %report.category,
            priority = %report.priority,
            "report filed"
        );

        if report.priority == Priority::Urgent && self.config.alert_moderators_on_urgent {
            notify_moderators_best_effort(
                &*self.notifier,
                &self.config,
                &Notification::ReportFiled {
                    report_id: report.id,
                    content_id: report.content_id.clone(),
                    priority: report.priority,
                },
            )
            .await;
        }

        Ok((report, item))
    }

    /// Reviews a pending report and resolves its queue item. Allowed for
    /// admins and for the owner of the reported content's discussion.
    pub async fn review(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        resolution: &str,
        notes: Option<String>,
    ) -> ModResult<(Report, Option<QueueItem>)> {
        let resolution = resolution.trim();
        if resolution.is_empty() {
            return Err(ModerationError::Validation(
                "resolution must not be empty".to_string(),
            ));
        }

        let report = self.require_report(report_id).await?;
        self.check_review_permission(caller, &report).await?;

        let now = Utc::now();
        let review = ReportReview {
            reviewed_by: caller.user_id.clone(),
            resolution: resolution.to_string(),
            notes,
            reviewed_at: now,
        };
        let reviewed = self.store.mark_reviewed(report_id, &review).await?;
        let item = self
            .store
            .resolve_item_for_report(report_id, &caller.user_id, now)
            .await?;

        tracing::info!(
            report_id = %reviewed.id,
            reviewed_by = %caller.user_id,
            resolution = %reviewed.resolution.as_deref().unwrap_or(""),
            "report reviewed"
        );
        Ok((reviewed, item))
    }

    pub async fn get(&self, caller: &Caller, report_id: &ReportId) -> ModResult<Report> {
        require_moderator(caller)?;
        self.require_report(report_id).await
    }

    /// Every report ever filed against one content item.
    pub async fn for_content(
        &self,
        caller: &Caller,
        content_id: &ContentId,
    ) -> ModResult<Vec<Report>> {
        require_moderator(caller)?;
        self.store.reports_for_content(content_id).await
    }

    async fn require_report(&self, report_id: &ReportId) -> ModResult<Report> {
        self.store
            .report(report_id)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("report {report_id}")))
    }

    /// Admins skip the discussion lookup entirely; everyone else must own
    /// the reported content's discussion.
    async fn check_review_permission(&self, caller: &Caller, report: &Report) -> ModResult<()> {
        if caller.is_admin() {
            return Ok(());
        }
        let discussion = require_discussion(&*self.gateway, &report.discussion_id).await?;
        require_admin_or_owner(caller, &discussion.owner_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::{ContentRef, DiscussionRef};
    use crate::core::identity::Role;
    use crate::core::ids::DiscussionId;
    use crate::core::queue::QueueStatus;
    use crate::core::reports::ReportStatus;
    use crate::infra::gateway::MemoryContentGateway;
    use crate::infra::memory::MemoryStore;
    use crate::infra::notify::RecordingNotifier;

    type TestService = ReportService<MemoryStore, MemoryContentGateway, RecordingNotifier>;

    fn setup() -> (TestService, Arc<MemoryContentGateway>, Arc<RecordingNotifier>) {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MemoryContentGateway::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let config = ModerationConfig {
            notify_backoff_ms: 1,
            ..ModerationConfig::default()
        };
        let service = ReportService::new(store, gateway.clone(), notifier.clone(), config);
        (service, gateway, notifier)
    }

    fn seed_content(gateway: &MemoryContentGateway, content_id: &str, owner: &str) {
        gateway.insert_discussion(DiscussionRef {
            id: DiscussionId::from("d-1"),
            owner_id: UserId::from(owner),
            title: "General".to_string(),
        });
        gateway.insert_content(ContentRef {
            id: ContentId::from(content_id),
            discussion_id: DiscussionId::from("d-1"),
            author_id: UserId::from("author-1"),
            title: Some("Check this out".to_string()),
            body: "totally legit free coins".to_string(),
        });
    }

    fn reporter() -> Caller {
        Caller::new("user-1", Role::Member)
    }

    #[tokio::test]
    async fn test_submit_creates_report_and_queue_item_pair() {
        let (service, gateway, _) = setup();
        seed_content(&gateway, "c-1", "owner-1");

        let (report, item) = service
            .submit(
                &reporter(),
                &ContentId::from("c-1"),
                ReportCategory::Spam,
                "spam link",
            )
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.priority, Priority::Medium);
        assert_eq!(item.report_id, Some(report.id));
        assert_eq!(item.content_id, report.content_id);
        assert_eq!(item.priority, report.priority);
        assert!(!item.is_urgent);
        assert!(item.preview.contains("Check this out"));
    }

    #[tokio::test]
    async fn test_submit_unknown_content_is_not_found() {
        let (service, _, _) = setup();
        let result = service
            .submit(
                &reporter(),
                &ContentId::from("missing"),
                ReportCategory::Spam,
                "spam",
            )
            .await;
        assert!(matches!(result, Err(ModerationError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_pending_report_conflicts_until_reviewed() {
        let (service, gateway, _) = setup();
        seed_content(&gateway, "c-1", "owner-1");
        let content_id = ContentId::from("c-1");

        let (report, _) = service
            .submit(&reporter(), &content_id, ReportCategory::Spam, "spam")
            .await
            .unwrap();

        let second = service
            .submit(&reporter(), &content_id, ReportCategory::Spam, "still spam")
            .await;
        assert!(matches!(second, Err(ModerationError::Conflict(_))));

        // A different reporter is not blocked.
        let other = Caller::new("user-2", Role::Member);
        service
            .submit(&other, &content_id, ReportCategory::Spam, "me too")
            .await
            .unwrap();

        // After review the same reporter may file again.
        let owner = Caller::new("owner-1", Role::Member);
        service
            .review(&owner, &report.id, "warned the author", None)
            .await
            .unwrap();
        service
            .submit(&reporter(), &content_id, ReportCategory::Spam, "back again")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_blank_reason_is_rejected() {
        let (service, gateway, _) = setup();
        seed_content(&gateway, "c-1", "owner-1");
        let result = service
            .submit(
                &reporter(),
                &ContentId::from("c-1"),
                ReportCategory::Spam,
                "   ",
            )
            .await;
        assert!(matches!(result, Err(ModerationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_urgent_report_alerts_moderators() {
        let (service, gateway, notifier) = setup();
        seed_content(&gateway, "c-1", "owner-1");

        service
            .submit(
                &reporter(),
                &ContentId::from("c-1"),
                ReportCategory::HateSpeech,
                "slurs",
            )
            .await
            .unwrap();

        let alerts = notifier.moderator_notifications().await;
        assert_eq!(alerts.len(), 1);
        assert!(matches!(
            alerts[0],
            Notification::ReportFiled {
                priority: Priority::Urgent,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_medium_report_does_not_alert_moderators() {
        let (service, gateway, notifier) = setup();
        seed_content(&gateway, "c-1", "owner-1");
        service
            .submit(&reporter(), &ContentId::from("c-1"), ReportCategory::Spam, "spam")
            .await
            .unwrap();
        assert!(notifier.moderator_notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_review_requires_admin_or_discussion_owner() {
        let (service, gateway, _) = setup();
        seed_content(&gateway, "c-1", "owner-1");
        let (report, _) = service
            .submit(&reporter(), &ContentId::from("c-1"), ReportCategory::Spam, "spam")
            .await
            .unwrap();

        let stranger = Caller::new("user-9", Role::Member);
        assert!(matches!(
            service.review(&stranger, &report.id, "done", None).await,
            Err(ModerationError::Forbidden(_))
        ));

        // Owning the discussion is enough, no staff role needed.
        let owner = Caller::new("owner-1", Role::Member);
        let (reviewed, item) = service
            .review(&owner, &report.id, "content hidden", None)
            .await
            .unwrap();
        assert_eq!(reviewed.status, ReportStatus::Reviewed);
        assert_eq!(reviewed.reviewed_by, Some(UserId::from("owner-1")));
        let item = item.expect("queue item should resolve with the review");
        assert_eq!(item.status, QueueStatus::Resolved);

        // A review clears the dedupe window, and admins never need ownership.
        let (second, _) = service
            .submit(&reporter(), &ContentId::from("c-1"), ReportCategory::Spam, "still spam")
            .await
            .unwrap();
        let admin = Caller::new("admin-1", Role::Admin);
        let (reviewed, _) = service
            .review(&admin, &second.id, "dismissed", None)
            .await
            .unwrap();
        assert_eq!(reviewed.reviewed_by, Some(UserId::from("admin-1")));
    }

    #[tokio::test]
    async fn test_double_review_conflicts() {
        let (service, gateway, _) = setup();
        seed_content(&gateway, "c-1", "owner-1");
        let (report, _) = service
            .submit(&reporter(), &ContentId::from("c-1"), ReportCategory::Spam, "spam")
            .await
            .unwrap();

        let admin = Caller::new("admin-1", Role::Admin);
        service
            .review(&admin, &report.id, "first verdict", None)
            .await
            .unwrap();
        let second = service.review(&admin, &report.id, "second verdict", None).await;
        assert!(matches!(second, Err(ModerationError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_reports_for_content_requires_staff() {
        let (service, gateway, _) = setup();
        seed_content(&gateway, "c-1", "owner-1");
        service
            .submit(&reporter(), &ContentId::from("c-1"), ReportCategory::Spam, "spam")
            .await
            .unwrap();

        assert!(service
            .for_content(&reporter(), &ContentId::from("c-1"))
            .await
            .is_err());

        let moderator = Caller::new("mod-1", Role::Moderator);
        let reports = service
            .for_content(&moderator, &ContentId::from("c-1"))
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
    }
}
