// The transport-agnostic moderation surface.
//
// `ModerationApi` composes the core services over one store, one content
// gateway and one notifier, and exposes the logical operations an embedding
// server routes requests to. It owns no logic of its own beyond the review
// cascade, which chains an optional content action and an optional author
// sanction onto a report review.

use crate::api::requests::{
    AppealRequest, AssignRequest, ModLogParams, ModerateContentRequest, QueueListParams,
    ReviewAppealRequest, ReviewReportRequest, ReviewReportResponse, RevokeSanctionRequest,
    RuleFeedbackRequest, SubmitReportRequest, SubmitReportResponse, TestRuleRequest,
};
use crate::core::actions::{ActionService, AppliedAction, ModerationState, ModerationStateStore};
use crate::core::audit::{AuditService, ModLogStore, ModerationLogEntry};
use crate::core::config::ModerationConfig;
use crate::core::content::{require_content, ContentGateway};
use crate::core::error::ModResult;
use crate::core::filters::{
    ContentSubmission, FilterRule, FilterRuleUpdate, FilterService, FilterStore, NewFilterRule,
    RuleMatch, ScreeningResult,
};
use crate::core::identity::Caller;
use crate::core::ids::{ContentId, QueueItemId, ReportId, RuleId, SanctionId, UserId};
use crate::core::notify::Notifier;
use crate::core::queue::{QueueItem, QueuePage, QueueService, QueueStore};
use crate::core::reports::{Report, ReportService, ReportStore};
use crate::core::sanctions::{
    NewSanction, Sanction, SanctionService, SanctionStore, UserSanctionStatus,
};
use crate::core::stats::{ModerationOverview, StatsService, StatsStore};
use std::sync::Arc;

// ============================================================================
// STORE UMBRELLA
// ============================================================================

/// One store implementing every persistence port. Both bundled stores
/// (memory and sqlite) qualify.
pub trait ModerationStore:
    ReportStore
    + QueueStore
    + ModerationStateStore
    + SanctionStore
    + FilterStore
    + ModLogStore
    + StatsStore
{
}

impl<T> ModerationStore for T where
    T: ReportStore
        + QueueStore
        + ModerationStateStore
        + SanctionStore
        + FilterStore
        + ModLogStore
        + StatsStore
{
}

// ============================================================================
// FACADE
// ============================================================================

pub struct ModerationApi<S, C, N> {
    reports: ReportService<S, C, N>,
    queue: QueueService<S>,
    actions: ActionService<S, C, N>,
    sanctions: SanctionService<S, N>,
    filters: FilterService<S>,
    audit: AuditService<S>,
    stats: StatsService<S>,
    gateway: Arc<C>,
}

impl<S, C, N> ModerationApi<S, C, N>
where
    S: ModerationStore,
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
            reports: ReportService::new(
                store.clone(),
                gateway.clone(),
                notifier.clone(),
                config.clone(),
            ),
            queue: QueueService::new(store.clone(), config.clone()),
            actions: ActionService::new(
                store.clone(),
                gateway.clone(),
                notifier.clone(),
                config.clone(),
            ),
            sanctions: SanctionService::new(store.clone(), notifier.clone(), config.clone()),
            filters: FilterService::new(store.clone(), config.clone()),
            audit: AuditService::new(store.clone(), config),
            stats: StatsService::new(store),
            gateway,
        }
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    pub async fn submit_report(
        &self,
        caller: &Caller,
        request: SubmitReportRequest,
    ) -> ModResult<SubmitReportResponse> {
        let (report, queue_item) = self
            .reports
            .submit(caller, &request.content_id, request.category, &request.reason)
            .await?;
        Ok(SubmitReportResponse { report, queue_item })
    }

    pub async fn report(&self, caller: &Caller, report_id: &ReportId) -> ModResult<Report> {
        self.reports.get(caller, report_id).await
    }

    pub async fn reports_for_content(
        &self,
        caller: &Caller,
        content_id: &ContentId,
    ) -> ModResult<Vec<Report>> {
        self.reports.for_content(caller, content_id).await
    }

    /// Reviews a report, then runs the optional follow-up steps: a content
    /// action on the reported content and a sanction against its author.
    /// The review commits first; a failing follow-up surfaces its error
    /// after the review has already been recorded.
    pub async fn review_report(
        &self,
        caller: &Caller,
        report_id: &ReportId,
        request: ReviewReportRequest,
    ) -> ModResult<ReviewReportResponse> {
        let (report, queue_item) = self
            .reports
            .review(caller, report_id, &request.resolution, request.notes)
            .await?;

        let action = match request.action {
            Some(action) => Some(
                self.actions
                    .moderate(
                        caller,
                        &report.content_id,
                        action,
                        Some(request.resolution.clone()),
                    )
                    .await?,
            ),
            None => None,
        };

        let sanction = match request.sanction {
            Some(sanction_req) => {
                let content = require_content(&*self.gateway, &report.content_id).await?;
                Some(
                    self.sanctions
                        .create(
                            caller,
                            NewSanction {
                                user_id: content.author_id,
                                sanction_type: sanction_req.sanction_type,
                                reason: sanction_req.reason,
                                duration_hours: sanction_req.duration_hours,
                                report_id: Some(report.id),
                                content_id: Some(report.content_id.clone()),
                            },
                        )
                        .await?,
                )
            }
            None => None,
        };

        Ok(ReviewReportResponse {
            report,
            queue_item,
            action,
            sanction,
        })
    }

    // ------------------------------------------------------------------
    // Queue
    // ------------------------------------------------------------------

    pub async fn list_queue(
        &self,
        caller: &Caller,
        params: QueueListParams,
    ) -> ModResult<QueuePage> {
        self.queue
            .list(
                caller,
                params.priority,
                params.status,
                params.assigned_to,
                params.limit,
                params.offset,
            )
            .await
    }

    pub async fn queue_item(&self, caller: &Caller, item_id: &QueueItemId) -> ModResult<QueueItem> {
        self.queue.get(caller, item_id).await
    }

    /// Claims the item for `moderator_id`, or releases it back to pending
    /// when the request names nobody.
    pub async fn assign_queue_item(
        &self,
        caller: &Caller,
        item_id: &QueueItemId,
        request: AssignRequest,
    ) -> ModResult<QueueItem> {
        match request.moderator_id {
            Some(moderator_id) => self.queue.assign(caller, item_id, &moderator_id).await,
            None => self.queue.unassign(caller, item_id).await,
        }
    }

    pub async fn resolve_queue_item(
        &self,
        caller: &Caller,
        item_id: &QueueItemId,
    ) -> ModResult<QueueItem> {
        self.queue.resolve(caller, item_id).await
    }

    // ------------------------------------------------------------------
    // Content actions
    // ------------------------------------------------------------------

    pub async fn moderate_content(
        &self,
        caller: &Caller,
        content_id: &ContentId,
        request: ModerateContentRequest,
    ) -> ModResult<AppliedAction> {
        self.actions
            .moderate(caller, content_id, request.action, request.reason)
            .await
    }

    /// The moderation projection for one content item. `None` means the
    /// content was never moderated. Not permission-checked; the platform
    /// calls this on every content render.
    pub async fn content_state(&self, content_id: &ContentId) -> ModResult<Option<ModerationState>> {
        self.actions.state(content_id).await
    }

    // ------------------------------------------------------------------
    // Filter rules
    // ------------------------------------------------------------------

    pub async fn create_filter_rule(
        &self,
        caller: &Caller,
        request: NewFilterRule,
    ) -> ModResult<FilterRule> {
        self.filters.create_rule(caller, request).await
    }

    pub async fn update_filter_rule(
        &self,
        caller: &Caller,
        rule_id: &RuleId,
        request: FilterRuleUpdate,
    ) -> ModResult<FilterRule> {
        self.filters.update_rule(caller, rule_id, request).await
    }

    /// Soft-deactivates the rule so its accuracy history survives.
    pub async fn delete_filter_rule(
        &self,
        caller: &Caller,
        rule_id: &RuleId,
    ) -> ModResult<FilterRule> {
        self.filters.deactivate_rule(caller, rule_id).await
    }

    pub async fn filter_rule(&self, caller: &Caller, rule_id: &RuleId) -> ModResult<FilterRule> {
        self.filters.get_rule(caller, rule_id).await
    }

    pub async fn list_filter_rules(
        &self,
        caller: &Caller,
        active_only: bool,
    ) -> ModResult<Vec<FilterRule>> {
        self.filters.list_rules(caller, active_only).await
    }

    pub async fn test_filter_rule(
        &self,
        caller: &Caller,
        rule_id: &RuleId,
        request: TestRuleRequest,
    ) -> ModResult<RuleMatch> {
        self.filters.test_rule(caller, rule_id, &request.content).await
    }

    pub async fn filter_rule_feedback(
        &self,
        caller: &Caller,
        rule_id: &RuleId,
        request: RuleFeedbackRequest,
    ) -> ModResult<FilterRule> {
        self.filters
            .record_feedback(
                caller,
                rule_id,
                request.content_id.as_ref(),
                request.was_correct,
            )
            .await
    }

    /// Screens submitted text against the active rules. Not
    /// permission-checked; content-submission paths call this before the
    /// content is persisted.
    pub async fn evaluate_content(
        &self,
        submission: &ContentSubmission,
    ) -> ModResult<ScreeningResult> {
        self.filters.screen_content(submission).await
    }

    // ------------------------------------------------------------------
    // Sanctions
    // ------------------------------------------------------------------

    pub async fn create_sanction(
        &self,
        caller: &Caller,
        request: NewSanction,
    ) -> ModResult<Sanction> {
        self.sanctions.create(caller, request).await
    }

    pub async fn sanction(&self, caller: &Caller, sanction_id: &SanctionId) -> ModResult<Sanction> {
        self.sanctions.get(caller, sanction_id).await
    }

    pub async fn revoke_sanction(
        &self,
        caller: &Caller,
        sanction_id: &SanctionId,
        request: RevokeSanctionRequest,
    ) -> ModResult<Sanction> {
        self.sanctions.revoke(caller, sanction_id, &request.reason).await
    }

    pub async fn appeal_sanction(
        &self,
        caller: &Caller,
        sanction_id: &SanctionId,
        request: AppealRequest,
    ) -> ModResult<Sanction> {
        self.sanctions.appeal(caller, sanction_id, &request.reason).await
    }

    pub async fn review_appeal(
        &self,
        caller: &Caller,
        sanction_id: &SanctionId,
        request: ReviewAppealRequest,
    ) -> ModResult<Sanction> {
        self.sanctions
            .review_appeal(caller, sanction_id, request.approved, request.notes)
            .await
    }

    /// Derived restriction status for one user. Not permission-checked;
    /// posting and discussion-creation paths call this for capability
    /// gating.
    pub async fn user_sanction_status(&self, user_id: &UserId) -> ModResult<UserSanctionStatus> {
        self.sanctions.user_status(user_id).await
    }

    pub async fn list_user_sanctions(
        &self,
        caller: &Caller,
        user_id: &UserId,
    ) -> ModResult<Vec<Sanction>> {
        self.sanctions.list_for_user(caller, user_id).await
    }

    // ------------------------------------------------------------------
    // Audit log and stats
    // ------------------------------------------------------------------

    pub async fn list_mod_log(
        &self,
        caller: &Caller,
        params: ModLogParams,
    ) -> ModResult<Vec<ModerationLogEntry>> {
        self.audit
            .entries(
                caller,
                params.content_id,
                params.discussion_id,
                params.limit,
                params.offset,
            )
            .await
    }

    pub async fn moderation_overview(&self, caller: &Caller) -> ModResult<ModerationOverview> {
        self.stats.overview(caller).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
