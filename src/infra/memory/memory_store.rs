// In-memory implementation of every storage port, backed by DashMap.
//
// This is the store the service tests run against and the default for
// embedded deployments. Conditional writes take the entity's shard guard
// for the whole check-then-mutate sequence, which is what makes the
// pending -> in_review style transitions race-safe here. Audit entries are
// appended while that guard is still held, so per-entity log order always
// matches the order mutations were applied.

use crate::core::actions::{AppliedAction, ApplyAction, ModerationState, ModerationStateStore};
use crate::core::audit::{
    LogAction, ModLogQuery, ModLogStore, ModerationLogEntry, NewLogEntry, StateSnapshot,
};
use crate::core::error::{ModResult, ModerationError};
use crate::core::filters::{FilterRule, FilterStore};
use crate::core::ids::{ContentId, QueueItemId, ReportId, RuleId, SanctionId, UserId};
use crate::core::queue::{
    Priority, QueueItem, QueuePage, QueueQuery, QueueStatus, QueueStore,
};
use crate::core::reports::{Report, ReportReview, ReportStatus, ReportStore};
use crate::core::sanctions::{
    is_currently_active, AppealRecord, AppealStatus, RevocationRecord, Sanction, SanctionStore,
    SanctionType,
};
use crate::core::stats::{
    QueueCounts, QueueDepth, ReportCounts, RuleCounts, SanctionCount, StatsStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory store implementing all moderation storage ports.
pub struct MemoryStore {
    rules: DashMap<RuleId, FilterRule>,
    reports: DashMap<ReportId, Report>,
    /// Dedupe guard: one pending report per (reporter, content) pair. The
    /// entry is created with the report and removed when it is reviewed.
    pending_reports: DashMap<(UserId, ContentId), ReportId>,
    items: DashMap<QueueItemId, QueueItem>,
    states: DashMap<ContentId, ModerationState>,
    sanctions: DashMap<SanctionId, Sanction>,
    log: DashMap<i64, ModerationLogEntry>,
    next_seq: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
            reports: DashMap::new(),
            pending_reports: DashMap::new(),
            items: DashMap::new(),
            states: DashMap::new(),
            sanctions: DashMap::new(),
            log: DashMap::new(),
            next_seq: AtomicI64::new(1),
        }
    }

    /// Assigns the next sequence number and stores the finished entry.
    /// Callers append while holding the mutated entity's guard.
    fn append_log(&self, new: NewLogEntry) -> ModerationLogEntry {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let entry = new.into_entry(seq);
        self.log.insert(seq, entry.clone());
        entry
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// FILTER RULES
// ============================================================================

#[async_trait]
impl FilterStore for MemoryStore {
    async fn insert_rule(&self, rule: &FilterRule) -> ModResult<()> {
        self.rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn rule(&self, id: &RuleId) -> ModResult<Option<FilterRule>> {
        Ok(self.rules.get(id).map(|entry| entry.value().clone()))
    }

    async fn update_rule(&self, rule: &FilterRule) -> ModResult<FilterRule> {
        let mut entry = self
            .rules
            .get_mut(&rule.id)
            .ok_or_else(|| ModerationError::NotFound(format!("filter rule {}", rule.id)))?;
        *entry = rule.clone();
        Ok(entry.value().clone())
    }

    async fn set_rule_active(&self, id: &RuleId, active: bool) -> ModResult<FilterRule> {
        let mut entry = self
            .rules
            .get_mut(id)
            .ok_or_else(|| ModerationError::NotFound(format!("filter rule {id}")))?;
        entry.active = active;
        Ok(entry.value().clone())
    }

    async fn list_rules(&self, active_only: bool) -> ModResult<Vec<FilterRule>> {
        let mut rules: Vec<FilterRule> = self
            .rules
            .iter()
            .filter(|entry| !active_only || entry.active)
            .map(|entry| entry.value().clone())
            .collect();
        rules.sort_by_key(|rule| rule.created_at);
        Ok(rules)
    }

    async fn record_rule_feedback(&self, id: &RuleId, was_correct: bool) -> ModResult<FilterRule> {
        // The shard guard serializes concurrent feedback on the same rule.
        let mut entry = self
            .rules
            .get_mut(id)
            .ok_or_else(|| ModerationError::NotFound(format!("filter rule {id}")))?;
        entry.stats.record(was_correct);
        Ok(entry.value().clone())
    }
}

// ============================================================================
// REPORTS
// ============================================================================

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report_with_item(&self, report: &Report, item: &QueueItem) -> ModResult<()> {
        match self
            .pending_reports
            .entry((report.reporter_id.clone(), report.content_id.clone()))
        {
            Entry::Occupied(_) => Err(ModerationError::Conflict(
                "content already reported".to_string(),
            )),
            Entry::Vacant(vacant) => {
                // Both writes happen under the guard entry, so a concurrent
                // duplicate submission loses before it can observe either.
                let guard = vacant.insert(report.id);
                self.reports.insert(report.id, report.clone());
                self.items.insert(item.id, item.clone());
                drop(guard);
                Ok(())
            }
        }
    }

    async fn report(&self, id: &ReportId) -> ModResult<Option<Report>> {
        Ok(self.reports.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_pending_by_reporter(
        &self,
        reporter_id: &UserId,
        content_id: &ContentId,
    ) -> ModResult<Option<Report>> {
        let key = (reporter_id.clone(), content_id.clone());
        let Some(report_id) = self.pending_reports.get(&key).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.reports.get(&report_id).map(|entry| entry.value().clone()))
    }

    async fn mark_reviewed(&self, id: &ReportId, review: &ReportReview) -> ModResult<Report> {
        let reviewed = {
            let mut entry = self
                .reports
                .get_mut(id)
                .ok_or_else(|| ModerationError::NotFound(format!("report {id}")))?;
            if entry.status == ReportStatus::Reviewed {
                return Err(ModerationError::Conflict(format!(
                    "report {id} was already reviewed"
                )));
            }
            entry.status = ReportStatus::Reviewed;
            entry.resolution = Some(review.resolution.clone());
            entry.reviewed_by = Some(review.reviewed_by.clone());
            entry.reviewed_at = Some(review.reviewed_at);
            entry.review_notes = review.notes.clone();
            entry.value().clone()
        };
        // Guard dropped first; the dedupe entry is pure cleanup.
        self.pending_reports
            .remove(&(reviewed.reporter_id.clone(), reviewed.content_id.clone()));
        Ok(reviewed)
    }

    async fn reports_for_content(&self, content_id: &ContentId) -> ModResult<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .reports
            .iter()
            .filter(|entry| entry.content_id == *content_id)
            .map(|entry| entry.value().clone())
            .collect();
        reports.sort_by_key(|report| Reverse(report.created_at));
        Ok(reports)
    }
}

// ============================================================================
// QUEUE
// ============================================================================

#[async_trait]
impl QueueStore for MemoryStore {
    async fn insert_item(&self, item: &QueueItem) -> ModResult<()> {
        self.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn queue_item(&self, id: &QueueItemId) -> ModResult<Option<QueueItem>> {
        Ok(self.items.get(id).map(|entry| entry.value().clone()))
    }

    async fn assign_item(
        &self,
        id: &QueueItemId,
        moderator_id: &UserId,
        assigned_by: &UserId,
        at: DateTime<Utc>,
    ) -> ModResult<QueueItem> {
        let mut entry = self
            .items
            .get_mut(id)
            .ok_or_else(|| ModerationError::NotFound(format!("queue item {id}")))?;
        match entry.status {
            QueueStatus::Pending => {
                entry.status = QueueStatus::InReview;
                entry.assigned_to = Some(moderator_id.clone());
                entry.assigned_by = Some(assigned_by.clone());
                entry.assigned_at = Some(at);
                Ok(entry.value().clone())
            }
            QueueStatus::InReview => Err(ModerationError::Conflict(format!(
                "queue item {id} is already assigned"
            ))),
            QueueStatus::Resolved => Err(ModerationError::Conflict(format!(
                "queue item {id} is already resolved"
            ))),
        }
    }

    async fn unassign_item(&self, id: &QueueItemId) -> ModResult<QueueItem> {
        let mut entry = self
            .items
            .get_mut(id)
            .ok_or_else(|| ModerationError::NotFound(format!("queue item {id}")))?;
        if entry.status != QueueStatus::InReview {
            return Err(ModerationError::Conflict(format!(
                "queue item {id} is not in review"
            )));
        }
        entry.status = QueueStatus::Pending;
        entry.assigned_to = None;
        entry.assigned_by = None;
        entry.assigned_at = None;
        Ok(entry.value().clone())
    }

    async fn resolve_item(
        &self,
        id: &QueueItemId,
        resolved_by: &UserId,
        at: DateTime<Utc>,
    ) -> ModResult<QueueItem> {
        let mut entry = self
            .items
            .get_mut(id)
            .ok_or_else(|| ModerationError::NotFound(format!("queue item {id}")))?;
        if entry.status == QueueStatus::Resolved {
            return Err(ModerationError::Conflict(format!(
                "queue item {id} is already resolved"
            )));
        }
        entry.status = QueueStatus::Resolved;
        entry.resolved_by = Some(resolved_by.clone());
        entry.resolved_at = Some(at);
        Ok(entry.value().clone())
    }

    async fn resolve_item_for_report(
        &self,
        report_id: &ReportId,
        resolved_by: &UserId,
        at: DateTime<Utc>,
    ) -> ModResult<Option<QueueItem>> {
        let found = self
            .items
            .iter()
            .find(|entry| entry.report_id.as_ref() == Some(report_id))
            .map(|entry| entry.id);
        let Some(id) = found else {
            return Ok(None);
        };
        let Some(mut entry) = self.items.get_mut(&id) else {
            return Ok(None);
        };
        if entry.status == QueueStatus::Resolved {
            return Ok(None);
        }
        entry.status = QueueStatus::Resolved;
        entry.resolved_by = Some(resolved_by.clone());
        entry.resolved_at = Some(at);
        Ok(Some(entry.value().clone()))
    }

    async fn list_items(&self, query: &QueueQuery) -> ModResult<QueuePage> {
        let mut matching: Vec<QueueItem> = self
            .items
            .iter()
            .filter(|entry| query.priority.map_or(true, |p| entry.priority == p))
            .filter(|entry| query.status.map_or(true, |s| entry.status == s))
            .filter(|entry| {
                query
                    .assigned_to
                    .as_ref()
                    .map_or(true, |u| entry.assigned_to.as_ref() == Some(u))
            })
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by_key(|item| (Reverse(item.priority.rank()), Reverse(item.created_at)));

        let total = matching.len() as u64;
        let items: Vec<QueueItem> = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok(QueuePage {
            items,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }
}

// ============================================================================
// MODERATION STATES
// ============================================================================

#[async_trait]
impl ModerationStateStore for MemoryStore {
    async fn moderation_state(&self, content_id: &ContentId) -> ModResult<Option<ModerationState>> {
        Ok(self.states.get(content_id).map(|entry| entry.value().clone()))
    }

    async fn apply_action(&self, apply: &ApplyAction) -> ModResult<AppliedAction> {
        let mut entry = self.states.entry(apply.content_id.clone()).or_insert_with(|| {
            ModerationState::visible(apply.content_id.clone(), apply.discussion_id.clone(), apply.at)
        });
        let before = entry.snapshot();
        entry.apply(apply.action, &apply.moderator_id, apply.reason.as_deref(), apply.at);
        let after = entry.snapshot();

        let log_entry = self.append_log(NewLogEntry::content_action(
            apply.content_id.clone(),
            apply.discussion_id.clone(),
            apply.author_id.clone(),
            apply.moderator_id.clone(),
            apply.action.log_action(),
            apply.reason.clone(),
            before,
            after,
            apply.at,
        ));
        Ok(AppliedAction {
            state: entry.value().clone(),
            log_entry,
        })
    }
}

// ============================================================================
// SANCTIONS
// ============================================================================

#[async_trait]
impl SanctionStore for MemoryStore {
    async fn insert_sanction(&self, sanction: &Sanction) -> ModResult<()> {
        let guard = match self.sanctions.entry(sanction.id) {
            Entry::Occupied(_) => {
                return Err(ModerationError::Conflict(format!(
                    "sanction {} already exists",
                    sanction.id
                )))
            }
            Entry::Vacant(vacant) => vacant.insert(sanction.clone()),
        };
        // Issuance entry goes in before the guard drops, ahead of any
        // lifecycle write that may be waiting on this sanction.
        self.append_log(NewLogEntry::sanction_action(
            sanction.id,
            sanction.user_id.clone(),
            sanction.content_id.clone(),
            sanction.issued_by.clone(),
            sanction.sanction_type.log_action(),
            Some(sanction.reason.clone()),
            StateSnapshot::Sanction {
                is_active: false,
                appeal_status: None,
            },
            StateSnapshot::Sanction {
                is_active: sanction.is_active,
                appeal_status: sanction.appeal_status(),
            },
            sanction.created_at,
        ));
        drop(guard);
        Ok(())
    }

    async fn sanction(&self, id: &SanctionId) -> ModResult<Option<Sanction>> {
        Ok(self.sanctions.get(id).map(|entry| entry.value().clone()))
    }

    async fn sanctions_for_user(&self, user_id: &UserId) -> ModResult<Vec<Sanction>> {
        let mut sanctions: Vec<Sanction> = self
            .sanctions
            .iter()
            .filter(|entry| entry.user_id == *user_id)
            .map(|entry| entry.value().clone())
            .collect();
        sanctions.sort_by_key(|sanction| Reverse(sanction.created_at));
        Ok(sanctions)
    }

    async fn revoke_sanction(
        &self,
        id: &SanctionId,
        revoked_by: &UserId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> ModResult<Sanction> {
        let mut entry = self
            .sanctions
            .get_mut(id)
            .ok_or_else(|| ModerationError::NotFound(format!("sanction {id}")))?;
        if !is_currently_active(entry.value(), at) {
            return Err(ModerationError::Conflict(format!(
                "sanction {id} is not active"
            )));
        }
        let before = StateSnapshot::Sanction {
            is_active: entry.is_active,
            appeal_status: entry.appeal_status(),
        };
        entry.is_active = false;
        entry.revocation = Some(RevocationRecord {
            revoked_by: revoked_by.clone(),
            reason: reason.to_string(),
            revoked_at: at,
        });
        let after = StateSnapshot::Sanction {
            is_active: false,
            appeal_status: entry.appeal_status(),
        };
        self.append_log(NewLogEntry::sanction_action(
            *id,
            entry.user_id.clone(),
            entry.content_id.clone(),
            revoked_by.clone(),
            LogAction::RevokeSanction,
            Some(reason.to_string()),
            before,
            after,
            at,
        ));
        Ok(entry.value().clone())
    }

    async fn file_appeal(
        &self,
        id: &SanctionId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> ModResult<Sanction> {
        let mut entry = self
            .sanctions
            .get_mut(id)
            .ok_or_else(|| ModerationError::NotFound(format!("sanction {id}")))?;
        if !is_currently_active(entry.value(), at) {
            return Err(ModerationError::Conflict(format!(
                "sanction {id} is not active"
            )));
        }
        if entry.appeal.is_some() {
            return Err(ModerationError::Conflict(format!(
                "sanction {id} was already appealed"
            )));
        }
        entry.appeal = Some(AppealRecord::pending(reason.to_string(), at));
        Ok(entry.value().clone())
    }

    async fn decide_appeal(
        &self,
        id: &SanctionId,
        approved: bool,
        reviewed_by: &UserId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> ModResult<Sanction> {
        let mut entry = self
            .sanctions
            .get_mut(id)
            .ok_or_else(|| ModerationError::NotFound(format!("sanction {id}")))?;
        let before = StateSnapshot::Sanction {
            is_active: entry.is_active,
            appeal_status: entry.appeal_status(),
        };
        match entry.appeal.as_mut() {
            Some(appeal) if appeal.status == AppealStatus::Pending => {
                appeal.status = if approved {
                    AppealStatus::Approved
                } else {
                    AppealStatus::Denied
                };
                appeal.reviewed_by = Some(reviewed_by.clone());
                appeal.review_notes = notes.clone();
                appeal.reviewed_at = Some(at);
            }
            _ => {
                return Err(ModerationError::Conflict(format!(
                    "sanction {id} has no pending appeal"
                )))
            }
        }
        if approved {
            entry.is_active = false;
        }
        let after = StateSnapshot::Sanction {
            is_active: entry.is_active,
            appeal_status: entry.appeal_status(),
        };
        let action = if approved {
            LogAction::AppealApproved
        } else {
            LogAction::AppealDenied
        };
        self.append_log(NewLogEntry::sanction_action(
            *id,
            entry.user_id.clone(),
            entry.content_id.clone(),
            reviewed_by.clone(),
            action,
            notes,
            before,
            after,
            at,
        ));
        Ok(entry.value().clone())
    }
}

// ============================================================================
// MODERATION LOG
// ============================================================================

#[async_trait]
impl ModLogStore for MemoryStore {
    async fn log_entries(&self, query: &ModLogQuery) -> ModResult<Vec<ModerationLogEntry>> {
        let mut entries: Vec<ModerationLogEntry> = self
            .log
            .iter()
            .filter(|entry| {
                query
                    .content_id
                    .as_ref()
                    .map_or(true, |c| entry.content_id.as_ref() == Some(c))
            })
            .filter(|entry| {
                query
                    .discussion_id
                    .as_ref()
                    .map_or(true, |d| entry.discussion_id.as_ref() == Some(d))
            })
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|entry| Reverse(entry.seq));
        Ok(entries
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }
}

// ============================================================================
// STATS
// ============================================================================

#[async_trait]
impl StatsStore for MemoryStore {
    async fn report_counts(&self) -> ModResult<ReportCounts> {
        let mut counts = ReportCounts::default();
        for entry in self.reports.iter() {
            match entry.status {
                ReportStatus::Pending => counts.pending += 1,
                ReportStatus::Reviewed => counts.reviewed += 1,
            }
        }
        Ok(counts)
    }

    async fn queue_counts(&self) -> ModResult<QueueCounts> {
        let mut counts = QueueCounts::default();
        for entry in self.items.iter() {
            match entry.status {
                QueueStatus::Pending => counts.pending += 1,
                QueueStatus::InReview => counts.in_review += 1,
                QueueStatus::Resolved => counts.resolved += 1,
            }
        }
        Ok(counts)
    }

    async fn queue_depths(&self) -> ModResult<Vec<QueueDepth>> {
        let mut depths: Vec<QueueDepth> = Priority::all()
            .into_iter()
            .rev()
            .map(|priority| QueueDepth { priority, count: 0 })
            .collect();
        for entry in self.items.iter() {
            if entry.status != QueueStatus::Pending {
                continue;
            }
            if let Some(depth) = depths.iter_mut().find(|d| d.priority == entry.priority) {
                depth.count += 1;
            }
        }
        Ok(depths)
    }

    async fn active_sanction_counts(&self, now: DateTime<Utc>) -> ModResult<Vec<SanctionCount>> {
        let mut counts = Vec::new();
        for sanction_type in [
            SanctionType::PermanentBan,
            SanctionType::TemporarySuspension,
            SanctionType::Warning,
        ] {
            let count = self
                .sanctions
                .iter()
                .filter(|entry| {
                    entry.sanction_type == sanction_type && is_currently_active(entry.value(), now)
                })
                .count() as u64;
            if count > 0 {
                counts.push(SanctionCount {
                    sanction_type,
                    count,
                });
            }
        }
        Ok(counts)
    }

    async fn rule_counts(&self) -> ModResult<RuleCounts> {
        let mut counts = RuleCounts::default();
        for entry in self.rules.iter() {
            if entry.active {
                counts.active += 1;
                if entry.test_mode {
                    counts.test_mode += 1;
                }
            }
        }
        Ok(counts)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actions::ModerationAction;
    use crate::core::ids::DiscussionId;
    use crate::core::queue::QueueItem;
    use crate::core::reports::{Report, ReportCategory};

    fn apply(content: &str, action: ModerationAction) -> ApplyAction {
        ApplyAction {
            content_id: ContentId::from(content),
            discussion_id: DiscussionId::from("d-1"),
            author_id: Some(UserId::from("author-1")),
            moderator_id: UserId::from("mod-1"),
            action,
            reason: None,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sequence_numbers_are_globally_increasing() {
        let store = MemoryStore::new();
        let a = store.apply_action(&apply("c-1", ModerationAction::Hide)).await.unwrap();
        let b = store.apply_action(&apply("c-2", ModerationAction::Hide)).await.unwrap();
        let c = store.apply_action(&apply("c-1", ModerationAction::Show)).await.unwrap();
        assert!(a.log_entry.seq < b.log_entry.seq);
        assert!(b.log_entry.seq < c.log_entry.seq);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_reports_have_one_winner() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let make_pair = || {
            let now = Utc::now();
            let report = Report::new(
                ContentId::from("c-1"),
                DiscussionId::from("d-1"),
                UserId::from("u-1"),
                ReportCategory::Spam,
                "spam".to_string(),
                now,
            );
            let item = QueueItem::for_report(
                report.id,
                report.content_id.clone(),
                report.discussion_id.clone(),
                report.priority,
                "preview".to_string(),
                now,
            );
            (report, item)
        };
        let (r1, i1) = make_pair();
        let (r2, i2) = make_pair();

        let s1 = store.clone();
        let s2 = store.clone();
        let (a, b) = tokio::join!(
            async move { s1.insert_report_with_item(&r1, &i1).await },
            async move { s2.insert_report_with_item(&r2, &i2).await },
        );
        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_concurrent_feedback_loses_no_updates() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let rule = FilterRule::from_new(
            crate::core::filters::NewFilterRule {
                name: "spam words".to_string(),
                kind: crate::core::filters::RuleKind::Keyword {
                    keywords: vec!["spam".to_string()],
                },
                action: crate::core::filters::RuleAction::Flag,
                severity: None,
                confidence_threshold: None,
                scope: None,
                test_mode: false,
            },
            UserId::from("admin-1"),
            Utc::now(),
        );
        store.insert_rule(&rule).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let id = rule.id;
            handles.push(tokio::spawn(async move {
                store.record_rule_feedback(&id, i % 2 == 0).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let updated = store.rule(&rule.id).await.unwrap().unwrap();
        assert_eq!(updated.stats.matches, 20);
        assert_eq!(updated.stats.true_positives, 10);
        assert_eq!(updated.stats.false_positives, 10);
    }

    #[tokio::test]
    async fn test_resolving_an_unknown_reports_item_is_not_an_error() {
        let store = MemoryStore::new();
        let resolved = store
            .resolve_item_for_report(&ReportId::new(), &UserId::from("mod-1"), Utc::now())
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_log_filters_by_content_and_discussion() {
        let store = MemoryStore::new();
        store.apply_action(&apply("c-1", ModerationAction::Hide)).await.unwrap();
        store.apply_action(&apply("c-2", ModerationAction::Hide)).await.unwrap();

        let by_content = store
            .log_entries(&ModLogQuery {
                content_id: Some(ContentId::from("c-1")),
                limit: 10,
                ..ModLogQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(by_content.len(), 1);

        let by_discussion = store
            .log_entries(&ModLogQuery {
                discussion_id: Some(DiscussionId::from("d-1")),
                limit: 10,
                ..ModLogQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(by_discussion.len(), 2);
    }

    #[tokio::test]
    async fn test_log_pages_newest_first_with_offset() {
        let store = MemoryStore::new();
        for content in ["c-1", "c-2", "c-3"] {
            store.apply_action(&apply(content, ModerationAction::Hide)).await.unwrap();
        }

        let first_page = store
            .log_entries(&ModLogQuery {
                limit: 2,
                ..ModLogQuery::default()
            })
            .await
            .unwrap();
        let second_page = store
            .log_entries(&ModLogQuery {
                limit: 2,
                offset: 2,
                ..ModLogQuery::default()
            })
            .await
            .unwrap();

        let contents: Vec<_> = first_page
            .iter()
            .chain(&second_page)
            .map(|entry| entry.content_id.clone().unwrap())
            .collect();
        assert_eq!(
            contents,
            vec![
                ContentId::from("c-3"),
                ContentId::from("c-2"),
                ContentId::from("c-1"),
            ]
        );

        let past_the_end = store
            .log_entries(&ModLogQuery {
                limit: 2,
                offset: 10,
                ..ModLogQuery::default()
            })
            .await
            .unwrap();
        assert!(past_the_end.is_empty());
    }
}
