// Filter engine and rule management.
//
// Evaluation is pure: rules never mutate anything while matching. The only
// counters on a rule move through the explicit reviewer-feedback operation.
// Content screening is the one evaluation path with a side effect, and only
// when the winning rule's action is queue-for-review.

use crate::core::config::ModerationConfig;
use crate::core::content::excerpt;
use crate::core::error::{ModResult, ModerationError};
use crate::core::filters::{
    ContentSubmission, EvaluationOutcome, FilterRule, FilterRuleUpdate, NewFilterRule,
    RuleEvaluation, RuleKind, RuleMatch, ScreeningResult, SuggestedAction,
    EXTERNAL_SEAM_CONFIDENCE, KEYWORD_MATCH_CONFIDENCE, PATTERN_MATCH_CONFIDENCE,
};
use crate::core::identity::{require_admin, require_moderator, Caller};
use crate::core::ids::{ContentId, RuleId};
use crate::core::queue::{Priority, QueueItem, QueueStore};
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::sync::Arc;

// ============================================================================
// ENGINE
// ============================================================================

/// Evaluates one rule against one piece of content.
///
/// A raw hit below the rule's confidence threshold is reported as not
/// matched, with the raw confidence kept visible in the result.
pub fn evaluate_rule(content: &str, rule: &FilterRule) -> RuleMatch {
    let raw = match &rule.kind {
        RuleKind::Keyword { keywords } => evaluate_keywords(content, keywords),
        RuleKind::Pattern { pattern } => evaluate_pattern(content, pattern, rule.id),
        RuleKind::ExternalModel { .. } | RuleKind::ExternalApi { .. } => RuleMatch::no_match(
            EXTERNAL_SEAM_CONFIDENCE,
            "external classifier is not wired in",
        ),
    };

    if raw.matched && raw.confidence < rule.confidence_threshold {
        return RuleMatch {
            matched: false,
            confidence: raw.confidence,
            matched_text: raw.matched_text,
            explanation: format!(
                "{} (confidence {:.2} below threshold {:.2})",
                raw.explanation, raw.confidence, rule.confidence_threshold
            ),
        };
    }
    raw
}

fn evaluate_keywords(content: &str, keywords: &[String]) -> RuleMatch {
    let haystack = content.to_lowercase();
    for keyword in keywords {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        // Case-insensitive substring containment, first match wins.
        if haystack.contains(&needle) {
            return RuleMatch {
                matched: true,
                confidence: KEYWORD_MATCH_CONFIDENCE,
                matched_text: Some(keyword.trim().to_string()),
                explanation: format!("keyword \"{}\" found", keyword.trim()),
            };
        }
    }
    RuleMatch::no_match(0.0, "no keyword matched")
}

fn evaluate_pattern(content: &str, pattern: &str, rule_id: RuleId) -> RuleMatch {
    match Regex::new(pattern) {
        Ok(re) => match re.find(content) {
            Some(found) => RuleMatch {
                matched: true,
                confidence: PATTERN_MATCH_CONFIDENCE,
                matched_text: Some(found.as_str().to_string()),
                explanation: format!("pattern matched at byte {}", found.start()),
            },
            None => RuleMatch::no_match(0.0, "pattern did not match"),
        },
        // Validation rejects bad patterns at the boundary; a stored pattern
        // that no longer compiles fails closed instead of erroring out.
        Err(err) => {
            tracing::warn!(rule_id = %rule_id, error = %err, "stored pattern failed to compile");
            RuleMatch::no_match(0.0, "pattern failed to compile, rule failed closed")
        }
    }
}

/// Evaluates every rule and returns each verdict.
pub fn evaluate_all(content: &str, rules: &[FilterRule]) -> Vec<RuleEvaluation> {
    rules
        .iter()
        .map(|rule| RuleEvaluation {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            action: rule.action,
            severity: rule.severity,
            test_mode: rule.test_mode,
            result: evaluate_rule(content, rule),
        })
        .collect()
}

/// Combines per-rule verdicts into one suggested action: the
/// highest-confidence match wins, destructive actions break ties.
/// Test-mode matches are reported but never decide.
pub fn combine(evaluations: Vec<RuleEvaluation>) -> EvaluationOutcome {
    let winner = evaluations
        .iter()
        .filter(|e| e.result.matched && !e.test_mode)
        .max_by(|a, b| {
            a.result
                .confidence
                .total_cmp(&b.result.confidence)
                .then_with(|| {
                    SuggestedAction::from(a.action)
                        .precedence()
                        .cmp(&SuggestedAction::from(b.action).precedence())
                })
        })
        .map(|e| (SuggestedAction::from(e.action), e.result.confidence, e.rule_id));

    match winner {
        Some((suggested_action, confidence, rule_id)) => EvaluationOutcome {
            suggested_action,
            confidence,
            decided_by: Some(rule_id),
            evaluations,
        },
        None => EvaluationOutcome {
            suggested_action: SuggestedAction::Allow,
            confidence: 0.0,
            decided_by: None,
            evaluations,
        },
    }
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for filter rules.
#[async_trait]
pub trait FilterStore: Send + Sync {
    async fn insert_rule(&self, rule: &FilterRule) -> ModResult<()>;

    async fn rule(&self, id: &RuleId) -> ModResult<Option<FilterRule>>;

    /// Replaces the stored rule wholesale. Not found if the id is unknown.
    async fn update_rule(&self, rule: &FilterRule) -> ModResult<FilterRule>;

    /// Flips the soft active flag.
    async fn set_rule_active(&self, id: &RuleId, active: bool) -> ModResult<FilterRule>;

    /// All rules, or only the active ones.
    async fn list_rules(&self, active_only: bool) -> ModResult<Vec<FilterRule>>;

    /// Atomic increment-then-recompute of the accuracy counters. Concurrent
    /// feedback calls must not lose updates.
    async fn record_rule_feedback(&self, id: &RuleId, was_correct: bool) -> ModResult<FilterRule>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Rule administration, test tooling and the content screening pass.
pub struct FilterService<S> {
    store: Arc<S>,
    config: ModerationConfig,
}

impl<S: FilterStore + QueueStore> FilterService<S> {
    pub fn new(store: Arc<S>, config: ModerationConfig) -> Self {
        Self { store, config }
    }

    /// Creates a rule. Administrator only.
    pub async fn create_rule(&self, caller: &Caller, new: NewFilterRule) -> ModResult<FilterRule> {
        require_admin(caller)?;
        if new.name.trim().is_empty() {
            return Err(ModerationError::Validation(
                "rule name must not be empty".to_string(),
            ));
        }
        new.kind.validate()?;
        if let Some(threshold) = new.confidence_threshold {
            validate_threshold(threshold)?;
        }

        let rule = FilterRule::from_new(new, caller.user_id.clone(), Utc::now());
        self.store.insert_rule(&rule).await?;
        tracing::info!(
            rule_id = %rule.id,
            name = %rule.name,
            kind = rule.kind.name(),
            test_mode = rule.test_mode,
            "filter rule created"
        );
        Ok(rule)
    }

    /// Applies a partial update. Administrator only.
    pub async fn update_rule(
        &self,
        caller: &Caller,
        rule_id: &RuleId,
        update: FilterRuleUpdate,
    ) -> ModResult<FilterRule> {
        require_admin(caller)?;
        let mut rule = self.require_rule(rule_id).await?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(ModerationError::Validation(
                    "rule name must not be empty".to_string(),
                ));
            }
            rule.name = name;
        }
        if let Some(kind) = update.kind {
            kind.validate()?;
            rule.kind = kind;
        }
        if let Some(action) = update.action {
            rule.action = action;
        }
        if let Some(severity) = update.severity {
            rule.severity = severity;
        }
        if let Some(threshold) = update.confidence_threshold {
            validate_threshold(threshold)?;
            rule.confidence_threshold = threshold;
        }
        if let Some(scope) = update.scope {
            rule.scope = scope;
        }
        if let Some(active) = update.active {
            rule.active = active;
        }
        if let Some(test_mode) = update.test_mode {
            rule.test_mode = test_mode;
        }
        rule.updated_at = Some(Utc::now());

        let updated = self.store.update_rule(&rule).await?;
        tracing::info!(rule_id = %updated.id, "filter rule updated");
        Ok(updated)
    }

    /// Soft-deactivates a rule, keeping its stats. Administrator only.
    pub async fn deactivate_rule(&self, caller: &Caller, rule_id: &RuleId) -> ModResult<FilterRule> {
        require_admin(caller)?;
        let rule = self.store.set_rule_active(rule_id, false).await?;
        tracing::info!(rule_id = %rule.id, "filter rule deactivated");
        Ok(rule)
    }

    pub async fn get_rule(&self, caller: &Caller, rule_id: &RuleId) -> ModResult<FilterRule> {
        require_moderator(caller)?;
        self.require_rule(rule_id).await
    }

    pub async fn list_rules(
        &self,
        caller: &Caller,
        active_only: bool,
    ) -> ModResult<Vec<FilterRule>> {
        require_moderator(caller)?;
        self.store.list_rules(active_only).await
    }

    /// Dry-runs one rule against arbitrary text. No side effects.
    pub async fn test_rule(
        &self,
        caller: &Caller,
        rule_id: &RuleId,
        content: &str,
    ) -> ModResult<RuleMatch> {
        require_moderator(caller)?;
        let rule = self.require_rule(rule_id).await?;
        Ok(evaluate_rule(content, &rule))
    }

    /// Records a reviewer verdict about one of the rule's matches.
    pub async fn record_feedback(
        &self,
        caller: &Caller,
        rule_id: &RuleId,
        content_id: Option<&ContentId>,
        was_correct: bool,
    ) -> ModResult<FilterRule> {
        require_moderator(caller)?;
        let rule = self.store.record_rule_feedback(rule_id, was_correct).await?;
        tracing::info!(
            rule_id = %rule.id,
            content_id = content_id.map(|c| c.as_str()).unwrap_or("-"),
            was_correct,
            accuracy = rule.stats.accuracy,
            "filter feedback recorded"
        );
        Ok(rule)
    }

    /// Screens submitted text against every active in-scope rule. Enqueues a
    /// queue item when the winning action is queue-for-review.
    pub async fn screen_content(&self, submission: &ContentSubmission) -> ModResult<ScreeningResult> {
        let rules: Vec<FilterRule> = self
            .store
            .list_rules(true)
            .await?
            .into_iter()
            .filter(|rule| rule.scope.applies_to(submission.field))
            .collect();

        let evaluations = evaluate_all(&submission.text, &rules);
        let outcome = combine(evaluations);

        let mut queue_item = None;
        if outcome.suggested_action == SuggestedAction::QueueForReview {
            if let Some(rule_id) = outcome.decided_by {
                let severity = rules
                    .iter()
                    .find(|rule| rule.id == rule_id)
                    .map(|rule| rule.severity)
                    .unwrap_or(Priority::Medium);
                let item = QueueItem::automated(
                    rule_id,
                    submission.content_id.clone(),
                    submission.discussion_id.clone(),
                    severity,
                    excerpt(&submission.text, self.config.preview_max_chars),
                    Utc::now(),
                );
                self.store.insert_item(&item).await?;
                tracing::info!(
                    rule_id = %rule_id,
                    content_id = %submission.content_id,
                    severity = %severity,
                    "filter rule enqueued content for review"
                );
                queue_item = Some(item);
            }
        }

        Ok(ScreeningResult {
            outcome,
            queue_item,
        })
    }

    async fn require_rule(&self, rule_id: &RuleId) -> ModResult<FilterRule> {
        self.store
            .rule(rule_id)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("filter rule {rule_id}")))
    }
}

fn validate_threshold(threshold: f64) -> ModResult<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ModerationError::Validation(
            "confidence threshold must be between 0.0 and 1.0".to_string(),
        ))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::{ContentField, RuleAction, RuleScope};
    use crate::core::identity::Role;
    use crate::core::ids::{DiscussionId, UserId};
    use crate::core::queue::QueueStatus;
    use crate::infra::memory::MemoryStore;

    fn admin() -> Caller {
        Caller::new("admin-1", Role::Admin)
    }

    fn moderator() -> Caller {
        Caller::new("mod-1", Role::Moderator)
    }

    fn service() -> FilterService<MemoryStore> {
        FilterService::new(Arc::new(MemoryStore::new()), ModerationConfig::default())
    }

    fn keyword_rule(keywords: &[&str], action: RuleAction) -> NewFilterRule {
        NewFilterRule {
            name: "test rule".to_string(),
            kind: RuleKind::Keyword {
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            },
            action,
            severity: None,
            confidence_threshold: None,
            scope: None,
            test_mode: false,
        }
    }

    #[tokio::test]
    async fn test_keyword_rule_matches_case_insensitively() {
        let service = service();
        let rule = service
            .create_rule(&admin(), keyword_rule(&["spam"], RuleAction::Flag))
            .await
            .unwrap();

        let hit = service
            .test_rule(&moderator(), &rule.id, "this is SPAM content")
            .await
            .unwrap();
        assert!(hit.matched);
        assert!(hit.confidence >= rule.confidence_threshold);
        assert_eq!(hit.matched_text.as_deref(), Some("spam"));

        let miss = service
            .test_rule(&moderator(), &rule.id, "clean content")
            .await
            .unwrap();
        assert!(!miss.matched);
    }

    #[tokio::test]
    async fn test_threshold_downgrades_hit_to_no_match() {
        let service = service();
        let mut new = keyword_rule(&["spam"], RuleAction::Flag);
        new.confidence_threshold = Some(0.95);
        let rule = service.create_rule(&admin(), new).await.unwrap();

        let result = service
            .test_rule(&moderator(), &rule.id, "definitely spam")
            .await
            .unwrap();
        assert!(!result.matched);
        // Raw confidence survives so reviewers can see how close it was.
        assert!((result.confidence - KEYWORD_MATCH_CONFIDENCE).abs() < 1e-9);
        assert!(result.explanation.contains("below threshold"));
    }

    #[tokio::test]
    async fn test_invalid_stored_pattern_fails_closed() {
        // Built directly to bypass create-time validation, simulating a
        // stored rule that went bad.
        let rule = FilterRule::from_new(
            NewFilterRule {
                name: "broken".to_string(),
                kind: RuleKind::Pattern {
                    pattern: "(unclosed".to_string(),
                },
                action: RuleAction::Flag,
                severity: None,
                confidence_threshold: None,
                scope: None,
                test_mode: false,
            },
            UserId::from("admin-1"),
            Utc::now(),
        );
        let verdict = evaluate_rule("whatever", &rule);
        assert!(!verdict.matched);
        assert!(verdict.explanation.contains("failed closed"));
    }

    #[tokio::test]
    async fn test_combine_prefers_highest_confidence_then_precedence() {
        let service = service();
        let keyword = service
            .create_rule(&admin(), keyword_rule(&["scam"], RuleAction::Hide))
            .await
            .unwrap();
        let mut pattern = NewFilterRule {
            name: "pattern".to_string(),
            kind: RuleKind::Pattern {
                pattern: "scam".to_string(),
            },
            action: RuleAction::Queue,
            severity: None,
            confidence_threshold: None,
            scope: None,
            test_mode: false,
        };
        pattern.confidence_threshold = Some(0.5);
        service.create_rule(&admin(), pattern).await.unwrap();

        let rules = service.list_rules(&moderator(), true).await.unwrap();
        let outcome = combine(evaluate_all("obvious scam here", &rules));
        // Keyword confidence (0.9) beats pattern confidence (0.85).
        assert_eq!(outcome.suggested_action, SuggestedAction::Hide);
        assert_eq!(outcome.decided_by, Some(keyword.id));
    }

    #[tokio::test]
    async fn test_test_mode_rules_report_but_never_decide() {
        let service = service();
        let mut new = keyword_rule(&["spam"], RuleAction::Delete);
        new.test_mode = true;
        let rule = service.create_rule(&admin(), new).await.unwrap();

        let submission = ContentSubmission {
            content_id: ContentId::from("c-1"),
            discussion_id: DiscussionId::from("d-1"),
            field: ContentField::Body,
            text: "spam spam spam".to_string(),
        };
        let result = service.screen_content(&submission).await.unwrap();
        assert_eq!(result.outcome.suggested_action, SuggestedAction::Allow);
        assert!(result.outcome.decided_by.is_none());
        // The match itself is still visible in the evaluations.
        let eval = result
            .outcome
            .evaluations
            .iter()
            .find(|e| e.rule_id == rule.id)
            .unwrap();
        assert!(eval.result.matched);
        assert!(eval.test_mode);
    }

    #[tokio::test]
    async fn test_queue_action_enqueues_item_with_rule_severity() {
        let service = service();
        let mut new = keyword_rule(&["free coins"], RuleAction::Queue);
        new.severity = Some(Priority::High);
        let rule = service.create_rule(&admin(), new).await.unwrap();

        let submission = ContentSubmission {
            content_id: ContentId::from("c-9"),
            discussion_id: DiscussionId::from("d-9"),
            field: ContentField::Body,
            text: "get FREE COINS now".to_string(),
        };
        let result = service.screen_content(&submission).await.unwrap();
        let item = result.queue_item.expect("expected a queue item");
        assert_eq!(item.rule_id, Some(rule.id));
        assert_eq!(item.priority, Priority::High);
        assert_eq!(item.status, QueueStatus::Pending);
        assert!(item.report_id.is_none());
    }

    #[tokio::test]
    async fn test_scope_excludes_out_of_scope_fields() {
        let service = service();
        let mut new = keyword_rule(&["spam"], RuleAction::Flag);
        new.scope = Some(RuleScope {
            title: true,
            body: false,
            comment: false,
        });
        service.create_rule(&admin(), new).await.unwrap();

        let submission = ContentSubmission {
            content_id: ContentId::from("c-1"),
            discussion_id: DiscussionId::from("d-1"),
            field: ContentField::Body,
            text: "spam".to_string(),
        };
        let result = service.screen_content(&submission).await.unwrap();
        assert!(result.outcome.evaluations.is_empty());
        assert_eq!(result.outcome.suggested_action, SuggestedAction::Allow);
    }

    #[tokio::test]
    async fn test_feedback_requires_staff_and_updates_accuracy() {
        let service = service();
        let rule = service
            .create_rule(&admin(), keyword_rule(&["spam"], RuleAction::Flag))
            .await
            .unwrap();

        let member = Caller::new("user-1", Role::Member);
        assert!(matches!(
            service
                .record_feedback(&member, &rule.id, None, true)
                .await,
            Err(ModerationError::Forbidden(_))
        ));

        service
            .record_feedback(&moderator(), &rule.id, None, true)
            .await
            .unwrap();
        let updated = service
            .record_feedback(&moderator(), &rule.id, None, false)
            .await
            .unwrap();
        assert_eq!(updated.stats.matches, 2);
        assert!((updated.stats.accuracy - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_deactivated_rules_are_skipped_but_keep_stats() {
        let service = service();
        let rule = service
            .create_rule(&admin(), keyword_rule(&["spam"], RuleAction::Queue))
            .await
            .unwrap();
        service
            .record_feedback(&moderator(), &rule.id, None, true)
            .await
            .unwrap();
        service.deactivate_rule(&admin(), &rule.id).await.unwrap();

        let submission = ContentSubmission {
            content_id: ContentId::from("c-1"),
            discussion_id: DiscussionId::from("d-1"),
            field: ContentField::Body,
            text: "spam".to_string(),
        };
        let result = service.screen_content(&submission).await.unwrap();
        assert!(result.queue_item.is_none());

        let kept = service.get_rule(&moderator(), &rule.id).await.unwrap();
        assert!(!kept.active);
        assert_eq!(kept.stats.true_positives, 1);
    }

    #[tokio::test]
    async fn test_rule_admin_is_admin_only() {
        let service = service();
        let result = service
            .create_rule(&moderator(), keyword_rule(&["spam"], RuleAction::Flag))
            .await;
        assert!(matches!(result, Err(ModerationError::Forbidden(_))));
    }
}
