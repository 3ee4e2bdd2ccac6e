use crate::core::error::{ModResult, ModerationError};
use crate::core::ids::{ContentId, DiscussionId, RuleId, UserId};
use crate::core::queue::{Priority, QueueItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence assigned to a keyword substring hit.
pub const KEYWORD_MATCH_CONFIDENCE: f64 = 0.9;
/// Confidence assigned to a regex hit.
pub const PATTERN_MATCH_CONFIDENCE: f64 = 0.85;
/// Confidence reported by the external classifier seam until one is wired in.
pub const EXTERNAL_SEAM_CONFIDENCE: f64 = 0.1;
/// Threshold applied when a rule does not set its own.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// What a rule matches with. Exactly one payload per kind; the external
/// kinds are seams for classifiers this subsystem does not implement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    Keyword { keywords: Vec<String> },
    Pattern { pattern: String },
    ExternalModel { model_ref: String },
    ExternalApi { endpoint: String },
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keyword { .. } => "keyword",
            Self::Pattern { .. } => "pattern",
            Self::ExternalModel { .. } => "external_model",
            Self::ExternalApi { .. } => "external_api",
        }
    }

    /// Boundary validation: keyword lists must have at least one non-blank
    /// entry and patterns must compile. Checked once at create/update; the
    /// evaluator still fails closed if a stored pattern goes bad.
    pub fn validate(&self) -> ModResult<()> {
        match self {
            Self::Keyword { keywords } => {
                if keywords.iter().all(|k| k.trim().is_empty()) {
                    return Err(ModerationError::Validation(
                        "keyword rule needs at least one non-empty keyword".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Pattern { pattern } => match regex::Regex::new(pattern) {
                Ok(_) => Ok(()),
                Err(err) => Err(ModerationError::Validation(format!(
                    "invalid pattern: {err}"
                ))),
            },
            Self::ExternalModel { model_ref } => {
                if model_ref.trim().is_empty() {
                    return Err(ModerationError::Validation(
                        "external model reference must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
            Self::ExternalApi { endpoint } => {
                if endpoint.trim().is_empty() {
                    return Err(ModerationError::Validation(
                        "external api endpoint must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// What the platform should do when a rule matches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Flag,
    Hide,
    Delete,
    Queue,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Hide => "hide",
            Self::Delete => "delete",
            Self::Queue => "queue",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "flag" => Some(Self::Flag),
            "hide" => Some(Self::Hide),
            "delete" => Some(Self::Delete),
            "queue" => Some(Self::Queue),
            _ => None,
        }
    }
}

/// Which content fields a rule applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleScope {
    pub title: bool,
    pub body: bool,
    pub comment: bool,
}

impl Default for RuleScope {
    fn default() -> Self {
        Self {
            title: true,
            body: true,
            comment: true,
        }
    }
}

impl RuleScope {
    pub fn applies_to(&self, field: ContentField) -> bool {
        match field {
            ContentField::Title => self.title,
            ContentField::Body => self.body,
            ContentField::Comment => self.comment,
        }
    }
}

/// The field a piece of submitted text came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentField {
    Title,
    Body,
    Comment,
}

/// Running accuracy stats, updated only through reviewer feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    pub matches: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub accuracy: f64,
}

impl RuleStats {
    /// One reviewer verdict about one match. Recomputes accuracy as
    /// true positives over all judged matches.
    pub fn record(&mut self, was_correct: bool) {
        self.matches += 1;
        if was_correct {
            self.true_positives += 1;
        } else {
            self.false_positives += 1;
        }
        self.accuracy = self.true_positives as f64 / self.matches as f64;
    }
}

/// A configured automated content-matching policy.
///
/// Deactivation is a soft flag so accuracy stats survive. Rules in test
/// mode evaluate and report normally but never decide the suggested action
/// and never enqueue anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub id: RuleId,
    pub name: String,
    pub kind: RuleKind,
    pub action: RuleAction,
    pub severity: Priority,
    pub confidence_threshold: f64,
    pub scope: RuleScope,
    pub active: bool,
    pub test_mode: bool,
    pub stats: RuleStats,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields accepted when creating a rule. Optional knobs fall back to
/// defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewFilterRule {
    pub name: String,
    pub kind: RuleKind,
    pub action: RuleAction,
    #[serde(default)]
    pub severity: Option<Priority>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub scope: Option<RuleScope>,
    #[serde(default)]
    pub test_mode: bool,
}

impl FilterRule {
    pub fn from_new(new: NewFilterRule, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: RuleId::new(),
            name: new.name,
            kind: new.kind,
            action: new.action,
            severity: new.severity.unwrap_or(Priority::Medium),
            confidence_threshold: new
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            scope: new.scope.unwrap_or_default(),
            active: true,
            test_mode: new.test_mode,
            stats: RuleStats::default(),
            created_by,
            created_at: now,
            updated_at: None,
        }
    }
}

/// Partial update applied to an existing rule. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilterRuleUpdate {
    pub name: Option<String>,
    pub kind: Option<RuleKind>,
    pub action: Option<RuleAction>,
    pub severity: Option<Priority>,
    pub confidence_threshold: Option<f64>,
    pub scope: Option<RuleScope>,
    pub active: Option<bool>,
    pub test_mode: Option<bool>,
}

/// Per-rule evaluation verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub matched: bool,
    pub confidence: f64,
    pub matched_text: Option<String>,
    pub explanation: String,
}

impl RuleMatch {
    pub fn no_match(confidence: f64, explanation: impl Into<String>) -> Self {
        Self {
            matched: false,
            confidence,
            matched_text: None,
            explanation: explanation.into(),
        }
    }
}

/// One rule's verdict inside a full-content evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleEvaluation {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub action: RuleAction,
    pub severity: Priority,
    pub test_mode: bool,
    pub result: RuleMatch,
}

/// Single suggested action combined from all matching rules.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Allow,
    Flag,
    QueueForReview,
    Hide,
    Delete,
}

impl SuggestedAction {
    /// Precedence when confidences tie: hide/delete > queue > flag > allow.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Allow => 0,
            Self::Flag => 1,
            Self::QueueForReview => 2,
            Self::Hide | Self::Delete => 3,
        }
    }
}

impl From<RuleAction> for SuggestedAction {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::Flag => Self::Flag,
            RuleAction::Queue => Self::QueueForReview,
            RuleAction::Hide => Self::Hide,
            RuleAction::Delete => Self::Delete,
        }
    }
}

/// Combined verdict for one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationOutcome {
    pub suggested_action: SuggestedAction,
    pub confidence: f64,
    /// The rule whose match decided the suggestion, if any matched.
    pub decided_by: Option<RuleId>,
    pub evaluations: Vec<RuleEvaluation>,
}

/// Text handed to the screening pass by a content-submission path. The
/// content may not be persisted yet, so the ids come from the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentSubmission {
    pub content_id: ContentId,
    pub discussion_id: DiscussionId,
    pub field: ContentField,
    pub text: String,
}

/// Screening verdict plus the queue item it may have created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningResult {
    pub outcome: EvaluationOutcome,
    pub queue_item: Option<QueueItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_rules_reject_blank_lists() {
        let kind = RuleKind::Keyword {
            keywords: vec!["  ".to_string(), "".to_string()],
        };
        assert!(matches!(
            kind.validate(),
            Err(ModerationError::Validation(_))
        ));
    }

    #[test]
    fn pattern_rules_reject_bad_regexes() {
        let kind = RuleKind::Pattern {
            pattern: "(unclosed".to_string(),
        };
        assert!(kind.validate().is_err());
        let ok = RuleKind::Pattern {
            pattern: r"\bfree\s+coins\b".to_string(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn feedback_recomputes_accuracy() {
        let mut stats = RuleStats::default();
        stats.record(true);
        stats.record(true);
        stats.record(false);
        assert_eq!(stats.matches, 3);
        assert_eq!(stats.true_positives, 2);
        assert_eq!(stats.false_positives, 1);
        assert!((stats.accuracy - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn suggested_action_precedence_ranks_destructive_highest() {
        assert!(SuggestedAction::Hide.precedence() > SuggestedAction::QueueForReview.precedence());
        assert!(SuggestedAction::QueueForReview.precedence() > SuggestedAction::Flag.precedence());
        assert!(SuggestedAction::Flag.precedence() > SuggestedAction::Allow.precedence());
        assert_eq!(
            SuggestedAction::Hide.precedence(),
            SuggestedAction::Delete.precedence()
        );
    }

    #[test]
    fn rule_kind_serializes_with_tag() {
        let kind = RuleKind::Keyword {
            keywords: vec!["spam".to_string()],
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"kind\":\"keyword\""));
        let back: RuleKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
    }
}
