// Sanction lifecycle.
//
// Sanctions go active -> revoked (explicit), active -> expired (implicit,
// evaluated lazily at read time) and may carry one appeal going
// pending -> approved|denied. The stores append the matching audit entry
// inside the same atomic operation as each lifecycle write.

use crate::core::config::ModerationConfig;
use crate::core::error::{ModResult, ModerationError};
use crate::core::identity::{require_admin, require_moderator, Caller};
use crate::core::ids::{SanctionId, UserId};
use crate::core::notify::{
    notify_moderators_best_effort, notify_user_best_effort, Notification, Notifier,
};
use crate::core::sanctions::{
    derive_status, NewSanction, Sanction, SanctionType, UserSanctionStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for sanctions. Lifecycle mutations are conditional writes
/// and append their audit entry atomically with the state change.
#[async_trait]
pub trait SanctionStore: Send + Sync {
    /// Inserts the sanction and appends its issuance log entry.
    async fn insert_sanction(&self, sanction: &Sanction) -> ModResult<()>;

    async fn sanction(&self, id: &SanctionId) -> ModResult<Option<Sanction>>;

    /// Every sanction ever issued to one user, newest first.
    async fn sanctions_for_user(&self, user_id: &UserId) -> ModResult<Vec<Sanction>>;

    /// Conditionally deactivates. Conflict if the sanction is already
    /// revoked or has expired by `at`.
    async fn revoke_sanction(
        &self,
        id: &SanctionId,
        revoked_by: &UserId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> ModResult<Sanction>;

    /// Conditionally records a pending appeal. Conflict if the sanction is
    /// inactive (revoked or expired by `at`) or already appealed.
    async fn file_appeal(
        &self,
        id: &SanctionId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> ModResult<Sanction>;

    /// Conditionally settles a pending appeal. Approval also deactivates
    /// the sanction. Conflict if no appeal is pending.
    async fn decide_appeal(
        &self,
        id: &SanctionId,
        approved: bool,
        reviewed_by: &UserId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> ModResult<Sanction>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Sanction issuance, revocation, appeals and status derivation.
pub struct SanctionService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    config: ModerationConfig,
}

impl<S, N> SanctionService<S, N>
where
    S: SanctionStore,
    N: Notifier,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: ModerationConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Issues a sanction. Moderator or admin.
    pub async fn create(&self, caller: &Caller, new: NewSanction) -> ModResult<Sanction> {
        require_moderator(caller)?;
        let reason = new.reason.trim();
        if reason.is_empty() {
            return Err(ModerationError::Validation(
                "sanction reason must not be empty".to_string(),
            ));
        }
        if reason.chars().count() > self.config.max_reason_chars {
            return Err(ModerationError::Validation(format!(
                "sanction reason exceeds {} characters",
                self.config.max_reason_chars
            )));
        }
        if new.user_id == caller.user_id {
            return Err(ModerationError::Validation(
                "cannot sanction yourself".to_string(),
            ));
        }

        let now = Utc::now();
        let ends_at = match (new.sanction_type, new.duration_hours) {
            (SanctionType::TemporarySuspension, Some(hours)) if hours > 0 => {
                // Checked arithmetic: a duration chrono cannot represent, or
                // an end date past the calendar range, is a caller error.
                let ends_at = Duration::try_hours(hours)
                    .and_then(|delta| now.checked_add_signed(delta))
                    .ok_or_else(|| {
                        ModerationError::Validation(format!(
                            "suspension duration of {hours} hours is out of range"
                        ))
                    })?;
                Some(ends_at)
            }
            (SanctionType::TemporarySuspension, _) => {
                return Err(ModerationError::Validation(
                    "temporary suspensions need a positive duration in hours".to_string(),
                ));
            }
            (_, Some(_)) => {
                return Err(ModerationError::Validation(format!(
                    "duration is only valid for temporary suspensions, not {}",
                    new.sanction_type
                )));
            }
            (_, None) => None,
        };

        // Risk context: how many sanctions the user already accumulated.
        let prior_sanction_count =
            self.store.sanctions_for_user(&new.user_id).await?.len() as u32;

        let sanction = Sanction {
            id: SanctionId::new(),
            user_id: new.user_id,
            issued_by: caller.user_id.clone(),
            sanction_type: new.sanction_type,
            reason: reason.to_string(),
            starts_at: now,
            ends_at,
            is_active: true,
            appeal: None,
            revocation: None,
            report_id: new.report_id,
            content_id: new.content_id,
            prior_sanction_count,
            created_at: now,
        };
        self.store.insert_sanction(&sanction).await?;

        tracing::info!(
            sanction_id = %sanction.id,
            user_id = %sanction.user_id,
            sanction_type = %sanction.sanction_type,
            prior_sanction_count,
            "sanction issued"
        );

        notify_user_best_effort(
            &*self.notifier,
            &self.config,
            &sanction.user_id,
            &Notification::SanctionIssued {
                sanction_id: sanction.id,
                sanction_type: sanction.sanction_type,
                reason: sanction.reason.clone(),
                ends_at: sanction.ends_at,
            },
        )
        .await;

        Ok(sanction)
    }

    /// Lifts an active sanction. Administrator only.
    pub async fn revoke(
        &self,
        caller: &Caller,
        sanction_id: &SanctionId,
        reason: &str,
    ) -> ModResult<Sanction> {
        require_admin(caller)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ModerationError::Validation(
                "revocation reason must not be empty".to_string(),
            ));
        }

        let sanction = self
            .store
            .revoke_sanction(sanction_id, &caller.user_id, reason, Utc::now())
            .await?;
        tracing::info!(
            sanction_id = %sanction.id,
            revoked_by = %caller.user_id,
            "sanction revoked"
        );

        notify_user_best_effort(
            &*self.notifier,
            &self.config,
            &sanction.user_id,
            &Notification::SanctionRevoked {
                sanction_id: sanction.id,
                reason: reason.to_string(),
            },
        )
        .await;
        Ok(sanction)
    }

    /// Files an appeal. Only the sanctioned user, only while the sanction
    /// is active, at most once.
    pub async fn appeal(
        &self,
        caller: &Caller,
        sanction_id: &SanctionId,
        reason: &str,
    ) -> ModResult<Sanction> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ModerationError::Validation(
                "appeal reason must not be empty".to_string(),
            ));
        }

        let sanction = self.require_sanction(sanction_id).await?;
        if sanction.user_id != caller.user_id {
            return Err(ModerationError::Forbidden(
                "only the sanctioned user may appeal".to_string(),
            ));
        }

        let appealed = self
            .store
            .file_appeal(sanction_id, reason, Utc::now())
            .await?;
        tracing::info!(sanction_id = %appealed.id, user_id = %appealed.user_id, "appeal filed");

        notify_moderators_best_effort(
            &*self.notifier,
            &self.config,
            &Notification::AppealFiled {
                sanction_id: appealed.id,
                user_id: appealed.user_id.clone(),
            },
        )
        .await;
        Ok(appealed)
    }

    /// Settles a pending appeal. Administrator only; approval deactivates
    /// the sanction.
    pub async fn review_appeal(
        &self,
        caller: &Caller,
        sanction_id: &SanctionId,
        approved: bool,
        notes: Option<String>,
    ) -> ModResult<Sanction> {
        require_admin(caller)?;
        let sanction = self
            .store
            .decide_appeal(sanction_id, approved, &caller.user_id, notes.clone(), Utc::now())
            .await?;
        tracing::info!(
            sanction_id = %sanction.id,
            approved,
            reviewed_by = %caller.user_id,
            "appeal decided"
        );

        notify_user_best_effort(
            &*self.notifier,
            &self.config,
            &sanction.user_id,
            &Notification::AppealDecided {
                sanction_id: sanction.id,
                approved,
                notes,
            },
        )
        .await;
        Ok(sanction)
    }

    /// Current restriction status for a user. Expiry is derived here, lazily;
    /// nothing sweeps expired sanctions in the background.
    pub async fn user_status(&self, user_id: &UserId) -> ModResult<UserSanctionStatus> {
        let sanctions = self.store.sanctions_for_user(user_id).await?;
        Ok(derive_status(user_id.clone(), &sanctions, Utc::now()))
    }

    pub async fn get(&self, caller: &Caller, sanction_id: &SanctionId) -> ModResult<Sanction> {
        require_moderator(caller)?;
        self.require_sanction(sanction_id).await
    }

    /// Full sanction history for one user. Moderator or admin.
    pub async fn list_for_user(
        &self,
        caller: &Caller,
        user_id: &UserId,
    ) -> ModResult<Vec<Sanction>> {
        require_moderator(caller)?;
        self.store.sanctions_for_user(user_id).await
    }

    async fn require_sanction(&self, sanction_id: &SanctionId) -> ModResult<Sanction> {
        self.store
            .sanction(sanction_id)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("sanction {sanction_id}")))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::{LogAction, ModLogQuery, ModLogStore};
    use crate::core::identity::Role;
    use crate::core::sanctions::AppealStatus;
    use crate::infra::memory::MemoryStore;
    use crate::infra::notify::RecordingNotifier;

    type TestService = SanctionService<MemoryStore, RecordingNotifier>;

    fn setup() -> (TestService, Arc<MemoryStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let config = ModerationConfig {
            notify_backoff_ms: 1,
            ..ModerationConfig::default()
        };
        let service = SanctionService::new(store.clone(), notifier.clone(), config);
        (service, store, notifier)
    }

    fn moderator() -> Caller {
        Caller::new("mod-1", Role::Moderator)
    }

    fn admin() -> Caller {
        Caller::new("admin-1", Role::Admin)
    }

    fn suspension(user: &str, hours: i64) -> NewSanction {
        NewSanction {
            user_id: UserId::from(user),
            sanction_type: SanctionType::TemporarySuspension,
            reason: "repeated spam".to_string(),
            duration_hours: Some(hours),
            report_id: None,
            content_id: None,
        }
    }

    #[tokio::test]
    async fn test_temporary_suspension_sets_end_date_and_blocks_posting() {
        let (service, _, notifier) = setup();
        let before = Utc::now();
        let sanction = service
            .create(&moderator(), suspension("u-1", 24))
            .await
            .unwrap();

        let ends_at = sanction.ends_at.expect("temporary suspension needs an end");
        let expected = before + Duration::hours(24);
        assert!((ends_at - expected).num_seconds().abs() <= 5);

        let status = service.user_status(&UserId::from("u-1")).await.unwrap();
        assert!(status.is_sanctioned);
        assert!(!status.can_post);
        assert!(!status.can_create_discussion);
        assert_eq!(status.restricted_until, Some(ends_at));

        let sent = notifier.user_notifications().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, UserId::from("u-1"));
    }

    #[tokio::test]
    async fn test_duration_rules_per_type() {
        let (service, _, _) = setup();

        let mut missing = suspension("u-1", 24);
        missing.duration_hours = None;
        assert!(matches!(
            service.create(&moderator(), missing).await,
            Err(ModerationError::Validation(_))
        ));

        let warning_with_duration = NewSanction {
            user_id: UserId::from("u-1"),
            sanction_type: SanctionType::Warning,
            reason: "tone".to_string(),
            duration_hours: Some(2),
            report_id: None,
            content_id: None,
        };
        assert!(matches!(
            service.create(&moderator(), warning_with_duration).await,
            Err(ModerationError::Validation(_))
        ));

        let ban = NewSanction {
            user_id: UserId::from("u-1"),
            sanction_type: SanctionType::PermanentBan,
            reason: "ban evasion".to_string(),
            duration_hours: None,
            report_id: None,
            content_id: None,
        };
        let created = service.create(&admin(), ban).await.unwrap();
        assert!(created.ends_at.is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_duration_is_a_validation_error() {
        let (service, _, _) = setup();
        // i64::MAX exceeds what chrono can hold as a delta; four billion
        // hours fits the delta but lands past the calendar range.
        for hours in [i64::MAX, 4_000_000_000] {
            let result = service.create(&moderator(), suspension("u-1", hours)).await;
            assert!(matches!(result, Err(ModerationError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_self_sanction_and_member_issuance_are_rejected() {
        let (service, _, _) = setup();
        assert!(matches!(
            service.create(&moderator(), suspension("mod-1", 1)).await,
            Err(ModerationError::Validation(_))
        ));
        let member = Caller::new("user-1", Role::Member);
        assert!(matches!(
            service.create(&member, suspension("u-2", 1)).await,
            Err(ModerationError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_prior_sanction_count_tracks_history() {
        let (service, _, _) = setup();
        let first = service
            .create(
                &moderator(),
                NewSanction {
                    user_id: UserId::from("u-1"),
                    sanction_type: SanctionType::Warning,
                    reason: "first".to_string(),
                    duration_hours: None,
                    report_id: None,
                    content_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(first.prior_sanction_count, 0);

        let second = service
            .create(&moderator(), suspension("u-1", 24))
            .await
            .unwrap();
        assert_eq!(second.prior_sanction_count, 1);
    }

    #[tokio::test]
    async fn test_revoke_is_admin_only_and_terminal() {
        let (service, _, notifier) = setup();
        let sanction = service
            .create(&moderator(), suspension("u-1", 24))
            .await
            .unwrap();

        assert!(matches!(
            service.revoke(&moderator(), &sanction.id, "oops").await,
            Err(ModerationError::Forbidden(_))
        ));

        let revoked = service
            .revoke(&admin(), &sanction.id, "issued in error")
            .await
            .unwrap();
        assert!(!revoked.is_active);
        let revocation = revoked.revocation.expect("revocation record");
        assert_eq!(revocation.revoked_by, UserId::from("admin-1"));
        assert_eq!(revocation.reason, "issued in error");

        assert!(matches!(
            service.revoke(&admin(), &sanction.id, "again").await,
            Err(ModerationError::Conflict(_))
        ));

        let status = service.user_status(&UserId::from("u-1")).await.unwrap();
        assert!(status.can_post);

        let sent = notifier.user_notifications().await;
        assert!(sent
            .iter()
            .any(|(_, n)| matches!(n, Notification::SanctionRevoked { .. })));
    }

    #[tokio::test]
    async fn test_appeal_is_owner_only_and_single_shot() {
        let (service, _, notifier) = setup();
        let sanction = service
            .create(&moderator(), suspension("u-1", 24))
            .await
            .unwrap();

        let stranger = Caller::new("u-2", Role::Member);
        assert!(matches!(
            service.appeal(&stranger, &sanction.id, "unfair").await,
            Err(ModerationError::Forbidden(_))
        ));

        let owner = Caller::new("u-1", Role::Member);
        let appealed = service
            .appeal(&owner, &sanction.id, "I was quoting someone")
            .await
            .unwrap();
        assert_eq!(appealed.appeal_status(), Some(AppealStatus::Pending));

        assert!(matches!(
            service.appeal(&owner, &sanction.id, "please").await,
            Err(ModerationError::Conflict(_))
        ));

        assert!(notifier
            .moderator_notifications()
            .await
            .iter()
            .any(|n| matches!(n, Notification::AppealFiled { .. })));
    }

    #[tokio::test]
    async fn test_appeal_on_inactive_sanction_conflicts() {
        let (service, _, _) = setup();
        let sanction = service
            .create(&moderator(), suspension("u-1", 24))
            .await
            .unwrap();
        service.revoke(&admin(), &sanction.id, "lifted").await.unwrap();

        let owner = Caller::new("u-1", Role::Member);
        assert!(matches!(
            service.appeal(&owner, &sanction.id, "moot").await,
            Err(ModerationError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_approved_appeal_restores_posting() {
        let (service, _, _) = setup();
        let sanction = service
            .create(&moderator(), suspension("u-1", 24))
            .await
            .unwrap();
        let owner = Caller::new("u-1", Role::Member);
        service
            .appeal(&owner, &sanction.id, "context was missing")
            .await
            .unwrap();

        assert!(!service
            .user_status(&UserId::from("u-1"))
            .await
            .unwrap()
            .can_post);

        let decided = service
            .review_appeal(&admin(), &sanction.id, true, Some("agreed".into()))
            .await
            .unwrap();
        assert_eq!(decided.appeal_status(), Some(AppealStatus::Approved));
        assert!(!decided.is_active);

        let status = service.user_status(&UserId::from("u-1")).await.unwrap();
        assert!(status.can_post);
        assert!(!status.is_sanctioned);
    }

    #[tokio::test]
    async fn test_denied_appeal_keeps_sanction_active() {
        let (service, _, _) = setup();
        let sanction = service
            .create(&moderator(), suspension("u-1", 24))
            .await
            .unwrap();
        let owner = Caller::new("u-1", Role::Member);
        service.appeal(&owner, &sanction.id, "unfair").await.unwrap();

        let decided = service
            .review_appeal(&admin(), &sanction.id, false, None)
            .await
            .unwrap();
        assert_eq!(decided.appeal_status(), Some(AppealStatus::Denied));
        assert!(decided.is_active);

        // The appeal is settled; a second review has nothing pending.
        assert!(matches!(
            service.review_appeal(&admin(), &sanction.id, true, None).await,
            Err(ModerationError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_review_without_pending_appeal_conflicts() {
        let (service, _, _) = setup();
        let sanction = service
            .create(&moderator(), suspension("u-1", 24))
            .await
            .unwrap();
        assert!(matches!(
            service.review_appeal(&admin(), &sanction.id, true, None).await,
            Err(ModerationError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_writes_are_audited_in_order() {
        let (service, store, _) = setup();
        let sanction = service
            .create(&moderator(), suspension("u-1", 24))
            .await
            .unwrap();
        let owner = Caller::new("u-1", Role::Member);
        service.appeal(&owner, &sanction.id, "unfair").await.unwrap();
        service
            .review_appeal(&admin(), &sanction.id, true, None)
            .await
            .unwrap();

        let entries: Vec<_> = store
            .log_entries(&ModLogQuery {
                limit: 50,
                ..ModLogQuery::default()
            })
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.sanction_id == Some(sanction.id))
            .collect();

        // Most recent first: the approval, then the issuance. Filing an
        // appeal is a user action and is not a moderation log entry.
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, LogAction::AppealApproved);
        assert_eq!(entries[1].action, LogAction::Suspend);
        assert!(entries[0].seq > entries[1].seq);
    }
}
