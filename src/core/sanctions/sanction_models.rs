use crate::core::audit::LogAction;
use crate::core::ids::{ContentId, ReportId, SanctionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sanction types in ascending severity. Declaration order gives
/// `Warning < TemporarySuspension < PermanentBan`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanctionType {
    Warning,
    TemporarySuspension,
    PermanentBan,
}

impl SanctionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::TemporarySuspension => "temporary_suspension",
            Self::PermanentBan => "permanent_ban",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "warning" => Some(Self::Warning),
            "temporary_suspension" => Some(Self::TemporarySuspension),
            "permanent_ban" => Some(Self::PermanentBan),
            _ => None,
        }
    }

    /// Whether this type restricts posting and discussion creation.
    pub fn restricts_capabilities(&self) -> bool {
        matches!(self, Self::TemporarySuspension | Self::PermanentBan)
    }

    /// The log action recorded when a sanction of this type is issued.
    pub fn log_action(&self) -> LogAction {
        match self {
            Self::Warning => LogAction::Warn,
            Self::TemporarySuspension => LogAction::Suspend,
            Self::PermanentBan => LogAction::Ban,
        }
    }
}

impl std::fmt::Display for SanctionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Pending,
    Approved,
    Denied,
}

impl AppealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

/// Appeal sub-record. Present once the sanctioned user has appealed;
/// at most one appeal per sanction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealRecord {
    pub reason: String,
    pub status: AppealStatus,
    pub filed_at: DateTime<Utc>,
    pub reviewed_by: Option<UserId>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl AppealRecord {
    pub fn pending(reason: String, now: DateTime<Utc>) -> Self {
        Self {
            reason,
            status: AppealStatus::Pending,
            filed_at: now,
            reviewed_by: None,
            review_notes: None,
            reviewed_at: None,
        }
    }
}

/// Revocation sub-record, present once an admin explicitly lifts the
/// sanction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub revoked_by: UserId,
    pub reason: String,
    pub revoked_at: DateTime<Utc>,
}

/// A restriction on one user.
///
/// `is_active` is the explicit flag; temporary sanctions additionally expire
/// implicitly once `ends_at` passes. Expiry is evaluated lazily at read time
/// through [`is_currently_active`], never by a background sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sanction {
    pub id: SanctionId,
    pub user_id: UserId,
    pub issued_by: UserId,
    pub sanction_type: SanctionType,
    pub reason: String,
    pub starts_at: DateTime<Utc>,
    /// Set only for temporary suspensions.
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub appeal: Option<AppealRecord>,
    pub revocation: Option<RevocationRecord>,
    /// The report that triggered the sanction, if any.
    pub report_id: Option<ReportId>,
    /// The content that triggered the sanction, if any.
    pub content_id: Option<ContentId>,
    /// How many sanctions this user already had when this one was issued.
    pub prior_sanction_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Sanction {
    pub fn appeal_status(&self) -> Option<AppealStatus> {
        self.appeal.as_ref().map(|a| a.status)
    }
}

/// The one place expiry is decided. Active means the flag is set and, for
/// temporary sanctions, the end date has not passed.
pub fn is_currently_active(sanction: &Sanction, now: DateTime<Utc>) -> bool {
    sanction.is_active && sanction.ends_at.map_or(true, |ends_at| ends_at > now)
}

/// Fields accepted when issuing a sanction. `duration_hours` is required
/// for temporary suspensions and rejected for every other type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewSanction {
    pub user_id: UserId,
    pub sanction_type: SanctionType,
    pub reason: String,
    #[serde(default)]
    pub duration_hours: Option<i64>,
    #[serde(default)]
    pub report_id: Option<ReportId>,
    #[serde(default)]
    pub content_id: Option<ContentId>,
}

/// Derived restriction status for one user at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSanctionStatus {
    pub user_id: UserId,
    pub is_sanctioned: bool,
    /// The highest-severity currently-active sanction, if any.
    pub active_sanction: Option<Sanction>,
    pub can_post: bool,
    pub can_create_discussion: bool,
    /// End of the restriction when the governing sanction is temporary.
    pub restricted_until: Option<DateTime<Utc>>,
}

/// Folds a user's sanction history into their current status. Pure; `now`
/// is passed in so expiry behavior is directly testable.
pub fn derive_status(
    user_id: UserId,
    sanctions: &[Sanction],
    now: DateTime<Utc>,
) -> UserSanctionStatus {
    let governing = sanctions
        .iter()
        .filter(|s| is_currently_active(s, now))
        .max_by(|a, b| {
            a.sanction_type
                .cmp(&b.sanction_type)
                .then(a.starts_at.cmp(&b.starts_at))
        })
        .cloned();

    let restricts = governing
        .as_ref()
        .map(|s| s.sanction_type.restricts_capabilities())
        .unwrap_or(false);

    let restricted_until = governing.as_ref().and_then(|s| {
        if s.sanction_type == SanctionType::TemporarySuspension {
            s.ends_at
        } else {
            None
        }
    });

    UserSanctionStatus {
        user_id,
        is_sanctioned: governing.is_some(),
        active_sanction: governing,
        can_post: !restricts,
        can_create_discussion: !restricts,
        restricted_until,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sanction(
        sanction_type: SanctionType,
        ends_at: Option<DateTime<Utc>>,
        is_active: bool,
    ) -> Sanction {
        Sanction {
            id: SanctionId::new(),
            user_id: UserId::from("u-1"),
            issued_by: UserId::from("mod-1"),
            sanction_type,
            reason: "spam".to_string(),
            starts_at: Utc::now() - Duration::hours(1),
            ends_at,
            is_active,
            appeal: None,
            revocation: None,
            report_id: None,
            content_id: None,
            prior_sanction_count: 0,
            created_at: Utc::now() - Duration::hours(1),
        }
    }

    #[test]
    fn expired_suspension_reads_inactive_without_revocation() {
        let now = Utc::now();
        let expired = sanction(
            SanctionType::TemporarySuspension,
            Some(now - Duration::hours(2)),
            true,
        );
        assert!(expired.is_active);
        assert!(!is_currently_active(&expired, now));

        let status = derive_status(UserId::from("u-1"), &[expired], now);
        assert!(!status.is_sanctioned);
        assert!(status.can_post);
    }

    #[test]
    fn warnings_do_not_restrict_capabilities() {
        let now = Utc::now();
        let warning = sanction(SanctionType::Warning, None, true);
        let status = derive_status(UserId::from("u-1"), &[warning], now);
        assert!(status.is_sanctioned);
        assert!(status.can_post);
        assert!(status.can_create_discussion);
        assert!(status.restricted_until.is_none());
    }

    #[test]
    fn highest_severity_sanction_governs() {
        let now = Utc::now();
        let warning = sanction(SanctionType::Warning, None, true);
        let suspension = sanction(
            SanctionType::TemporarySuspension,
            Some(now + Duration::hours(24)),
            true,
        );
        let status = derive_status(UserId::from("u-1"), &[warning, suspension.clone()], now);
        assert_eq!(
            status.active_sanction.as_ref().map(|s| s.id),
            Some(suspension.id)
        );
        assert!(!status.can_post);
        assert_eq!(status.restricted_until, suspension.ends_at);
    }

    #[test]
    fn permanent_ban_has_no_restriction_end() {
        let now = Utc::now();
        let ban = sanction(SanctionType::PermanentBan, None, true);
        let status = derive_status(UserId::from("u-1"), &[ban], now);
        assert!(status.is_sanctioned);
        assert!(!status.can_post);
        assert!(status.restricted_until.is_none());
    }

    #[test]
    fn revoked_sanctions_never_govern() {
        let now = Utc::now();
        let revoked = sanction(SanctionType::PermanentBan, None, false);
        let status = derive_status(UserId::from("u-1"), &[revoked], now);
        assert!(!status.is_sanctioned);
        assert!(status.active_sanction.is_none());
    }
}
