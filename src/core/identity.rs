// Caller identity and role checks.
//
// Authentication happens upstream; every operation receives an already
// verified caller. These helpers only decide whether that caller may do
// the thing they are asking for.

use crate::core::error::{ModResult, ModerationError};
use crate::core::ids::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Moderator,
    Admin,
}

/// The authenticated principal an operation runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Moderators and admins both count as moderation staff.
    pub fn is_moderator(&self) -> bool {
        self.role >= Role::Moderator
    }
}

pub fn require_admin(caller: &Caller) -> ModResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ModerationError::Forbidden(
            "administrator role required".to_string(),
        ))
    }
}

pub fn require_moderator(caller: &Caller) -> ModResult<()> {
    if caller.is_moderator() {
        Ok(())
    } else {
        Err(ModerationError::Forbidden(
            "moderator role required".to_string(),
        ))
    }
}

/// Admins always pass; otherwise the caller must be the given owner.
pub fn require_admin_or_owner(caller: &Caller, owner_id: &UserId) -> ModResult<()> {
    if caller.is_admin() || caller.user_id == *owner_id {
        Ok(())
    } else {
        Err(ModerationError::Forbidden(
            "administrator role or ownership required".to_string(),
        ))
    }
}
