use chrono::{DateTime, Utc};
use memos_core::{MemoryId, OrganizationId, RoleId, Scope, TeamId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Comment,
    Write,
    Share,
    Delete,
    Create,
}

impl Action {
    pub fn as_permission_action(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Comment => "comment",
            Action::Write => "write",
            Action::Share => "share",
            Action::Delete => "delete",
            Action::Create => "create",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Member,
    Lead,
    Admin,
}

#[derive(Debug, Clone, Copy)]
pub struct TeamMembership {
    pub team_id: TeamId,
    pub role: TeamRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareType {
    User,
    Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharePermission {
    Read,
    Comment,
    Edit,
}

impl SharePermission {
    /// Whether a grant at this level satisfies the requested action.
    pub fn satisfies(&self, action: Action) -> bool {
        match action {
            Action::Read => true,
            Action::Comment => *self >= SharePermission::Comment,
            Action::Write => *self >= SharePermission::Edit,
            Action::Share | Action::Delete | Action::Create => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemorySharing {
    pub memory_id: MemoryId,
    pub share_type: ShareType,
    pub target_id: Uuid,
    pub permission: SharePermission,
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemorySharing {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }

    /// True when this grant applies to `user_id`, either directly or through
    /// one of `user_teams`.
    pub fn applies_to(&self, user_id: UserId, user_teams: &[TeamId]) -> bool {
        match self.share_type {
            ShareType::User => self.target_id == user_id,
            ShareType::Team => user_teams.contains(&self.target_id),
        }
    }
}

/// The facts the decision engine needs about a memory. Implemented by
/// `memos-store`'s `Memory` aggregate; kept as a trait here so the
/// permission kernel never depends on the storage crate (storage depends on
/// permission, not the reverse).
pub trait MemoryFacts {
    fn id(&self) -> MemoryId;
    fn organization_id(&self) -> OrganizationId;
    fn is_active(&self) -> bool;
    fn required_clearance(&self) -> i32;
    fn owner_user_id(&self) -> UserId;
    fn scope(&self) -> Scope;
    fn scope_id(&self) -> Option<Uuid>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMethod {
    Own,
    Team,
    Share,
    Scope,
    Clearance,
    OrgIsolation,
    NotFound,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
    pub method: AccessMethod,
    pub details: serde_json::Value,
}

impl AccessDecision {
    pub fn allow(method: AccessMethod, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            method,
            details: serde_json::json!({}),
        }
    }

    pub fn deny(method: AccessMethod, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            method,
            details: serde_json::json!({}),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Role {
    pub id: RoleId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UserRoleAssignment {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub organization_id: OrganizationId,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserRoleAssignment {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}
