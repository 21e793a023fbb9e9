//! Per-request tenant context (C1). An explicit struct threaded through every
//! call instead of a thread-local, per the design note in spec §9: the
//! database session variables that back row-level security are derived from
//! this struct at transaction start, never from ambient state.

use crate::ids::{OrganizationId, TraceId, UserId};
use serde::{Deserialize, Serialize};

/// The actor that issued a request. A normal request carries a `User`;
/// background workers (§4.5) run as `System` so RLS still applies to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    User(UserId),
    System,
}

impl Actor {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::System => None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Actor::System)
    }
}

/// Per-request tenant context: who is asking, on whose behalf, with what
/// standing, and for which trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub actor: Actor,
    pub organization_id: OrganizationId,
    pub roles: Vec<String>,
    pub clearance: i32,
    pub trace_id: TraceId,
    pub justification: Option<String>,
}

impl TenantContext {
    pub fn for_user(
        user_id: UserId,
        organization_id: OrganizationId,
        roles: Vec<String>,
        clearance: i32,
    ) -> Self {
        Self {
            actor: Actor::User(user_id),
            organization_id,
            roles,
            clearance,
            trace_id: crate::ids::new_id(),
            justification: None,
        }
    }

    /// Constructs the context maintenance workers (§4.5) run under. System
    /// actors carry the organization's maximum clearance so a worker is never
    /// blocked by its own gate, but they are still subject to the org check.
    pub fn system(organization_id: OrganizationId, system_user_env: Option<UserId>) -> Self {
        Self {
            actor: system_user_env
                .map(Actor::User)
                .unwrap_or(Actor::System),
            organization_id,
            roles: vec!["system".to_string()],
            clearance: i32::MAX,
            trace_id: crate::ids::new_id(),
            justification: Some("system-maintenance".to_string()),
        }
    }

    pub fn with_justification(mut self, reason: impl Into<String>) -> Self {
        self.justification = Some(reason.into());
        self
    }

    pub fn with_trace(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Projection used to stamp the Postgres session variables the
    /// in-database RLS policy (§4.1) evaluates against. The application
    /// kernel and the DB policy must agree on every field here.
    pub fn session_vars(&self) -> TenantSessionVars {
        TenantSessionVars {
            current_org_id: self.organization_id,
            current_user_id: self.actor.user_id(),
            current_roles: self.roles.clone(),
            current_clearance_level: self.clearance,
        }
    }
}

/// The exact set of session variables a DB handle must set, inside a
/// transaction, before issuing any query (§4.1, §5 locking discipline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantSessionVars {
    pub current_org_id: OrganizationId,
    pub current_user_id: Option<UserId>,
    pub current_roles: Vec<String>,
    pub current_clearance_level: i32,
}

impl TenantSessionVars {
    /// Renders the `SET LOCAL` statements a connection trait issues at the
    /// start of a transaction. Kept as data rather than executed here: the
    /// actual database is an external collaborator (§1).
    pub fn as_set_local_statements(&self) -> Vec<String> {
        let mut stmts = vec![
            format!(
                "SET LOCAL app.current_org_id = '{}'",
                self.current_org_id
            ),
            format!(
                "SET LOCAL app.current_roles = '{}'",
                self.current_roles.join(",")
            ),
            format!(
                "SET LOCAL app.current_clearance_level = '{}'",
                self.current_clearance_level
            ),
        ];
        if let Some(user_id) = self.current_user_id {
            stmts.push(format!("SET LOCAL app.current_user_id = '{user_id}'"));
        }
        stmts
    }
}
