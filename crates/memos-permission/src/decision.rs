//! `check_memory_access` / `filter_memory_ids_with_access` (§4.1): the single
//! decision function and its batched form. Both must produce identical
//! allow-sets on identical inputs -- enforced by routing the batched form
//! through the same per-item function rather than a separate fast path.

use crate::model::{
    Action, AccessDecision, AccessMethod, MemoryFacts, MemorySharing, TeamMembership, TeamRole,
};
use chrono::{DateTime, Utc};
use memos_core::{Scope, TenantContext, UserId};
use serde_json::json;

/// Decision order is first-match-wins, exactly as enumerated in §4.1.
pub fn check_memory_access<M: MemoryFacts>(
    ctx: &TenantContext,
    memory: Option<&M>,
    action: Action,
    team_memberships: &[TeamMembership],
    sharing: &[MemorySharing],
    now: DateTime<Utc>,
) -> AccessDecision {
    let memory = match memory {
        Some(m) if m.is_active() => m,
        _ => return AccessDecision::deny(AccessMethod::NotFound, "memory not found"),
    };

    if memory.organization_id() != ctx.organization_id {
        return AccessDecision::deny(AccessMethod::OrgIsolation, "memory belongs to another org")
            .with_details(json!({ "memory_id": memory.id() }));
    }

    if memory.required_clearance() > ctx.clearance {
        return AccessDecision::deny(
            AccessMethod::Clearance,
            "insufficient clearance for memory classification",
        );
    }

    if let Some(user_id) = ctx.actor.user_id() {
        if user_id == memory.owner_user_id() {
            return AccessDecision::allow(AccessMethod::Own, "user owns the memory");
        }
    }

    if memory.scope() == Scope::Team {
        if let Some(scope_id) = memory.scope_id() {
            if let Some(membership) = team_memberships.iter().find(|m| m.team_id == scope_id) {
                if team_role_allows(membership.role, action) {
                    return AccessDecision::allow(
                        AccessMethod::Team,
                        format!("team membership role {:?} permits {:?}", membership.role, action),
                    );
                }
            }
        }
    }

    if let Some(user_id) = ctx.actor.user_id() {
        let user_teams: Vec<_> = team_memberships.iter().map(|m| m.team_id).collect();
        if let Some(grant) = active_sharing_for(sharing, memory.id(), user_id, &user_teams, now) {
            if grant.permission.satisfies(action) {
                return AccessDecision::allow(AccessMethod::Share, "explicit share grant");
            }
        }
    }

    if matches!(memory.scope(), Scope::Organization | Scope::Global) && action == Action::Read {
        return AccessDecision::allow(AccessMethod::Scope, "organization/global scope read");
    }

    AccessDecision::deny(AccessMethod::None, "no matching grant")
}

fn team_role_allows(role: TeamRole, action: Action) -> bool {
    match action {
        Action::Read | Action::Comment => true,
        Action::Write | Action::Share => matches!(role, TeamRole::Lead | TeamRole::Admin),
        Action::Delete => matches!(role, TeamRole::Admin),
        Action::Create => false,
    }
}

fn active_sharing_for<'a>(
    sharing: &'a [MemorySharing],
    memory_id: memos_core::MemoryId,
    user_id: UserId,
    user_teams: &[memos_core::TeamId],
    now: DateTime<Utc>,
) -> Option<&'a MemorySharing> {
    sharing.iter().find(|s| {
        s.memory_id == memory_id && s.is_active(now) && s.applies_to(user_id, user_teams)
    })
}

/// Batched form of `check_memory_access`. Must agree with the per-item
/// function on every id (§8 testable property); implemented by delegating
/// to it rather than any independent shortcut.
pub fn filter_memory_ids_with_access<M: MemoryFacts>(
    ctx: &TenantContext,
    memories: &[M],
    action: Action,
    team_memberships: &[TeamMembership],
    sharing: &[MemorySharing],
    now: DateTime<Utc>,
) -> Vec<memos_core::MemoryId> {
    memories
        .iter()
        .filter(|m| {
            check_memory_access(ctx, Some(*m), action, team_memberships, sharing, now).allowed
        })
        .map(|m| m.id())
        .collect()
}
