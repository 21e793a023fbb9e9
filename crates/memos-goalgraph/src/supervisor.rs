//! Meta-supervisor (§4.6): a last-line gate on goal mutations that the
//! ordinary permission checks don't cover, because they're about
//! plausibility rather than authorization.

use crate::model::GoalType;
use memos_core::Scope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorDecision {
    Allow,
    Reject(String),
}

impl SupervisorDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, SupervisorDecision::Allow)
    }
}

/// A `policy` goal may not be marked completed without enough evidence
/// links backing it up — policy goals represent organizational commitments,
/// not personal checklists, so "done" needs to be substantiated.
pub fn review_completion(
    goal_type: GoalType,
    is_completing: bool,
    evidence_link_count: usize,
    min_evidence_links: usize,
) -> SupervisorDecision {
    if goal_type == GoalType::Policy && is_completing && evidence_link_count < min_evidence_links {
        return SupervisorDecision::Reject(format!(
            "policy goal requires at least {min_evidence_links} evidence link(s) before completion, has {evidence_link_count}"
        ));
    }
    SupervisorDecision::Allow
}

/// A memory scoped more narrowly than the goal it's being linked to as
/// evidence would leak restricted content to everyone who can see the goal.
pub fn review_evidence_link(memory_scope: Scope, goal_scope: Scope) -> SupervisorDecision {
    if scope_rank(memory_scope) < scope_rank(goal_scope) {
        return SupervisorDecision::Reject(format!(
            "memory scoped to {:?} cannot be linked as evidence on a goal scoped to {:?}",
            memory_scope, goal_scope
        ));
    }
    SupervisorDecision::Allow
}

fn scope_rank(scope: Scope) -> u8 {
    match scope {
        Scope::Personal => 0,
        Scope::Team => 1,
        Scope::Department => 2,
        Scope::Division => 3,
        Scope::Organization => 4,
        Scope::Global => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_goal_completion_rejected_without_enough_evidence() {
        let decision = review_completion(GoalType::Policy, true, 1, 3);
        assert!(!decision.is_allowed());
    }

    #[test]
    fn policy_goal_completion_allowed_with_enough_evidence() {
        let decision = review_completion(GoalType::Policy, true, 3, 3);
        assert!(decision.is_allowed());
    }

    #[test]
    fn non_policy_goal_completion_is_never_gated() {
        let decision = review_completion(GoalType::Task, true, 0, 3);
        assert!(decision.is_allowed());
    }

    #[test]
    fn restricted_memory_cannot_evidence_a_broader_scoped_goal() {
        let decision = review_evidence_link(Scope::Personal, Scope::Organization);
        assert!(!decision.is_allowed());
    }

    #[test]
    fn equal_or_broader_scoped_memory_is_allowed_as_evidence() {
        assert!(review_evidence_link(Scope::Organization, Scope::Organization).is_allowed());
        assert!(review_evidence_link(Scope::Global, Scope::Team).is_allowed());
    }
}
