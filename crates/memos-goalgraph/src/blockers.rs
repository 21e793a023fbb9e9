//! Blocker detection (§4.6): a goal becomes blocked when any of its nodes
//! is itself blocked, carries a blocker annotation, or depends on a node
//! that isn't done yet.

use crate::model::{EdgeType, Goal, GoalActivityLog, GoalEdge, GoalNode, GoalStatus, NodeStatus};
use crate::repo::{GoalActivityLogRepo, GoalRepo, GoalStoreError};
use serde_json::json;
use std::collections::HashMap;

/// Returns the titles of blocking nodes, empty if none.
pub fn detect_blockers(nodes: &[GoalNode], edges: &[GoalEdge]) -> Vec<String> {
    let by_id: HashMap<_, _> = nodes.iter().map(|n| (n.id, n)).collect();
    let mut blocked_titles = Vec::new();

    for node in nodes {
        if node.has_blockers() {
            blocked_titles.push(node.title.clone());
            continue;
        }
        let depends_on_unfinished = edges.iter().any(|e| {
            e.edge_type == EdgeType::DependsOn
                && e.from_node_id == node.id
                && by_id.get(&e.to_node_id).map(|t| t.status != NodeStatus::Done).unwrap_or(false)
        });
        if depends_on_unfinished {
            blocked_titles.push(node.title.clone());
        }
    }

    blocked_titles
}

/// Applies detection to a goal: if blockers are found and the goal is
/// currently active, flips it to `blocked` and logs an `escalate_blockers`
/// activity event. No-op otherwise.
pub async fn escalate_if_blocked(
    goal_repo: &dyn GoalRepo,
    activity_repo: &dyn GoalActivityLogRepo,
    mut goal: Goal,
    nodes: &[GoalNode],
    edges: &[GoalEdge],
) -> Result<Goal, GoalStoreError> {
    let blocking = detect_blockers(nodes, edges);
    if blocking.is_empty() || goal.status != GoalStatus::Active {
        return Ok(goal);
    }

    goal.status = GoalStatus::Blocked;
    goal.updated_at = chrono::Utc::now();
    goal_repo.update(goal.clone()).await?;

    let event = GoalActivityLog::new(&goal, "escalate_blockers", json!({ "blocking_nodes": blocking }));
    activity_repo.append(event).await?;

    Ok(goal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoalType, NodeType, OwnerType};
    use crate::repo::{InMemoryGoalActivityLogRepo, InMemoryGoalRepo};
    use memos_core::{new_id, Scope};
    use serde_json::Value;

    fn node(goal_id: memos_core::GoalId, status: NodeStatus, blockers: Value) -> GoalNode {
        GoalNode {
            id: new_id(),
            goal_id,
            parent_node_id: None,
            node_type: NodeType::Task,
            title: "n".into(),
            status,
            priority: 0,
            assignees: Vec::new(),
            ordering: 0,
            expected_outputs: Value::Null,
            success_criteria: Value::Null,
            blockers,
            confidence: 0.5,
            completed_at: None,
        }
    }

    #[test]
    fn node_with_blocked_status_is_detected() {
        let goal_id = new_id();
        let n = node(goal_id, NodeStatus::Blocked, Value::Null);
        assert_eq!(detect_blockers(&[n], &[]).len(), 1);
    }

    #[test]
    fn non_empty_blockers_json_is_detected() {
        let goal_id = new_id();
        let n = node(goal_id, NodeStatus::Todo, json!(["waiting on legal"]));
        assert_eq!(detect_blockers(&[n], &[]).len(), 1);
    }

    #[test]
    fn depends_on_unfinished_target_is_detected() {
        let goal_id = new_id();
        let a = node(goal_id, NodeStatus::Todo, Value::Null);
        let b = node(goal_id, NodeStatus::Todo, Value::Null);
        let edge = GoalEdge { from_node_id: a.id, to_node_id: b.id, edge_type: EdgeType::DependsOn };
        assert_eq!(detect_blockers(&[a, b], &[edge]).len(), 1);
    }

    #[test]
    fn depends_on_done_target_is_not_blocked() {
        let goal_id = new_id();
        let a = node(goal_id, NodeStatus::Todo, Value::Null);
        let mut b = node(goal_id, NodeStatus::Todo, Value::Null);
        b.status = NodeStatus::Done;
        let edge = GoalEdge { from_node_id: a.id, to_node_id: b.id, edge_type: EdgeType::DependsOn };
        assert!(detect_blockers(&[a, b], &[edge]).is_empty());
    }

    #[tokio::test]
    async fn escalation_flips_active_goal_to_blocked_and_logs_event() {
        let goal_repo = InMemoryGoalRepo::default();
        let activity_repo = InMemoryGoalActivityLogRepo::default();
        let org = new_id();
        let mut goal = Goal::propose(org, new_id(), OwnerType::User, new_id(), "g", GoalType::Project, Scope::Personal, None, 0.8);
        goal.status = GoalStatus::Active;
        goal_repo.insert(goal.clone()).await.unwrap();

        let n = node(goal.id, NodeStatus::Blocked, Value::Null);
        let updated = escalate_if_blocked(&goal_repo, &activity_repo, goal.clone(), &[n], &[]).await.unwrap();
        assert_eq!(updated.status, GoalStatus::Blocked);

        let events = activity_repo.list_for_goal(goal.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "escalate_blockers");
    }

    #[tokio::test]
    async fn no_blockers_leaves_goal_untouched() {
        let goal_repo = InMemoryGoalRepo::default();
        let activity_repo = InMemoryGoalActivityLogRepo::default();
        let org = new_id();
        let mut goal = Goal::propose(org, new_id(), OwnerType::User, new_id(), "g", GoalType::Project, Scope::Personal, None, 0.8);
        goal.status = GoalStatus::Active;

        let n = node(goal.id, NodeStatus::Todo, Value::Null);
        let updated = escalate_if_blocked(&goal_repo, &activity_repo, goal.clone(), &[n], &[]).await.unwrap();
        assert_eq!(updated.status, GoalStatus::Active);
        assert!(activity_repo.list_for_goal(goal.id).await.unwrap().is_empty());
    }
}
