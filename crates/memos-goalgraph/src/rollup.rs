//! Progress rollup (§4.6): `percent_complete = 100 * done / total` over
//! actionable nodes (subgoal, task, milestone).

use crate::model::{GoalNode, NodeStatus, ProgressRollup};

/// `NodeType` only ever has `Subgoal`/`Task`/`Milestone` variants, so every
/// node is actionable; this stays a named filter rather than being inlined
/// away so a future non-actionable node type has somewhere to plug in.
fn is_actionable(_node: &GoalNode) -> bool {
    true
}

/// `confidence` passed in is the owning goal's own confidence; the rollup
/// reports it alongside the node counts rather than averaging node
/// confidences, since nodes don't carry an independent confidence signal
/// strong enough to outweigh the goal's own estimate.
pub fn compute_rollup(nodes: &[GoalNode], goal_confidence: f64) -> ProgressRollup {
    let actionable: Vec<&GoalNode> = nodes.iter().filter(|n| is_actionable(n)).collect();
    let total_nodes = actionable.len();
    let completed_nodes = actionable.iter().filter(|n| n.status == NodeStatus::Done).count();

    let percent_complete = if total_nodes == 0 {
        0.0
    } else {
        100.0 * completed_nodes as f64 / total_nodes as f64
    };

    ProgressRollup {
        percent_complete,
        completed_nodes,
        total_nodes,
        confidence: goal_confidence.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeType;
    use memos_core::new_id;
    use serde_json::Value;

    fn node(goal_id: memos_core::GoalId, status: NodeStatus) -> GoalNode {
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
            blockers: Value::Null,
            confidence: 0.5,
            completed_at: None,
        }
    }

    #[test]
    fn zero_total_nodes_yields_zero_percent() {
        let rollup = compute_rollup(&[], 0.8);
        assert_eq!(rollup.percent_complete, 0.0);
        assert_eq!(rollup.total_nodes, 0);
    }

    #[test]
    fn percent_complete_is_done_over_total() {
        let goal_id = new_id();
        let nodes = vec![
            node(goal_id, NodeStatus::Done),
            node(goal_id, NodeStatus::Done),
            node(goal_id, NodeStatus::Todo),
            node(goal_id, NodeStatus::InProgress),
        ];
        let rollup = compute_rollup(&nodes, 0.9);
        assert_eq!(rollup.completed_nodes, 2);
        assert_eq!(rollup.total_nodes, 4);
        assert_eq!(rollup.percent_complete, 50.0);
        assert_eq!(rollup.confidence, 0.9);
    }

    #[test]
    fn cancelled_nodes_still_count_toward_total() {
        let goal_id = new_id();
        let nodes = vec![
            node(goal_id, NodeStatus::Done),
            node(goal_id, NodeStatus::Cancelled),
        ];
        let rollup = compute_rollup(&nodes, 0.5);
        assert_eq!(rollup.total_nodes, 2);
        assert_eq!(rollup.percent_complete, 50.0);
    }
}
