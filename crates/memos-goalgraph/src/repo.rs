//! Persistence contracts for the goal graph (§3, §4.6). In-memory fakes
//! stand in for the Postgres tables the real system uses.

use crate::model::{Goal, GoalActivityLog, GoalEdge, GoalMemoryLink, GoalNode};
use async_trait::async_trait;
use memos_core::{GoalId, GoalNodeId, MemoryId, OrganizationId};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum GoalStoreError {
    #[error("goal not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait GoalRepo: Send + Sync {
    async fn insert(&self, goal: Goal) -> Result<(), GoalStoreError>;
    async fn update(&self, goal: Goal) -> Result<(), GoalStoreError>;
    async fn get(&self, organization_id: OrganizationId, goal_id: GoalId) -> Result<Option<Goal>, GoalStoreError>;
}

#[derive(Default)]
pub struct InMemoryGoalRepo {
    rows: parking_lot::Mutex<HashMap<GoalId, Goal>>,
}

#[async_trait]
impl GoalRepo for InMemoryGoalRepo {
    async fn insert(&self, goal: Goal) -> Result<(), GoalStoreError> {
        self.rows.lock().insert(goal.id, goal);
        Ok(())
    }

    async fn update(&self, goal: Goal) -> Result<(), GoalStoreError> {
        let mut rows = self.rows.lock();
        if !rows.contains_key(&goal.id) {
            return Err(GoalStoreError::NotFound);
        }
        rows.insert(goal.id, goal);
        Ok(())
    }

    async fn get(&self, organization_id: OrganizationId, goal_id: GoalId) -> Result<Option<Goal>, GoalStoreError> {
        Ok(self
            .rows
            .lock()
            .get(&goal_id)
            .filter(|g| g.organization_id == organization_id)
            .cloned())
    }
}

#[async_trait]
pub trait GoalNodeRepo: Send + Sync {
    async fn upsert(&self, node: GoalNode) -> Result<(), GoalStoreError>;
    async fn list_for_goal(&self, goal_id: GoalId) -> Result<Vec<GoalNode>, GoalStoreError>;
}

#[derive(Default)]
pub struct InMemoryGoalNodeRepo {
    rows: parking_lot::Mutex<HashMap<GoalNodeId, GoalNode>>,
}

#[async_trait]
impl GoalNodeRepo for InMemoryGoalNodeRepo {
    async fn upsert(&self, node: GoalNode) -> Result<(), GoalStoreError> {
        self.rows.lock().insert(node.id, node);
        Ok(())
    }

    async fn list_for_goal(&self, goal_id: GoalId) -> Result<Vec<GoalNode>, GoalStoreError> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|n| n.goal_id == goal_id)
            .cloned()
            .collect())
    }
}

/// (from, to, edge_type) is the unique key (§3).
#[async_trait]
pub trait GoalEdgeRepo: Send + Sync {
    async fn upsert(&self, edge: GoalEdge) -> Result<(), GoalStoreError>;
    async fn list_for_goal(&self, node_ids: &[GoalNodeId]) -> Result<Vec<GoalEdge>, GoalStoreError>;
}

#[derive(Default)]
pub struct InMemoryGoalEdgeRepo {
    rows: parking_lot::Mutex<Vec<GoalEdge>>,
}

#[async_trait]
impl GoalEdgeRepo for InMemoryGoalEdgeRepo {
    async fn upsert(&self, edge: GoalEdge) -> Result<(), GoalStoreError> {
        let mut rows = self.rows.lock();
        if let Some(existing) = rows.iter_mut().find(|e| {
            e.from_node_id == edge.from_node_id && e.to_node_id == edge.to_node_id && e.edge_type == edge.edge_type
        }) {
            *existing = edge;
        } else {
            rows.push(edge);
        }
        Ok(())
    }

    async fn list_for_goal(&self, node_ids: &[GoalNodeId]) -> Result<Vec<GoalEdge>, GoalStoreError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|e| node_ids.contains(&e.from_node_id) || node_ids.contains(&e.to_node_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
pub trait GoalMemoryLinkRepo: Send + Sync {
    /// Unique on `(organization_id, goal_id, memory_id)`; upsert updates
    /// `link_type`, `confidence`, `node_id`, `linked_by`.
    async fn upsert(&self, link: GoalMemoryLink) -> Result<(), GoalStoreError>;
    async fn list_for_goal(&self, organization_id: OrganizationId, goal_id: GoalId) -> Result<Vec<GoalMemoryLink>, GoalStoreError>;
}

#[derive(Default)]
pub struct InMemoryGoalMemoryLinkRepo {
    rows: parking_lot::Mutex<HashMap<(OrganizationId, GoalId, MemoryId), GoalMemoryLink>>,
}

#[async_trait]
impl GoalMemoryLinkRepo for InMemoryGoalMemoryLinkRepo {
    async fn upsert(&self, link: GoalMemoryLink) -> Result<(), GoalStoreError> {
        let key = (link.organization_id, link.goal_id, link.memory_id);
        self.rows.lock().insert(key, link);
        Ok(())
    }

    async fn list_for_goal(&self, organization_id: OrganizationId, goal_id: GoalId) -> Result<Vec<GoalMemoryLink>, GoalStoreError> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|l| l.organization_id == organization_id && l.goal_id == goal_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
pub trait GoalActivityLogRepo: Send + Sync {
    async fn append(&self, event: GoalActivityLog) -> Result<(), GoalStoreError>;
    async fn list_for_goal(&self, goal_id: GoalId) -> Result<Vec<GoalActivityLog>, GoalStoreError>;
}

#[derive(Default)]
pub struct InMemoryGoalActivityLogRepo {
    rows: parking_lot::Mutex<Vec<GoalActivityLog>>,
}

#[async_trait]
impl GoalActivityLogRepo for InMemoryGoalActivityLogRepo {
    async fn append(&self, event: GoalActivityLog) -> Result<(), GoalStoreError> {
        self.rows.lock().push(event);
        Ok(())
    }

    async fn list_for_goal(&self, goal_id: GoalId) -> Result<Vec<GoalActivityLog>, GoalStoreError> {
        Ok(self.rows.lock().iter().filter(|e| e.goal_id == goal_id).cloned().collect())
    }
}
