use chrono::{DateTime, Utc};
use memos_core::{GoalId, GoalNodeId, MemoryId, OrganizationId, Scope, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    User,
    Team,
    Department,
    Organization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Task,
    Project,
    Objective,
    Policy,
    Research,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Proposed,
    Active,
    Blocked,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub organization_id: OrganizationId,
    pub creator: UserId,
    pub owner_type: OwnerType,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub goal_type: GoalType,
    pub status: GoalStatus,
    pub priority: i32,
    pub due_at: Option<DateTime<Utc>>,
    pub confidence: f64,
    pub visibility_scope: Scope,
    pub scope_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub metadata: Value,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    #[allow(clippy::too_many_arguments)]
    pub fn propose(
        organization_id: OrganizationId,
        creator: UserId,
        owner_type: OwnerType,
        owner_id: Uuid,
        title: impl Into<String>,
        goal_type: GoalType,
        visibility_scope: Scope,
        scope_id: Option<Uuid>,
        confidence: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: memos_core::new_id(),
            organization_id,
            creator,
            owner_type,
            owner_id,
            title: title.into(),
            description: String::new(),
            goal_type,
            status: GoalStatus::Proposed,
            priority: 0,
            due_at: None,
            confidence: confidence.clamp(0.0, 1.0),
            visibility_scope,
            scope_id,
            tags: Vec::new(),
            metadata: Value::Null,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Subgoal,
    Task,
    Milestone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Todo,
    InProgress,
    Blocked,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalNode {
    pub id: GoalNodeId,
    pub goal_id: GoalId,
    pub parent_node_id: Option<GoalNodeId>,
    pub node_type: NodeType,
    pub title: String,
    pub status: NodeStatus,
    pub priority: i32,
    pub assignees: Vec<UserId>,
    pub ordering: i32,
    pub expected_outputs: Value,
    pub success_criteria: Value,
    pub blockers: Value,
    pub confidence: f64,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GoalNode {
    pub fn has_blockers(&self) -> bool {
        self.status == NodeStatus::Blocked
            || match &self.blockers {
                Value::Null => false,
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
                _ => true,
            }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    DependsOn,
    Blocks,
    RelatedTo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GoalEdge {
    pub from_node_id: GoalNodeId,
    pub to_node_id: GoalNodeId,
    pub edge_type: EdgeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Evidence,
    Progress,
    Blocker,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkedBy {
    Auto,
    User,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalMemoryLink {
    pub organization_id: OrganizationId,
    pub goal_id: GoalId,
    pub memory_id: MemoryId,
    pub node_id: Option<GoalNodeId>,
    pub link_type: LinkType,
    pub linked_by: LinkedBy,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalActivityLog {
    pub goal_id: GoalId,
    pub organization_id: OrganizationId,
    pub event_type: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl GoalActivityLog {
    pub fn new(goal: &Goal, event_type: impl Into<String>, details: Value) -> Self {
        Self {
            goal_id: goal.id,
            organization_id: goal.organization_id,
            event_type: event_type.into(),
            details,
            created_at: Utc::now(),
        }
    }
}

/// §4.6 progress rollup output: computed on demand, not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressRollup {
    pub percent_complete: f64,
    pub completed_nodes: usize,
    pub total_nodes: usize,
    pub confidence: f64,
}
