//! Identifier newtypes. Every row in the data model is keyed by a UUID; these
//! aliases exist so signatures read as domain types instead of bare `Uuid`.

use uuid::Uuid;

pub type OrganizationId = Uuid;
pub type UserId = Uuid;
pub type RoleId = Uuid;
pub type TeamId = Uuid;
pub type MemoryId = Uuid;
pub type GoalId = Uuid;
pub type GoalNodeId = Uuid;
pub type PolicyVersionId = Uuid;
pub type PipelineTaskId = Uuid;
pub type TraceId = Uuid;

/// Generates a new random identifier. Centralised so call sites never reach
/// for `Uuid::new_v4()` directly and so tests can substitute a fixed source
/// if the crate ever needs determinism.
pub fn new_id() -> Uuid {
    Uuid::new_v4()
}
