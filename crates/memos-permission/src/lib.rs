pub mod decision;
pub mod kernel;
pub mod model;
pub mod permission_set;

pub use decision::{check_memory_access, filter_memory_ids_with_access};
pub use kernel::{
    AccessExplanation, InMemoryRoleProvider, PermissionChecker, PermissionError, PermissionKernel,
    RoleProvider,
};
pub use model::{
    Action, AccessDecision, AccessMethod, MemoryFacts, MemorySharing, Role, SharePermission,
    ShareType, TeamMembership, TeamRole, UserRoleAssignment,
};
pub use permission_set::EffectivePermissionSet;
