//! `Scope` (§3, GLOSSARY): the visibility tier attached to a memory or goal.
//! Shared across the permission kernel, memory store, and GoalGraph so all
//! three agree on the same six tiers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Personal,
    Team,
    Department,
    Division,
    Organization,
    Global,
}

impl Scope {
    /// Scopes that carry a `scope_id` (team id, department path, ...).
    pub fn requires_scope_id(&self) -> bool {
        matches!(
            self,
            Scope::Team | Scope::Department | Scope::Division
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Personal => "personal",
            Scope::Team => "team",
            Scope::Department => "department",
            Scope::Division => "division",
            Scope::Organization => "organization",
            Scope::Global => "global",
        }
    }
}
