//! Effective permission set: the union of permissions granted by every
//! non-expired `UserRole` a user holds in an organization, with wildcard
//! support (§4.1): `resource:*`, `resource:action:*`, and the super-admin
//! marker `*:*` (equivalent to `admin:*`).

use crate::model::{Role, UserRoleAssignment};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct EffectivePermissionSet {
    granted: Vec<String>,
    pub role_names: Vec<String>,
}

impl EffectivePermissionSet {
    pub fn compute(
        assignments: &[UserRoleAssignment],
        roles: &[Role],
        now: DateTime<Utc>,
    ) -> Self {
        let mut granted = Vec::new();
        let mut role_names = Vec::new();
        for assignment in assignments.iter().filter(|a| a.is_active(now)) {
            if let Some(role) = roles.iter().find(|r| r.id == assignment.role_id) {
                role_names.push(role.name.clone());
                granted.extend(role.permissions.iter().cloned());
            }
        }
        Self {
            granted,
            role_names,
        }
    }

    /// True when any granted permission string matches `requested`, either
    /// exactly or via a wildcard suffix.
    pub fn allows(&self, requested: &str) -> bool {
        self.granted
            .iter()
            .any(|granted| permission_matches(granted, requested))
    }
}

fn permission_matches(granted: &str, requested: &str) -> bool {
    if granted == "*:*" {
        return true;
    }
    let granted_segs: Vec<&str> = granted.split(':').collect();
    let requested_segs: Vec<&str> = requested.split(':').collect();

    for (i, g) in granted_segs.iter().enumerate() {
        if *g == "*" {
            return true;
        }
        match requested_segs.get(i) {
            Some(r) if r == g => continue,
            _ => return false,
        }
    }
    granted_segs.len() == requested_segs.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        let set = EffectivePermissionSet {
            granted: vec!["memory:read".into()],
            role_names: vec![],
        };
        assert!(set.allows("memory:read"));
        assert!(!set.allows("memory:write"));
    }

    #[test]
    fn resource_wildcard_matches_any_action() {
        let set = EffectivePermissionSet {
            granted: vec!["memory:*".into()],
            role_names: vec![],
        };
        assert!(set.allows("memory:read"));
        assert!(set.allows("memory:create:team"));
    }

    #[test]
    fn resource_action_wildcard_matches_any_scope() {
        let set = EffectivePermissionSet {
            granted: vec!["memory:create:*".into()],
            role_names: vec![],
        };
        assert!(set.allows("memory:create:personal"));
        assert!(!set.allows("memory:read"));
    }

    #[test]
    fn super_admin_matches_everything() {
        let set = EffectivePermissionSet {
            granted: vec!["*:*".into()],
            role_names: vec![],
        };
        assert!(set.allows("memory:read"));
        assert!(set.allows("pipeline:enqueue"));
    }

    #[test]
    fn expired_role_assignment_is_excluded() {
        let role_id = uuid::Uuid::new_v4();
        let user_id = uuid::Uuid::new_v4();
        let org_id = uuid::Uuid::new_v4();
        let now = Utc::now();
        let assignment = UserRoleAssignment {
            user_id,
            role_id,
            organization_id: org_id,
            expires_at: Some(now - chrono::Duration::seconds(1)),
        };
        let role = Role {
            id: role_id,
            organization_id: org_id,
            name: "member".into(),
            permissions: vec!["memory:read".into()],
        };
        let set = EffectivePermissionSet::compute(&[assignment], &[role], now);
        assert!(!set.allows("memory:read"));
    }
}
