//! Role-based permission tags.
//!
//! Tags are plain strings so they can travel inside token claims. A role's
//! tag set is fixed at compile time.

use crate::orm::users::Role;

/// Run ingestion and manage civic reference data.
pub const ADMIN_DATA_MANAGE: &str = "admin.data.manage";
/// Mark politician statements as verified.
pub const STATEMENTS_VERIFY: &str = "politicians.statements.verify";
/// Remove other users' social posts.
pub const SOCIAL_MODERATE: &str = "social.moderate";

const MODERATOR_PERMISSIONS: &[&str] = &[STATEMENTS_VERIFY, SOCIAL_MODERATE];
const ADMIN_PERMISSIONS: &[&str] = &[ADMIN_DATA_MANAGE, STATEMENTS_VERIFY, SOCIAL_MODERATE];

pub fn permissions_for_role(role: Role) -> Vec<String> {
    let tags: &[&str] = match role {
        Role::Citizen => &[],
        Role::Moderator => MODERATOR_PERMISSIONS,
        Role::Admin => ADMIN_PERMISSIONS,
    };

    tags.iter().map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert!(permissions_for_role(Role::Citizen).is_empty());

        let moderator = permissions_for_role(Role::Moderator);
        assert!(moderator.contains(&SOCIAL_MODERATE.to_string()));
        assert!(!moderator.contains(&ADMIN_DATA_MANAGE.to_string()));

        let admin = permissions_for_role(Role::Admin);
        assert_eq!(admin.len(), 3);
    }
}
