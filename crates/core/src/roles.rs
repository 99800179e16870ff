//! Well-known role names and the authenticated caller.
//!
//! Role names arrive verbatim in the `roles` claim of the access token.

use crate::types::DbId;

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_INSTRUCTOR: &str = "instructor";
pub const ROLE_REGISTRAR: &str = "registrar";

/// A verified caller: the user id and every role they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(user_id: DbId, roles: Vec<String>) -> Self {
        Self { user_id, roles }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_registrar(&self) -> bool {
        self.has_role(ROLE_REGISTRAR)
    }

    /// True when the caller is `user_id` themself or a registrar.
    ///
    /// This is the access rule for every per-user resource
    /// (`/users/{id}/...`).
    pub fn acts_for(&self, user_id: DbId) -> bool {
        self.user_id == user_id || self.is_registrar()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrar_acts_for_anyone() {
        let actor = Actor::new(1, vec![ROLE_REGISTRAR.to_string()]);
        assert!(actor.acts_for(1));
        assert!(actor.acts_for(99));
    }

    #[test]
    fn student_acts_only_for_self() {
        let actor = Actor::new(7, vec![ROLE_STUDENT.to_string()]);
        assert!(actor.acts_for(7));
        assert!(!actor.acts_for(8));
        assert!(!actor.is_registrar());
    }

    #[test]
    fn multiple_roles_are_checked_individually() {
        let actor = Actor::new(
            3,
            vec![ROLE_STUDENT.to_string(), ROLE_INSTRUCTOR.to_string()],
        );
        assert!(actor.has_role(ROLE_INSTRUCTOR));
        assert!(!actor.has_role(ROLE_REGISTRAR));
    }
}
