//! Well-known role name constants.
//!
//! Roles arrive as a verified token claim and are checked once, by the
//! extractors in `studyroom_api::middleware::rbac`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_TUTOR: &str = "tutor";

/// Whether `role` may act as a tutor (admins can do everything a tutor can).
pub fn can_tutor(role: &str) -> bool {
    role == ROLE_TUTOR || role == ROLE_ADMIN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_act_as_tutor() {
        assert!(can_tutor(ROLE_ADMIN));
        assert!(can_tutor(ROLE_TUTOR));
    }

    #[test]
    fn unknown_role_cannot_tutor() {
        assert!(!can_tutor("parent"));
        assert!(!can_tutor(""));
    }
}
