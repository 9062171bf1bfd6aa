//! Route access by role

use portal_http::{Profile, Role};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Outcome of a route access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Unauthenticated,
    Forbidden,
}

impl Access {
    /// Where a view should send the user instead, if anywhere
    pub const fn redirect_path(self) -> Option<&'static str> {
        match self {
            Self::Granted => None,
            Self::Unauthenticated => Some(LOGIN_PATH),
            Self::Forbidden => Some(UNAUTHORIZED_PATH),
        }
    }
}

/// Check whether `user` may open a route requiring `required`.
///
/// Admins may open client routes; clients may not open admin routes.
pub fn check_access(user: Option<&Profile>, required: Option<Role>) -> Access {
    let Some(user) = user else {
        return Access::Unauthenticated;
    };

    match required {
        None => Access::Granted,
        Some(role) if user.role == role || user.role.is_admin() => Access::Granted,
        Some(_) => Access::Forbidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::profile;

    fn with_role(role: Role) -> Profile {
        Profile { role, ..profile() }
    }

    #[test]
    fn test_anonymous_user_is_sent_to_login() {
        let access = check_access(None, None);
        assert_eq!(access, Access::Unauthenticated);
        assert_eq!(access.redirect_path(), Some("/login"));
        assert_eq!(check_access(None, Some(Role::Admin)), Access::Unauthenticated);
    }

    #[test]
    fn test_role_matrix() {
        let client = with_role(Role::Client);
        let admin = with_role(Role::Admin);

        assert_eq!(check_access(Some(&client), None), Access::Granted);
        assert_eq!(check_access(Some(&client), Some(Role::Client)), Access::Granted);
        assert_eq!(check_access(Some(&admin), Some(Role::Admin)), Access::Granted);
        assert_eq!(check_access(Some(&admin), Some(Role::Client)), Access::Granted);

        let denied = check_access(Some(&client), Some(Role::Admin));
        assert_eq!(denied, Access::Forbidden);
        assert_eq!(denied.redirect_path(), Some("/unauthorized"));
        assert_eq!(Access::Granted.redirect_path(), None);
    }
}
