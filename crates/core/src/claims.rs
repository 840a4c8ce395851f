//! Caller identity and roles.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Roles a caller may be granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full access to every image regardless of owner.
    #[serde(rename = "ADMIN")]
    Admin,
    /// Access to images the caller owns.
    #[serde(rename = "USER")]
    User,
}

impl Role {
    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "USER" => Ok(Self::User),
            _ => Err(crate::Error::UnknownRole(s.to_string())),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated identity of a caller, resolved by the identity layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier (the user ID).
    pub subject: String,
    /// Granted roles.
    pub roles: HashSet<Role>,
}

impl Claims {
    pub fn new(subject: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            subject: subject.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Build claims from role names as they appear in credentials.
    pub fn from_role_names<S: AsRef<str>>(
        subject: impl Into<String>,
        roles: impl IntoIterator<Item = S>,
    ) -> crate::Result<Self> {
        let roles = roles
            .into_iter()
            .map(|r| Role::parse(r.as_ref()))
            .collect::<crate::Result<HashSet<_>>>()?;
        Ok(Self {
            subject: subject.into(),
            roles,
        })
    }

    /// Check if the caller holds any of the given roles.
    pub fn authorized(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("ADMIN").unwrap(), Role::Admin);
        assert_eq!(Role::parse("USER").unwrap(), Role::User);
        assert!(Role::parse("admin").is_err());
    }

    #[test]
    fn test_authorized_any_of() {
        let claims = Claims::new("u1", [Role::User]);
        assert!(claims.authorized(&[Role::Admin, Role::User]));
        assert!(!claims.authorized(&[Role::Admin]));
        assert!(!claims.authorized(&[]));
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_from_role_names_rejects_unknown() {
        let claims = Claims::from_role_names("u1", ["ADMIN", "USER"]).unwrap();
        assert!(claims.is_admin());

        assert!(matches!(
            Claims::from_role_names("u1", ["ROOT"]),
            Err(crate::Error::UnknownRole(r)) if r == "ROOT"
        ));
    }
}
