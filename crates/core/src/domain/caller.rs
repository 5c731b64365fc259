use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who is performing an operation. Passed explicitly into every core
/// operation; the core never reads ambient session state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Caller {
    Anonymous,
    Authenticated(Identity),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub is_admin: bool,
}

/// Rejection classes for guarded operations. `Unauthenticated` and
/// `Forbidden` stay distinct so callers can be told to sign in versus
/// told they lack privilege.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("caller lacks the required privilege")]
    Forbidden,
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Authenticated(identity) if identity.is_admin)
    }

    pub fn require_authenticated(&self) -> Result<&Identity, AccessError> {
        self.identity().ok_or(AccessError::Unauthenticated)
    }

    pub fn require_admin(&self) -> Result<&Identity, AccessError> {
        let identity = self.require_authenticated()?;
        if identity.is_admin {
            Ok(identity)
        } else {
            Err(AccessError::Forbidden)
        }
    }

    /// Ownership check: the record owner or an admin may proceed.
    pub fn require_owner_or_admin(&self, owner_email: &str) -> Result<&Identity, AccessError> {
        let identity = self.require_authenticated()?;
        if identity.is_admin || identity.email.eq_ignore_ascii_case(owner_email) {
            Ok(identity)
        } else {
            Err(AccessError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessError, Caller, Identity};

    fn customer() -> Caller {
        Caller::Authenticated(Identity {
            id: "u-17".to_string(),
            email: "client@example.org".to_string(),
            is_admin: false,
        })
    }

    fn admin() -> Caller {
        Caller::Authenticated(Identity {
            id: "u-1".to_string(),
            email: "studio@example.org".to_string(),
            is_admin: true,
        })
    }

    #[test]
    fn anonymous_is_rejected_before_privilege_is_considered() {
        assert_eq!(
            Caller::Anonymous.require_admin().expect_err("anonymous"),
            AccessError::Unauthenticated
        );
    }

    #[test]
    fn non_admin_is_forbidden_not_unauthenticated() {
        assert_eq!(customer().require_admin().expect_err("customer"), AccessError::Forbidden);
    }

    #[test]
    fn ownership_accepts_owner_and_admin_only() {
        assert!(customer().require_owner_or_admin("Client@Example.org").is_ok());
        assert!(admin().require_owner_or_admin("someone-else@example.org").is_ok());
        assert_eq!(
            customer().require_owner_or_admin("someone-else@example.org").expect_err("stranger"),
            AccessError::Forbidden
        );
    }
}
