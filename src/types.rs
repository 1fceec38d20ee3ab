//! Session data model shared by every coordinator component.
//!
//! DESIGN
//! ======
//! `SessionSnapshot` keeps its fields private so "no user implies no
//! profile" holds by construction. Snapshots read back from storage are
//! re-checked with `is_consistent` because serde bypasses the constructors.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ROLE
// =============================================================================

/// Closed set of roles a profile can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

// =============================================================================
// IDENTITY + PROFILE
// =============================================================================

/// Signed-in identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned unique identifier; also the profile document key.
    pub id: String,
    /// Display email, if the provider exposes one.
    pub email: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self { id: id.into(), email }
    }
}

/// Role-bearing profile document. Fields other than `role` are kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub role: Role,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    #[must_use]
    pub fn with_role(role: Role) -> Self {
        Self { role, extra: serde_json::Map::new() }
    }
}

// =============================================================================
// SESSION SNAPSHOT
// =============================================================================

/// Result of an auth check: who is signed in and what their profile says.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    user: Option<Identity>,
    profile: Option<Profile>,
}

impl SessionSnapshot {
    /// No session at all.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// A live session whose profile may not be known.
    #[must_use]
    pub fn signed_in(user: Identity, profile: Option<Profile>) -> Self {
        Self { user: Some(user), profile }
    }

    #[must_use]
    pub fn user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// False only for a profile without a user, which no constructor builds.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.user.is_some() || self.profile.is_none()
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
