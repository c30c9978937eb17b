use serde::{Deserialize, Serialize};

/// Opaque identifier for a user, assigned by the identity collaborator.
///
/// The engine never inspects the contents; it only compares ids for
/// equality and uses them as map keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(pub String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A user's identity as supplied by the session collaborator.
///
/// This is a read-only snapshot; the engine copies these fields into
/// messages and membership records at the time of the operation rather
/// than holding a live back-reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityRef {
    /// Stable opaque id.
    pub id: IdentityId,
    /// Human-readable display name.
    pub display_name: String,
    /// Retrievable URL of the avatar image, empty when unset.
    pub avatar_url: String,
}

impl IdentityRef {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        avatar_url: impl Into<String>,
    ) -> Self {
        Self {
            id: IdentityId::new(id),
            display_name: display_name.into(),
            avatar_url: avatar_url.into(),
        }
    }
}
