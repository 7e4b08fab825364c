//! Identity types for ASPECTRA callers

use crate::context::InvocationContext;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 password hash for the credential store.
pub type PasswordHash = [u8; 32];

/// Identity of a caller (username, service account, API key id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PrincipalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A caller identity together with the roles it holds.
///
/// Supplied by an [`IdentityProvider`]; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub fn new<I, R>(id: impl Into<PrincipalId>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if the principal has a specific role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Check if the principal has any of the specified roles.
    pub fn has_any_role<'a>(&self, roles: impl IntoIterator<Item = &'a str>) -> bool {
        roles.into_iter().any(|role| self.has_role(role))
    }

    /// First of `required` (in its iteration order) that this principal holds.
    pub fn matching_role<'a>(&self, required: &'a BTreeSet<String>) -> Option<&'a str> {
        required
            .iter()
            .find(|role| self.roles.contains(role.as_str()))
            .map(String::as_str)
    }
}

/// External capability that answers "who is calling and what may they do".
///
/// Implementations are stateless from the pipeline's perspective and must be
/// safe to share across concurrent invocations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Whether the caller named by the context counts as authenticated.
    ///
    /// The default only requires a caller identity to be present.
    fn is_authenticated(&self, ctx: &InvocationContext) -> bool {
        ctx.caller().is_some()
    }

    /// Resolve the roles currently held by `principal`.
    ///
    /// Unknown principals resolve to an empty set.
    async fn resolve_roles(&self, principal: &PrincipalId) -> BTreeSet<String>;
}

/// Compute the SHA-256 hash of a password.
pub fn compute_password_hash(password: &str) -> PasswordHash {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
