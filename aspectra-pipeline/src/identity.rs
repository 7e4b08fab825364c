//! In-memory identity store.
//!
//! A small credential store implementing [`IdentityProvider`]: usernames
//! map to a SHA-256 password hash and a role set. Passwords are never kept
//! in clear text. Callers exchange credentials for a [`Principal`] with
//! [`login`](InMemoryIdentityStore::login) and put the principal id on each
//! [`InvocationContext`]; there is no notion of a "current user".

use aspectra_core::{
    compute_password_hash, IdentityProvider, InvocationContext, PasswordHash, Principal,
    PrincipalId,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
struct Credentials {
    password_hash: PasswordHash,
    roles: BTreeSet<String>,
}

/// Username/password/roles store shared across concurrent invocations.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    users: DashMap<PrincipalId, Credentials>,
}

impl InMemoryIdentityStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with the stock accounts:
    ///
    /// | user    | password     | roles                |
    /// |---------|--------------|----------------------|
    /// | admin   | `admin123`   | ADMIN, MANAGER, USER |
    /// | manager | `manager123` | MANAGER, USER        |
    /// | user    | `user123`    | USER                 |
    /// | guest   | `guest123`   | GUEST                |
    pub fn with_default_users() -> Self {
        let store = Self::new();
        store.add_user("admin", "admin123", ["ADMIN", "MANAGER", "USER"]);
        store.add_user("manager", "manager123", ["MANAGER", "USER"]);
        store.add_user("user", "user123", ["USER"]);
        store.add_user("guest", "guest123", ["GUEST"]);
        store
    }

    /// Register or replace a user. Returns true if the username was new.
    pub fn add_user<I, R>(&self, username: impl Into<PrincipalId>, password: &str, roles: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let credentials = Credentials {
            password_hash: compute_password_hash(password),
            roles: roles.into_iter().map(Into::into).collect(),
        };
        self.users.insert(username.into(), credentials).is_none()
    }

    /// Remove a user. Returns true if it existed.
    pub fn remove_user(&self, username: &PrincipalId) -> bool {
        self.users.remove(username).is_some()
    }

    pub fn contains(&self, username: &PrincipalId) -> bool {
        self.users.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check credentials and return the authenticated principal.
    pub fn login(&self, username: &str, password: &str) -> Option<Principal> {
        let id = PrincipalId::from(username);
        let principal = self.users.get(&id).and_then(|user| {
            (user.password_hash == compute_password_hash(password)).then(|| Principal {
                id: id.clone(),
                roles: user.roles.clone(),
            })
        });

        match &principal {
            Some(p) => tracing::info!(principal = %p.id, roles = ?p.roles, "Login succeeded"),
            None => tracing::warn!(principal = %id, "Login failed"),
        }
        principal
    }

    /// Roles held by `username`; empty for unknown users.
    pub fn roles_of(&self, username: &PrincipalId) -> BTreeSet<String> {
        self.users
            .get(username)
            .map(|user| user.roles.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityStore {
    /// Only registered users count as authenticated.
    fn is_authenticated(&self, ctx: &InvocationContext) -> bool {
        ctx.caller().is_some_and(|caller| self.contains(caller))
    }

    async fn resolve_roles(&self, principal: &PrincipalId) -> BTreeSet<String> {
        self.roles_of(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_users_and_roles() {
        let store = InMemoryIdentityStore::with_default_users();
        assert_eq!(store.len(), 4);

        let admin = store.roles_of(&PrincipalId::from("admin"));
        assert!(admin.contains("ADMIN"));
        assert!(admin.contains("MANAGER"));
        assert!(admin.contains("USER"));

        let guest = store.roles_of(&PrincipalId::from("guest"));
        assert_eq!(guest.len(), 1);
        assert!(guest.contains("GUEST"));

        assert!(store.roles_of(&PrincipalId::from("nobody")).is_empty());
    }

    #[test]
    fn test_login_checks_password() {
        let store = InMemoryIdentityStore::with_default_users();

        let manager = store.login("manager", "manager123").expect("valid credentials");
        assert_eq!(manager.id.as_str(), "manager");
        assert!(manager.has_role("MANAGER"));
        assert!(!manager.has_role("ADMIN"));

        assert!(store.login("manager", "wrong").is_none());
        assert!(store.login("nobody", "manager123").is_none());
    }

    #[test]
    fn test_add_and_remove_user() {
        let store = InMemoryIdentityStore::new();
        assert!(store.is_empty());
        assert!(store.add_user("auditor", "s3cret", ["AUDITOR"]));
        assert!(!store.add_user("auditor", "rotated", ["AUDITOR", "USER"]));

        assert!(store.login("auditor", "s3cret").is_none());
        assert!(store.login("auditor", "rotated").is_some());

        assert!(store.remove_user(&PrincipalId::from("auditor")));
        assert!(!store.remove_user(&PrincipalId::from("auditor")));
    }

    #[tokio::test]
    async fn test_identity_provider_contract() {
        let store = InMemoryIdentityStore::with_default_users();

        let known = InvocationContext::builder("op", "t").caller("user").build();
        let unknown = InvocationContext::builder("op", "t").caller("mallory").build();
        let anonymous = InvocationContext::builder("op", "t").build();

        assert!(store.is_authenticated(&known));
        assert!(!store.is_authenticated(&unknown));
        assert!(!store.is_authenticated(&anonymous));

        let roles = store.resolve_roles(&PrincipalId::from("user")).await;
        assert_eq!(roles.into_iter().collect::<Vec<_>>(), vec!["USER".to_string()]);
    }
}
