//! Access token types and route-based authorization.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an access token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessTokenId(Uuid);

impl AccessTokenId {
    /// Generate a new random token ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidToken(format!("invalid token ID: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccessTokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AccessTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessTokenId({})", self.0)
    }
}

impl fmt::Display for AccessTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a token survives restarts or only lives for the current process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTokenType {
    Persistent,
    Temporary,
}

/// Permission granted by a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutePermission {
    Read,
    Write,
}

impl RoutePermission {
    /// Check if this permission implies another. Write implies read.
    pub fn implies(&self, other: RoutePermission) -> bool {
        match self {
            Self::Write => true,
            Self::Read => matches!(other, Self::Read),
        }
    }
}

/// A path-prefix-scoped permission grant attached to an access token.
///
/// Route paths are matched against the qualified artifact path
/// `"{repository}/{gav}"`. An empty path (or `"/"`) matches everything.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub path: String,
    pub permission: RoutePermission,
}

impl Route {
    pub fn new(path: impl Into<String>, permission: RoutePermission) -> Self {
        Self {
            path: path.into(),
            permission,
        }
    }

    /// Whether this route covers the given qualified path.
    pub fn matches(&self, qualified_path: &str) -> bool {
        let prefix = self.path.trim_start_matches('/');
        qualified_path.trim_start_matches('/').starts_with(prefix)
    }
}

/// An access token with its set of permission routes.
///
/// The secret is never stored; only its SHA-256 hex digest is kept.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: AccessTokenId,
    pub name: String,
    pub secret_hash: String,
    pub token_type: AccessTokenType,
    pub routes: HashSet<Route>,
}

impl AccessToken {
    /// Create a token from a plaintext secret, hashing it immediately.
    pub fn new(name: impl Into<String>, secret: &str, token_type: AccessTokenType) -> Self {
        Self {
            id: AccessTokenId::new(),
            name: name.into(),
            secret_hash: hash_secret(secret),
            token_type,
            routes: HashSet::new(),
        }
    }

    /// Reconstruct a token from an already-hashed secret, as loaded from
    /// configuration.
    pub fn from_hash(
        name: impl Into<String>,
        secret_hash: String,
        token_type: AccessTokenType,
        routes: HashSet<Route>,
    ) -> Self {
        Self {
            id: AccessTokenId::new(),
            name: name.into(),
            secret_hash,
            token_type,
            routes,
        }
    }

    /// Verify a presented plaintext secret against the stored hash.
    pub fn verify_secret(&self, secret: &str) -> bool {
        hash_secret(secret) == self.secret_hash
    }

    /// Replace the stored secret hash with the hash of a new secret.
    pub fn rotate_secret(&mut self, secret: &str) {
        self.secret_hash = hash_secret(secret);
    }

    /// Whether any of the token's routes grants the permission for the path.
    ///
    /// Any matching route whose permission implies the requested one grants
    /// access; there is no precedence between overlapping prefixes.
    pub fn has_permission_to(&self, qualified_path: &str, permission: RoutePermission) -> bool {
        self.routes
            .iter()
            .any(|route| route.matches(qualified_path) && route.permission.implies(permission))
    }
}

/// Hash a token secret for storage and comparison.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_routes(routes: &[(&str, RoutePermission)]) -> AccessToken {
        let mut token = AccessToken::new("ci", "secret", AccessTokenType::Temporary);
        for (path, permission) in routes {
            token.routes.insert(Route::new(*path, *permission));
        }
        token
    }

    #[test]
    fn secret_verification() {
        let token = AccessToken::new("deploy", "hunter2", AccessTokenType::Persistent);
        assert!(token.verify_secret("hunter2"));
        assert!(!token.verify_secret("hunter3"));
    }

    #[test]
    fn rotate_secret_invalidates_old_one() {
        let mut token = AccessToken::new("deploy", "old", AccessTokenType::Persistent);
        token.rotate_secret("new");
        assert!(!token.verify_secret("old"));
        assert!(token.verify_secret("new"));
    }

    #[test]
    fn write_implies_read() {
        let token = token_with_routes(&[("releases/com/acme", RoutePermission::Write)]);
        assert!(token.has_permission_to("releases/com/acme/lib", RoutePermission::Write));
        assert!(token.has_permission_to("releases/com/acme/lib", RoutePermission::Read));
        assert!(!token.has_permission_to("releases/org/other", RoutePermission::Read));
    }

    #[test]
    fn read_does_not_imply_write() {
        let token = token_with_routes(&[("releases", RoutePermission::Read)]);
        assert!(token.has_permission_to("releases/com/acme", RoutePermission::Read));
        assert!(!token.has_permission_to("releases/com/acme", RoutePermission::Write));
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let all = token_with_routes(&[("", RoutePermission::Write)]);
        assert!(all.has_permission_to("releases/anything/at/all", RoutePermission::Write));

        let slash = token_with_routes(&[("/", RoutePermission::Read)]);
        assert!(slash.has_permission_to("snapshots/x", RoutePermission::Read));
    }

    #[test]
    fn overlapping_routes_grant_union() {
        let token = token_with_routes(&[
            ("releases", RoutePermission::Read),
            ("releases/com/acme", RoutePermission::Write),
        ]);
        assert!(token.has_permission_to("releases/org/other", RoutePermission::Read));
        assert!(!token.has_permission_to("releases/org/other", RoutePermission::Write));
        assert!(token.has_permission_to("releases/com/acme/lib", RoutePermission::Write));
    }
}
