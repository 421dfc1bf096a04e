use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use quarry_core::{
    AccessToken, AccessTokenId, AccessTokenType, Error, Result, Route, TokenConfig,
};

/// Secret handed back exactly once when a token is created or its secret
/// is rotated. Only the hash is retained.
pub struct CreatedToken {
    pub id: AccessTokenId,
    pub name: String,
    pub secret: String,
}

/// In-memory token store. Tokens are seeded from configuration at startup
/// and may be managed at runtime without affecting in-flight requests,
/// which hold their own token snapshots.
#[derive(Default)]
pub struct AccessTokenVault {
    tokens: RwLock<HashMap<AccessTokenId, Arc<RwLock<AccessToken>>>>,
}

impl AccessTokenVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a token whose secret hash comes from configuration.
    pub async fn insert_from_config(&self, config: &TokenConfig) -> AccessTokenId {
        let routes: HashSet<Route> = config
            .routes
            .iter()
            .map(|route| Route::new(route.path.clone(), route.permission))
            .collect();

        let token = AccessToken::from_hash(
            config.name.clone(),
            config.secret_hash.clone(),
            AccessTokenType::Persistent,
            routes,
        );
        let id = token.id;

        self.tokens
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(token)));
        id
    }

    /// Creates a token with a generated secret. The plaintext secret is
    /// returned once and never stored.
    pub async fn create_token(
        &self,
        name: impl Into<String>,
        token_type: AccessTokenType,
    ) -> CreatedToken {
        let name = name.into();
        let secret = Uuid::new_v4().simple().to_string();
        let token = AccessToken::new(name.clone(), &secret, token_type);
        let id = token.id;

        self.tokens
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(token)));

        info!(token = %name, "access token created");
        CreatedToken { id, name, secret }
    }

    /// Verifies a name/secret pair against stored hashes.
    pub async fn authenticate(&self, name: &str, secret: &str) -> Option<AccessTokenId> {
        let tokens = self.tokens.read().await;

        for token in tokens.values() {
            let token = token.read().await;
            if token.name == name && token.verify_secret(secret) {
                return Some(token.id);
            }
        }

        None
    }

    /// Snapshot of a token's current state.
    pub async fn get(&self, id: &AccessTokenId) -> Option<AccessToken> {
        let token = self.tokens.read().await.get(id).cloned()?;
        let token = token.read().await;
        Some(token.clone())
    }

    pub async fn add_route(&self, id: &AccessTokenId, route: Route) -> Result<()> {
        let token = self.require(id).await?;
        let mut token = token.write().await;
        token.routes.insert(route);
        Ok(())
    }

    pub async fn remove_route(&self, id: &AccessTokenId, route: &Route) -> Result<()> {
        let token = self.require(id).await?;
        let mut token = token.write().await;
        token.routes.remove(route);
        Ok(())
    }

    /// Replaces the token secret and returns the new plaintext once.
    pub async fn rotate_secret(&self, id: &AccessTokenId) -> Result<String> {
        let token = self.require(id).await?;
        let secret = Uuid::new_v4().simple().to_string();
        let mut token = token.write().await;
        token.rotate_secret(&secret);
        info!(token = %token.name, "access token secret rotated");
        Ok(secret)
    }

    pub async fn delete_token(&self, id: &AccessTokenId) -> Result<()> {
        match self.tokens.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(Error::InvalidToken(format!("unknown token id {id}"))),
        }
    }

    pub async fn tokens(&self) -> Vec<AccessToken> {
        let tokens = self.tokens.read().await;
        let mut snapshot = Vec::with_capacity(tokens.len());
        for token in tokens.values() {
            snapshot.push(token.read().await.clone());
        }
        snapshot
    }

    async fn require(&self, id: &AccessTokenId) -> Result<Arc<RwLock<AccessToken>>> {
        self.tokens
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::InvalidToken(format!("unknown token id {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::RoutePermission;

    #[tokio::test]
    async fn created_token_authenticates_with_its_secret() {
        let vault = AccessTokenVault::new();
        let created = vault.create_token("ci", AccessTokenType::Temporary).await;

        assert_eq!(
            vault.authenticate("ci", &created.secret).await,
            Some(created.id)
        );
        assert_eq!(vault.authenticate("ci", "wrong").await, None);
        assert_eq!(vault.authenticate("other", &created.secret).await, None);
    }

    #[tokio::test]
    async fn rotation_invalidates_the_previous_secret() {
        let vault = AccessTokenVault::new();
        let created = vault.create_token("ci", AccessTokenType::Persistent).await;

        let rotated = vault.rotate_secret(&created.id).await.unwrap();
        assert_ne!(rotated, created.secret);
        assert_eq!(vault.authenticate("ci", &created.secret).await, None);
        assert_eq!(vault.authenticate("ci", &rotated).await, Some(created.id));
    }

    #[tokio::test]
    async fn routes_can_be_added_and_removed() {
        let vault = AccessTokenVault::new();
        let created = vault.create_token("ci", AccessTokenType::Temporary).await;
        let route = Route::new("releases/com/acme", RoutePermission::Write);

        vault.add_route(&created.id, route.clone()).await.unwrap();
        let token = vault.get(&created.id).await.unwrap();
        assert!(token.has_permission_to("releases/com/acme/lib", RoutePermission::Write));

        vault.remove_route(&created.id, &route).await.unwrap();
        let token = vault.get(&created.id).await.unwrap();
        assert!(!token.has_permission_to("releases/com/acme/lib", RoutePermission::Read));
    }

    #[tokio::test]
    async fn deleted_tokens_no_longer_authenticate() {
        let vault = AccessTokenVault::new();
        let created = vault.create_token("ci", AccessTokenType::Temporary).await;

        vault.delete_token(&created.id).await.unwrap();
        assert_eq!(vault.authenticate("ci", &created.secret).await, None);
        assert!(vault.delete_token(&created.id).await.is_err());
        assert!(vault.tokens().await.is_empty());
    }

    #[tokio::test]
    async fn config_seeded_token_authenticates() {
        use quarry_core::{hash_secret, RouteConfig, TokenConfig};

        let vault = AccessTokenVault::new();
        let id = vault
            .insert_from_config(&TokenConfig {
                name: "deploy".to_string(),
                secret_hash: hash_secret("hunter2"),
                routes: vec![RouteConfig {
                    path: "releases".to_string(),
                    permission: RoutePermission::Write,
                }],
            })
            .await;

        assert_eq!(vault.authenticate("deploy", "hunter2").await, Some(id));
        let token = vault.get(&id).await.unwrap();
        assert!(token.has_permission_to("releases/com/acme", RoutePermission::Write));
    }
}
