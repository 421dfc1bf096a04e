use std::sync::Arc;

use quarry_core::{AccessTokenId, Location, RoutePermission, Visibility};

use crate::api::{unauthorized, ErrorResponse};
use crate::repository::Repository;
use crate::vault::AccessTokenVault;

/// Route-based access control over repositories.
///
/// Read access decisions depend on repository visibility; write access
/// always requires an authenticated token with a matching write route.
pub struct SecurityPolicy {
    vault: Arc<AccessTokenVault>,
}

impl SecurityPolicy {
    pub fn new(vault: Arc<AccessTokenVault>) -> Self {
        Self { vault }
    }

    /// Read access. Public repositories accept anonymous requests; private
    /// ones require a token with a read-implying route for the path.
    pub async fn can_access_resource(
        &self,
        access_token: Option<&AccessTokenId>,
        repository: &Repository,
        gav: &Location,
    ) -> Result<(), ErrorResponse> {
        match repository.policy().await.visibility {
            Visibility::Public => Ok(()),
            Visibility::Private => {
                self.require_permission(access_token, repository, gav, RoutePermission::Read)
                    .await
            }
        }
    }

    /// Directory listings follow the same rules as file reads.
    pub async fn can_browse_resource(
        &self,
        access_token: Option<&AccessTokenId>,
        repository: &Repository,
        gav: &Location,
    ) -> Result<(), ErrorResponse> {
        self.can_access_resource(access_token, repository, gav)
            .await
    }

    /// Write access, regardless of repository visibility.
    pub async fn can_modify_resource(
        &self,
        access_token: Option<&AccessTokenId>,
        repository: &Repository,
        gav: &Location,
    ) -> bool {
        self.require_permission(access_token, repository, gav, RoutePermission::Write)
            .await
            .is_ok()
    }

    async fn require_permission(
        &self,
        access_token: Option<&AccessTokenId>,
        repository: &Repository,
        gav: &Location,
        permission: RoutePermission,
    ) -> Result<(), ErrorResponse> {
        let Some(id) = access_token else {
            return Err(unauthorized("Unauthorized access request"));
        };

        let Some(token) = self.vault.get(id).await else {
            return Err(unauthorized("Unauthorized access request"));
        };

        let qualified = qualified_path(repository.name(), gav);
        if token.has_permission_to(&qualified, permission) {
            Ok(())
        } else {
            Err(unauthorized("Unauthorized access request"))
        }
    }
}

/// Joins repository name and artifact path into the form token routes
/// are matched against.
pub fn qualified_path(repository: &str, gav: &Location) -> String {
    if gav.is_root() {
        repository.to_string()
    } else {
        format!("{repository}/{gav}")
    }
}
