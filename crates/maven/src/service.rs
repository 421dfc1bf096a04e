//! The resolution engine: repository lookup, access control, local storage
//! reads with mirror fallback, deploys and deletes.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use quarry_core::{AccessTokenId, Location, METADATA_FILE};
use quarry_storage::{ByteStream, DocumentInfo, FileDetails, StorageError};

use crate::api::{
    bad_request_error, directory_rejection, internal_error, not_found, unauthorized_error,
    DeleteRequest, DeployEvent, DeployRequest, ErrorResponse, Identifier, LookupRequest,
    PreResolveEvent, ResolvedFileEvent,
};
use crate::events::EventBus;
use crate::mirror::MirrorService;
use crate::registry::RepositoryRegistry;
use crate::repository::Repository;
use crate::security::SecurityPolicy;
use crate::stats::StatisticsRecorder;

/// Requests for these are bulk tooling noise (checksums, signatures,
/// descriptors), not artifact downloads worth counting.
const IGNORED_EXTENSIONS: [&str; 10] = [
    ".md5",
    ".sha1",
    ".sha256",
    ".sha512",
    ".pom",
    ".xml",
    ".module",
    "-sources.jar",
    "-javadoc.jar",
    ".asc",
];

pub struct MavenService {
    registry: Arc<RepositoryRegistry>,
    security: SecurityPolicy,
    mirrors: MirrorService,
    statistics: Arc<dyn StatisticsRecorder>,
    events: Arc<EventBus>,
}

impl MavenService {
    pub fn new(
        registry: Arc<RepositoryRegistry>,
        security: SecurityPolicy,
        mirrors: MirrorService,
        statistics: Arc<dyn StatisticsRecorder>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            security,
            mirrors,
            statistics,
            events,
        }
    }

    pub fn registry(&self) -> &Arc<RepositoryRegistry> {
        &self.registry
    }

    /// Metadata lookup for a file or directory, consulting mirrors when the
    /// path is absent locally.
    #[instrument(skip(self, request), fields(repository = %request.repository, gav = %request.gav))]
    pub async fn find_details(
        &self,
        request: &LookupRequest,
    ) -> Result<FileDetails, ErrorResponse> {
        let repository = self.resolve(request).await?;
        let details = self
            .lookup_details(request.access_token.as_ref(), &repository, &request.gav)
            .await?;
        self.record_resolved(&repository, &request.gav, &details)
            .await;

        if matches!(details, FileDetails::Document(_)) {
            self.events.emit(&ResolvedFileEvent {
                access_token: request.access_token,
                repository,
                gav: request.gav.clone(),
            });
        }

        Ok(details)
    }

    /// Content lookup. Directories are not streamable and are rejected.
    #[instrument(skip(self, request), fields(repository = %request.repository, gav = %request.gav))]
    pub async fn find_file(
        &self,
        request: &LookupRequest,
    ) -> Result<(DocumentInfo, ByteStream), ErrorResponse> {
        let repository = self.resolve(request).await?;

        let (document, stream) = match self
            .lookup_details(request.access_token.as_ref(), &repository, &request.gav)
            .await?
        {
            FileDetails::Document(document) => {
                // Local reads and remote fetches both land here; the stream
                // source depends on where the details came from.
                let stream = self.find_stream(&repository, &request.gav).await?;
                (document, stream)
            }
            FileDetails::Directory(_) => {
                return Err(directory_rejection());
            }
        };

        self.record_document(&repository, &request.gav, &document)
            .await;

        self.events.emit(&ResolvedFileEvent {
            access_token: request.access_token,
            repository: repository.clone(),
            gav: request.gav.clone(),
        });

        Ok((document, stream))
    }

    /// Preflight read check without touching storage.
    pub async fn can_access_resource(
        &self,
        access_token: Option<&AccessTokenId>,
        repository: &str,
        gav: &Location,
    ) -> Result<(), ErrorResponse> {
        let repository = self.registry.find_repository(repository)?;
        self.security
            .can_access_resource(access_token, &repository, gav)
            .await
    }

    /// Preflight write check without touching storage.
    pub async fn can_modify_resource(
        &self,
        access_token: Option<&AccessTokenId>,
        repository: &str,
        gav: &Location,
    ) -> Result<Arc<Repository>, ErrorResponse> {
        let repository = self.registry.find_repository(repository)?;
        if self
            .security
            .can_modify_resource(access_token, &repository, gav)
            .await
        {
            Ok(repository)
        } else {
            unauthorized_error("Unauthorized access request")
        }
    }

    #[instrument(skip(self, request), fields(repository = request.repository.name(), gav = %request.gav))]
    pub async fn deploy_file(&self, request: DeployRequest) -> Result<(), ErrorResponse> {
        let DeployRequest {
            repository,
            gav,
            content,
            by,
        } = request;

        let policy = repository.policy().await;

        // Metadata files are republished on every deploy and are exempt from
        // the redeployment guard.
        if !policy.redeployment
            && !gav.simple_name().contains(METADATA_FILE)
            && repository.storage().exists(&gav).await
        {
            return bad_request_error("Redeployment is not allowed");
        }

        repository
            .storage()
            .put_file(&gav, content)
            .await
            .map_err(|err| internal_error(format!("Failed to deploy artifact: {err}")))?;

        info!(
            "DEPLOY | Artifact {gav} successfully deployed to {} by {by}",
            repository.name()
        );

        self.events.emit(&DeployEvent {
            repository,
            gav,
            by,
        });

        Ok(())
    }

    #[instrument(skip(self, request), fields(repository = request.repository.name(), gav = %request.gav))]
    pub async fn delete_file(&self, request: DeleteRequest) -> Result<(), ErrorResponse> {
        if !self
            .security
            .can_modify_resource(
                request.access_token.as_ref(),
                &request.repository,
                &request.gav,
            )
            .await
        {
            return unauthorized_error("Unauthorized access request");
        }

        request
            .repository
            .storage()
            .remove_file(&request.gav)
            .await
            .map_err(|err| match err {
                StorageError::NotFound(_) => not_found(format!("File {} not found", request.gav)),
                other => internal_error(format!("Failed to delete file: {other}")),
            })?;

        info!(
            "DELETE | File {} has been deleted from {} by {}",
            request.gav,
            request.repository.name(),
            request.by
        );

        Ok(())
    }

    /// Repository lookup and access control shared by every read path.
    async fn resolve(&self, request: &LookupRequest) -> Result<Arc<Repository>, ErrorResponse> {
        let repository = self.registry.find_repository(&request.repository)?;

        if let Err(err) = self
            .security
            .can_access_resource(request.access_token.as_ref(), &repository, &request.gav)
            .await
        {
            debug!(
                "ACCESS | Unauthorized attempt of access (token: {:?}) to {} from {}",
                request.access_token,
                request.gav,
                repository.name()
            );
            return Err(err);
        }

        self.events.emit(&PreResolveEvent {
            access_token: request.access_token,
            repository: repository.clone(),
            gav: request.gav.clone(),
        });

        Ok(repository)
    }

    async fn lookup_details(
        &self,
        access_token: Option<&AccessTokenId>,
        repository: &Arc<Repository>,
        gav: &Location,
    ) -> Result<FileDetails, ErrorResponse> {
        if !repository.storage().exists(gav).await {
            debug!(
                "Cannot find '{gav}' in '{}' repository, requesting proxied repositories",
                repository.name()
            );
            return self.mirrors.find_remote_details(repository, gav).await;
        }

        let details = match repository.storage().file_details(gav).await {
            Ok(details) => details,
            Err(err) => {
                // A failing local read falls through to the mirrors rather
                // than surfacing a storage error to the client.
                warn!(
                    repository = repository.name(),
                    %gav,
                    error = %err,
                    "local lookup failed, trying proxied repositories"
                );
                return self.mirrors.find_remote_details(repository, gav).await;
            }
        };

        if matches!(details, FileDetails::Directory(_)) {
            self.security
                .can_browse_resource(access_token, repository, gav)
                .await?;
        }

        Ok(details)
    }

    async fn find_stream(
        &self,
        repository: &Arc<Repository>,
        gav: &Location,
    ) -> Result<ByteStream, ErrorResponse> {
        if repository.storage().exists(gav).await {
            match repository.storage().get_file(gav).await {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    warn!(
                        repository = repository.name(),
                        %gav,
                        error = %err,
                        "local read failed, trying proxied repositories"
                    );
                }
            }
        }

        let (_, stream) = self.mirrors.find_remote_file(repository, gav).await?;
        Ok(stream)
    }

    async fn record_resolved(
        &self,
        repository: &Repository,
        gav: &Location,
        details: &FileDetails,
    ) {
        if let FileDetails::Document(document) = details {
            self.record_document(repository, gav, document).await;
        }
    }

    async fn record_document(&self, repository: &Repository, gav: &Location, document: &DocumentInfo) {
        if IGNORED_EXTENSIONS
            .iter()
            .any(|suffix| document.name.ends_with(suffix))
        {
            return;
        }

        self.statistics
            .increment_resolved(Identifier::new(repository.name(), gav.as_str()))
            .await;
    }
}
