//! Ordered fallback over a repository's configured mirrors.

use std::sync::Arc;

use tracing::{debug, warn};

use quarry_core::{Location, MirrorConfig};
use quarry_storage::{single_chunk_stream, ByteStream, DocumentInfo, FileDetails};

use crate::api::{not_found, ErrorResponse};
use crate::remote::RemoteClient;
use crate::repository::Repository;

/// Resolves artifacts missing from local storage against the repository's
/// mirrors, first match wins. Fetched artifacts are persisted locally when
/// the mirror has `store` enabled.
pub struct MirrorService {
    client: Arc<dyn RemoteClient>,
}

impl MirrorService {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    pub async fn find_remote_details(
        &self,
        repository: &Repository,
        gav: &Location,
    ) -> Result<FileDetails, ErrorResponse> {
        for mirror in repository.mirrors() {
            let uri = remote_uri(mirror, gav);

            match self.client.head(&uri, mirror, gav).await {
                Ok(details) => {
                    debug!(%uri, "artifact found in remote repository");
                    return Ok(FileDetails::Document(details));
                }
                Err(err) => {
                    debug!(%uri, status = err.status, reason = %err.message, "mirror miss");
                }
            }
        }

        Err(missing(gav))
    }

    pub async fn find_remote_file(
        &self,
        repository: &Repository,
        gav: &Location,
    ) -> Result<(DocumentInfo, ByteStream), ErrorResponse> {
        for mirror in repository.mirrors() {
            let uri = remote_uri(mirror, gav);

            match self.client.get(&uri, mirror, gav).await {
                Ok((details, body)) => {
                    debug!(%uri, length = body.len(), "artifact fetched from remote repository");

                    if mirror.store {
                        if let Err(err) = repository.storage().put_file(gav, body.clone()).await {
                            // Serving the fetched copy still succeeds; only
                            // the local cache write failed.
                            warn!(
                                repository = repository.name(),
                                %gav,
                                error = %err,
                                "failed to store proxied artifact locally"
                            );
                        }
                    }

                    return Ok((details, single_chunk_stream(body)));
                }
                Err(err) => {
                    debug!(%uri, status = err.status, reason = %err.message, "mirror miss");
                }
            }
        }

        Err(missing(gav))
    }
}

fn remote_uri(mirror: &MirrorConfig, gav: &Location) -> String {
    format!("{}/{gav}", mirror.url.trim_end_matches('/'))
}

fn missing(gav: &Location) -> ErrorResponse {
    not_found(format!(
        "Cannot find '{gav}' in local and remote repositories"
    ))
}
