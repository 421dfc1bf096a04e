//! Request, response and event types exchanged between the resolution
//! engine and its callers.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use quarry_core::{AccessTokenId, Location};

use crate::repository::Repository;

/// Error payload returned by every engine operation. The status code maps
/// directly onto the HTTP response emitted by the frontend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}

const DIRECTORY_REJECTION: &str = "Requested file is a directory";

impl ErrorResponse {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Whether this is the rejection produced by [`directory_rejection`],
    /// so callers can fall back to a listing without matching on wording.
    pub fn is_directory_rejection(&self) -> bool {
        self.status == 404 && self.message == DIRECTORY_REJECTION
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ErrorResponse {}

pub fn bad_request(message: impl Into<String>) -> ErrorResponse {
    ErrorResponse::new(400, message)
}

pub fn unauthorized(message: impl Into<String>) -> ErrorResponse {
    ErrorResponse::new(401, message)
}

pub fn not_found(message: impl Into<String>) -> ErrorResponse {
    ErrorResponse::new(404, message)
}

pub fn not_acceptable(message: impl Into<String>) -> ErrorResponse {
    ErrorResponse::new(406, message)
}

pub fn internal_error(message: impl Into<String>) -> ErrorResponse {
    ErrorResponse::new(500, message)
}

pub fn bad_request_error<T>(message: impl Into<String>) -> Result<T, ErrorResponse> {
    Err(bad_request(message))
}

pub fn unauthorized_error<T>(message: impl Into<String>) -> Result<T, ErrorResponse> {
    Err(unauthorized(message))
}

pub fn not_found_error<T>(message: impl Into<String>) -> Result<T, ErrorResponse> {
    Err(not_found(message))
}

/// Content requests that resolved to a directory are not streamable.
pub fn directory_rejection() -> ErrorResponse {
    not_found(DIRECTORY_REJECTION)
}

/// A read request against a repository. `gav` is the artifact path below
/// the repository root.
#[derive(Debug, Clone)]
pub struct LookupRequest {
    pub access_token: Option<AccessTokenId>,
    pub repository: String,
    pub gav: Location,
}

impl LookupRequest {
    pub fn new(
        access_token: Option<AccessTokenId>,
        repository: impl Into<String>,
        gav: Location,
    ) -> Self {
        Self {
            access_token,
            repository: repository.into(),
            gav,
        }
    }
}

/// A write request. Authorization is checked by the caller before the
/// repository handle is handed over.
pub struct DeployRequest {
    pub repository: Arc<Repository>,
    pub gav: Location,
    pub content: Bytes,
    pub by: String,
}

pub struct DeleteRequest {
    pub access_token: Option<AccessTokenId>,
    pub repository: Arc<Repository>,
    pub gav: Location,
    pub by: String,
}

/// Stable key identifying a resolved artifact for statistics purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub repository: String,
    pub gav: String,
}

impl Identifier {
    pub fn new(repository: impl Into<String>, gav: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            gav: gav.into(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.repository, self.gav)
    }
}

/// Emitted after a request passed repository lookup and access control,
/// before any storage or mirror work happens.
pub struct PreResolveEvent {
    pub access_token: Option<AccessTokenId>,
    pub repository: Arc<Repository>,
    pub gav: Location,
}

/// Emitted once a file lookup produced a streamable document.
pub struct ResolvedFileEvent {
    pub access_token: Option<AccessTokenId>,
    pub repository: Arc<Repository>,
    pub gav: Location,
}

/// Emitted after a successful deploy.
pub struct DeployEvent {
    pub repository: Arc<Repository>,
    pub gav: Location,
    pub by: String,
}
