//! Maven repository endpoints.

use axum::body::Body;
use axum::extract::{Extension, Path, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;

use quarry_core::Location;
use quarry_maven::api::{bad_request, internal_error};
use quarry_maven::{DeleteRequest, DeployRequest, LookupRequest};
use quarry_storage::{DocumentInfo, FileDetails};

use crate::auth::RequestIdentity;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn parse_gav(gav: &str) -> ApiResult<Location> {
    gav.parse()
        .map_err(|err| ApiError(bad_request(format!("Invalid artifact path: {err}"))))
}

/// GET on a repository root returns the top-level directory listing.
pub async fn browse_repository(
    State(state): State<AppState>,
    Path(repository): Path<String>,
    Extension(identity): Extension<RequestIdentity>,
) -> ApiResult<Response> {
    let request = LookupRequest::new(identity.token, repository, Location::root());
    let details = state.maven.find_details(&request).await?;
    Ok(Json(details).into_response())
}

/// GET on an artifact path streams the file, or returns a JSON listing when
/// the path is a directory.
pub async fn get_artifact(
    State(state): State<AppState>,
    Path((repository, gav)): Path<(String, String)>,
    Extension(identity): Extension<RequestIdentity>,
) -> ApiResult<Response> {
    let request = LookupRequest::new(identity.token, repository, parse_gav(&gav)?);

    match state.maven.find_file(&request).await {
        Ok((document, stream)) => document_response(&document, Body::from_stream(stream)),
        Err(err) if err.is_directory_rejection() => {
            let details = state.maven.find_details(&request).await?;
            Ok(Json(details).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// HEAD reports metadata without a body.
pub async fn head_artifact(
    State(state): State<AppState>,
    Path((repository, gav)): Path<(String, String)>,
    Extension(identity): Extension<RequestIdentity>,
) -> ApiResult<Response> {
    let request = LookupRequest::new(identity.token, repository, parse_gav(&gav)?);

    match state.maven.find_details(&request).await? {
        FileDetails::Document(document) => document_response(&document, Body::empty()),
        FileDetails::Directory(_) => Ok(StatusCode::OK.into_response()),
    }
}

pub async fn deploy_artifact(
    State(state): State<AppState>,
    Path((repository, gav)): Path<(String, String)>,
    Extension(identity): Extension<RequestIdentity>,
    content: Bytes,
) -> ApiResult<Response> {
    let gav = parse_gav(&gav)?;

    let repository = state
        .maven
        .can_modify_resource(identity.token.as_ref(), &repository, &gav)
        .await?;

    state
        .maven
        .deploy_file(DeployRequest {
            repository,
            gav,
            content,
            by: identity.name,
        })
        .await?;

    Ok(StatusCode::OK.into_response())
}

pub async fn delete_artifact(
    State(state): State<AppState>,
    Path((repository, gav)): Path<(String, String)>,
    Extension(identity): Extension<RequestIdentity>,
) -> ApiResult<Response> {
    let repository = state.maven.registry().find_repository(&repository)?;

    state
        .maven
        .delete_file(DeleteRequest {
            access_token: identity.token,
            repository,
            gav: parse_gav(&gav)?,
            by: identity.name,
        })
        .await?;

    Ok(StatusCode::OK.into_response())
}

fn document_response(document: &DocumentInfo, body: Body) -> ApiResult<Response> {
    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, &document.content_type);

    if let Some(length) = document.content_length {
        response = response.header(CONTENT_LENGTH, length);
    }

    response
        .body(body)
        .map_err(|err| ApiError(internal_error(format!("Failed to build response: {err}"))))
}
