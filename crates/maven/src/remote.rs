//! HTTP client used to consult upstream mirrors.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use time::OffsetDateTime;

use quarry_core::{AuthenticationMethod, Location, MirrorConfig, MirrorCredentials};
use quarry_storage::{content_type_for, DocumentInfo};

use crate::api::{bad_request, not_acceptable, ErrorResponse};

/// Performs HEAD and GET requests against one mirror URI. Abstracted so the
/// fallback loop can be exercised without a live upstream.
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    /// Checks whether the remote has the document, returning its metadata.
    async fn head(
        &self,
        uri: &str,
        mirror: &MirrorConfig,
        gav: &Location,
    ) -> Result<DocumentInfo, ErrorResponse>;

    /// Fetches the document body together with its metadata.
    async fn get(
        &self,
        uri: &str,
        mirror: &MirrorConfig,
        gav: &Location,
    ) -> Result<(DocumentInfo, Bytes), ErrorResponse>;
}

/// [`RemoteClient`] backed by reqwest. A client is built per request so each
/// mirror's timeouts apply exactly.
#[derive(Default)]
pub struct HttpRemoteClient;

impl HttpRemoteClient {
    pub fn new() -> Self {
        Self
    }

    fn client(mirror: &MirrorConfig) -> Result<reqwest::Client, ErrorResponse> {
        reqwest::Client::builder()
            .connect_timeout(mirror.connect_timeout())
            .timeout(mirror.read_timeout())
            .build()
            .map_err(|err| bad_request(format!("Cannot create client for mirror: {err}")))
    }

    fn authorize(
        request: RequestBuilder,
        credentials: Option<&MirrorCredentials>,
    ) -> RequestBuilder {
        match credentials {
            Some(credentials) => match credentials.method {
                AuthenticationMethod::Basic => {
                    request.basic_auth(&credentials.login, Some(&credentials.secret))
                }
                AuthenticationMethod::CustomHeader => {
                    request.header(&credentials.login, &credentials.secret)
                }
            },
            None => request,
        }
    }

    /// Rejects upstream responses that are not plain artifact content.
    /// Mirrors of public portals answer missing paths with HTML search
    /// pages, which must not be cached as artifacts.
    fn validate(uri: &str, response: &Response) -> Result<(), ErrorResponse> {
        if !response.status().is_success() {
            return Err(not_acceptable(format!(
                "Unsupported response status {} from {uri}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        if content_type.starts_with("text/html") {
            return Err(not_acceptable(format!(
                "Unsupported text/html response from {uri}"
            )));
        }

        Ok(())
    }

    fn document_info(response: &Response, gav: &Location) -> DocumentInfo {
        let headers = response.headers();

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for(gav).to_string());

        // A gzip-encoded transfer reports the compressed size; the decoded
        // length is unknown until the body is consumed.
        let gzip = headers
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|encoding| encoding.contains("gzip"));

        let content_length = if gzip {
            None
        } else {
            headers
                .get(CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
        };

        DocumentInfo {
            name: gav.simple_name().to_string(),
            content_type,
            content_length,
            last_modified: Some(OffsetDateTime::now_utc()),
        }
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn head(
        &self,
        uri: &str,
        mirror: &MirrorConfig,
        gav: &Location,
    ) -> Result<DocumentInfo, ErrorResponse> {
        let client = Self::client(mirror)?;
        let request = Self::authorize(client.head(uri), mirror.credentials.as_ref());

        let response = request
            .send()
            .await
            .map_err(|err| bad_request(format!("HEAD {uri} failed: {err}")))?;

        Self::validate(uri, &response)?;
        Ok(Self::document_info(&response, gav))
    }

    async fn get(
        &self,
        uri: &str,
        mirror: &MirrorConfig,
        gav: &Location,
    ) -> Result<(DocumentInfo, Bytes), ErrorResponse> {
        let client = Self::client(mirror)?;
        let request = Self::authorize(client.get(uri), mirror.credentials.as_ref());

        let response = request
            .send()
            .await
            .map_err(|err| bad_request(format!("GET {uri} failed: {err}")))?;

        Self::validate(uri, &response)?;
        let details = Self::document_info(&response, gav);

        let body = response
            .bytes()
            .await
            .map_err(|err| bad_request(format!("Cannot read response body from {uri}: {err}")))?;

        Ok((details, body))
    }
}
