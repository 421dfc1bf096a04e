//! Basic authentication middleware.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use quarry_core::AccessTokenId;

use crate::error::ApiError;
use crate::state::AppState;

/// Identity resolved from request credentials. Anonymous requests carry
/// `token: None`; access decisions happen downstream in the engine.
#[derive(Clone, Debug)]
pub struct RequestIdentity {
    pub token: Option<AccessTokenId>,
    pub name: String,
}

impl RequestIdentity {
    fn anonymous() -> Self {
        Self {
            token: None,
            name: "anonymous".to_string(),
        }
    }
}

/// Parse `Authorization: Basic` credentials into a name/secret pair.
/// Per RFC 7617, the scheme is case-insensitive and the secret may
/// contain colons.
fn extract_basic_credentials(req: &Request) -> Option<(String, String)> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    if header.len() < 6 || !header[..6].eq_ignore_ascii_case("basic ") {
        return None;
    }

    let decoded = STANDARD.decode(header[6..].trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, secret) = decoded.split_once(':')?;
    Some((name.to_string(), secret.to_string()))
}

/// Resolves credentials against the vault and attaches a [`RequestIdentity`]
/// to every request. Invalid credentials are rejected outright rather than
/// downgraded to anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = match extract_basic_credentials(&req) {
        Some((name, secret)) => match state.vault.authenticate(&name, &secret).await {
            Some(id) => RequestIdentity {
                token: Some(id),
                name,
            },
            None => {
                return Err(ApiError(quarry_maven::api::unauthorized(
                    "Invalid authorization credentials",
                )));
            }
        },
        None => RequestIdentity::anonymous(),
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
