//! API key and basic authentication middleware

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::ServerError;
use crate::server::AppState;

/// Header carrying the API key when it is not in the query string
pub const API_KEY_HEADER: &str = "x-api-key";

/// Query parameter carrying the API key
pub const API_KEY_PARAM: &str = "code";

/// Pick the API key from `?code=` or the `x-api-key` header.
///
/// An empty `code` falls through to the header. A `code` given more than
/// once is ambiguous and is ignored in favor of the header; with no header
/// it counts as an invalid key.
pub fn api_key_from_request<'a>(
    query: &'a [(String, String)],
    headers: &'a HeaderMap,
) -> Result<Option<&'a str>, ServerError> {
    let mut codes = query
        .iter()
        .filter(|(name, value)| name == API_KEY_PARAM && !value.is_empty())
        .map(|(_, value)| value.as_str());
    let first = codes.next();
    let repeated = codes.next().is_some();

    if let (Some(code), false) = (first, repeated) {
        return Ok(Some(code));
    }

    let header = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|key| !key.is_empty());

    match header {
        Some(key) => Ok(Some(key)),
        None if repeated => Err(ServerError::InvalidApiKey),
        None => Ok(None),
    }
}

/// Compare a provided API key against the configured one
pub fn check_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), ServerError> {
    let provided = provided.ok_or(ServerError::MissingApiKey)?;
    let expected = expected.ok_or(ServerError::Config("API key not configured"))?;
    if provided != expected {
        return Err(ServerError::InvalidApiKey);
    }
    Ok(())
}

/// Middleware guarding the playlist endpoint
pub async fn require_api_key(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ServerError> {
    check_api_key(
        state.config.api_key.as_deref(),
        api_key_from_request(&query, &headers)?,
    )?;
    Ok(next.run(request).await)
}

/// Decode an `Authorization: Basic ...` value into (login, password).
///
/// Both parts must be non-empty. The password may contain `:`.
pub fn parse_basic_credentials(value: &str) -> Option<(String, String)> {
    let encoded = value.split_whitespace().nth(1)?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (login, password) = decoded.split_once(':')?;
    if login.is_empty() || password.is_empty() {
        return None;
    }
    Some((login.to_string(), password.to_string()))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"401\"")],
        "Authentication required.",
    )
        .into_response()
}

/// Middleware guarding the video files with HTTP basic auth
pub async fn require_basic_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Response {
    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_credentials);

    let config = &state.config;
    let authorized = match (
        credentials,
        config.auth_username.as_deref(),
        config.auth_password.as_deref(),
    ) {
        (Some((login, password)), Some(user), Some(pass)) => login == user && password == pass,
        _ => false,
    };

    if authorized {
        next.run(request).await
    } else {
        unauthorized()
    }
}
