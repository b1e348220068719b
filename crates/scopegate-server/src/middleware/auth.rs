use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use scopegate_core::CallerIdentity;

use crate::api_key_repository::ApiKeyRepository;
use crate::auth::{self, AuthError};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";
pub const PROFILE_ID_HEADER: &str = "x-profile-id";

/// Resolves the caller before any request reaches the dispatcher.
///
/// Without a repository the gateway runs in dev mode and trusts the
/// `x-user-id`, `x-account-id` and `x-profile-id` headers. With one, callers
/// present `Authorization: Bearer scopegate_<key_id>_<secret>`.
#[derive(Clone)]
pub struct AuthState {
    repository: Option<Arc<ApiKeyRepository>>,
}

impl AuthState {
    pub fn dev_mode() -> Self {
        Self { repository: None }
    }

    pub fn with_repository(repository: Arc<ApiKeyRepository>) -> Self {
        Self {
            repository: Some(repository),
        }
    }
}

fn skip_auth(path: &str) -> bool {
    matches!(path, "/healthz" | "/metrics")
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn identity_from_headers(headers: &HeaderMap) -> Option<CallerIdentity> {
    let user_id = header_value(headers, USER_ID_HEADER)?;
    let mut identity = CallerIdentity::new(user_id);
    if let Some(account) = header_value(headers, ACCOUNT_ID_HEADER) {
        identity = identity.with_account(account);
    }
    if let Some(profile) = header_value(headers, PROFILE_ID_HEADER) {
        identity = identity.with_profile(profile);
    }
    Some(identity)
}

async fn resolve_api_key(
    repo: &ApiKeyRepository,
    headers: &HeaderMap,
) -> Result<CallerIdentity, Response> {
    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized(&AuthError::MissingHeader))?;

    let raw_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| error_json(StatusCode::UNAUTHORIZED, "invalid authorization format"))?;

    let (key_id, _) = auth::parse_api_key(raw_key).map_err(|e| unauthorized(&e))?;

    let lookup_result = repo.lookup_by_key_id(key_id).await.map_err(|e| {
        tracing::error!(error = %e, "api key lookup failed");
        error_json(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    })?;

    match auth::authenticate(raw_key, |_| lookup_result) {
        Ok(caller) => {
            tracing::debug!(key_id = %caller.key_id, "api key authenticated");
            Ok(caller.identity)
        }
        Err(AuthError::Internal(e)) => {
            tracing::error!(error = %e, "api key verification failed");
            Err(error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            ))
        }
        Err(AuthError::RevokedKey) => Err(unauthorized(&AuthError::RevokedKey)),
        Err(_) => Err(error_json(StatusCode::UNAUTHORIZED, "invalid api key")),
    }
}

pub async fn rest_auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if skip_auth(request.uri().path()) {
        return next.run(request).await;
    }

    let identity = match auth_state.repository {
        None => match identity_from_headers(request.headers()) {
            Some(identity) => identity,
            None => return error_json(StatusCode::UNAUTHORIZED, "authentication required"),
        },
        Some(ref repo) => match resolve_api_key(repo, request.headers()).await {
            Ok(identity) => identity,
            Err(response) => return response,
        },
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn unauthorized(err: &AuthError) -> Response {
    error_json(StatusCode::UNAUTHORIZED, &err.to_string())
}

fn error_json(status: StatusCode, msg: &str) -> Response {
    let body = serde_json::json!({"error": msg});
    (status, axum::Json(body)).into_response()
}
