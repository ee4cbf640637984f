use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Method, Request, header::AUTHORIZATION, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hospital_auth::{AuthError, authorize_path};
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppState;

/// Paths reachable without a bearer token.
const PUBLIC_PATHS: &[&str] = &["/healthz", "/register", "/login"];

/// Request id carried in request extensions and echoed in `x-request-id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub HeaderValue);

pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static("x-request-id");

    // If the incoming request already has a request-id, preserve it; otherwise generate one
    let req_id_value = req
        .headers()
        .get(&header_name)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    let Some(req_id_value) = req_id_value else {
        return next.run(req).await;
    };

    // Add to request extensions for downstream usage (e.g., logging)
    req.extensions_mut().insert(RequestId(req_id_value.clone()));

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

/// POST and PUT bodies must be JSON.
pub async fn require_json(req: Request<Body>, next: Next) -> Response {
    let needs_body_type = req.method() == Method::POST || req.method() == Method::PUT;

    if needs_body_type {
        let content_ok = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false);
        if !content_ok {
            return ApiError::UnsupportedMediaType.into_response();
        }
    }

    next.run(req).await
}

/// Validates the bearer token, applies the role policy, and stores the
/// claims in request extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if PUBLIC_PATHS.contains(&path.as_str()) {
        return next.run(req).await;
    }

    let token = match req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.strip_prefix("Bearer ").map(str::trim))
    {
        Some(Some(token)) if !token.is_empty() => token.to_string(),
        Some(_) => {
            return ApiError::from(AuthError::invalid_token("malformed Authorization header"))
                .into_response();
        }
        None => {
            tracing::debug!(path = %path, "No Authorization header");
            return ApiError::from(AuthError::MissingToken).into_response();
        }
    };

    let claims = match state.auth.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Token validation failed");
            return ApiError::from(e).into_response();
        }
    };

    if let Err(e) = authorize_path(&claims, &path) {
        tracing::info!(username = %claims.username, role = %claims.role, path = %path, "access denied");
        return ApiError::from(e).into_response();
    }

    req.extensions_mut().insert(claims);
    next.run(req).await
}
