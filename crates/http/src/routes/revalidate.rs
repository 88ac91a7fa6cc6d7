//! Revalidation webhook
//!
//! The backend calls this after a write so storefront reads stop serving the
//! old data. The shared secret travels in the query string.

use crate::{AppState, HttpError};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa_axum::{router::OpenApiRouter, routes};

pub const INVALID_SECRET: &str = "Invalid secret";

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RevalidateParams {
    /// Must equal `REVALIDATION_SECRET`
    pub secret: Option<String>,
}

/// What to invalidate; with neither field the whole cache is purged
#[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RevalidateRequest {
    /// Entity name, e.g. `products`
    #[serde(default)]
    pub tag: Option<String>,
    /// Storefront page paths, locale prefix optional
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Epoch milliseconds of the revalidation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    /// Cache entries dropped
    #[serde(default)]
    pub invalidated: usize,
}

impl RevalidateResponse {
    fn rejected() -> Self {
        Self {
            revalidated: false,
            message: Some(INVALID_SECRET.to_string()),
            now: None,
            tag: None,
            paths: Vec::new(),
            invalidated: 0,
        }
    }
}

/// Compare without short-circuiting on the first differing byte
fn secrets_match(expected: &str, given: &str) -> bool {
    let (expected, given) = (expected.as_bytes(), given.as_bytes());
    if expected.len() != given.len() {
        return false;
    }
    expected
        .iter()
        .zip(given)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Invalidate cached queries by tag and/or path
#[utoipa::path(
    post,
    path = "/api/revalidate",
    params(RevalidateParams),
    request_body(content = RevalidateRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Cache invalidated", body = RevalidateResponse),
        (status = 400, description = "Malformed body", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or wrong secret", body = RevalidateResponse),
    ),
    tag = "revalidate"
)]
#[instrument(name = "revalidate", skip_all)]
pub async fn revalidate(
    State(state): State<AppState>,
    Query(params): Query<RevalidateParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<RevalidateResponse>), HttpError> {
    let authorized = match (&state.revalidation_secret, params.secret.as_deref()) {
        (Some(expected), Some(given)) => secrets_match(expected, given),
        _ => false,
    };
    if !authorized {
        warn!("revalidation refused");
        return Ok((StatusCode::UNAUTHORIZED, Json(RevalidateResponse::rejected())));
    }

    let request: RevalidateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RevalidateRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| HttpError::BadRequest(format!("invalid revalidation body: {e}")))?
    };

    let invalidated = if request.tag.is_none() && request.paths.is_empty() {
        state.cache.clear().await
    } else {
        let mut removed = 0;
        if let Some(tag) = &request.tag {
            removed += state.cache.invalidate_tag(tag).await;
        }
        for path in &request.paths {
            removed += state.cache.invalidate_path(path).await;
        }
        removed
    };

    info!(tag = ?request.tag, paths = ?request.paths, invalidated, "revalidated");
    Ok((
        StatusCode::OK,
        Json(RevalidateResponse {
            revalidated: true,
            message: None,
            now: Some(chrono::Utc::now().timestamp_millis()),
            tag: request.tag,
            paths: request.paths,
            invalidated,
        }),
    ))
}

pub fn add_routes(router: OpenApiRouter<AppState>) -> OpenApiRouter<AppState> {
    router.routes(routes!(revalidate))
}
