//! Conditional GET support for the public course reads.
//!
//! The ETag is a quoted hex SHA-256 over the exact JSON body that would be sent.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

pub const CACHE_CONTROL_VALUE: &str = "public, max-age=60";

/// Compute an ETag for a serialized response body.
pub fn compute_etag(body: &[u8]) -> String {
    let hash = Sha256::digest(body);
    format!("\"{}\"", hex::encode(hash))
}

/// Whether `If-None-Match` names `etag` (or is `*`). Weak validators compare by opaque tag.
pub fn if_none_match_hits(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
}

/// Serializes `value`, tags it, and answers 304 with no body when the client
/// already holds the same representation.
pub fn cached_json<T: Serialize>(
    request_headers: &HeaderMap,
    value: &T,
) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| anyhow::anyhow!("response serialization failed: {e}"))?;
    let etag = compute_etag(&body);
    let etag_value = HeaderValue::from_str(&etag)
        .map_err(|e| anyhow::anyhow!("invalid etag header: {e}"))?;
    let cache_control = HeaderValue::from_static(CACHE_CONTROL_VALUE);

    if if_none_match_hits(request_headers, &etag) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag_value), (header::CACHE_CONTROL, cache_control)],
        )
            .into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::ETAG, etag_value),
            (header::CACHE_CONTROL, cache_control),
        ],
        body,
    )
        .into_response())
}
