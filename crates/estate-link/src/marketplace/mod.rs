//! Marketplace domain modules: identity (registration, login, sessions), the
//! credit ledger gating seller-contact access, and the property catalog. Each
//! module exposes its gateway traits, a service, and an axum router.

pub mod credits;
pub mod identity;
pub mod listings;

#[cfg(test)]
mod tests;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

/// Error enumeration for hosted table-store failures, shared by every gateway
/// that reads or writes backend rows.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("row already exists")]
    Conflict,
    #[error("row not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store returned a malformed row: {0}")]
    Malformed(String),
}

/// Extracts the opaque access token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// JSON error envelope used by every failure response.
pub fn error_body(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "status": "error", "message": message.into() }))
}
