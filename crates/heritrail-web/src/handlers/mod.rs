//! HTTP handlers for all API routes.

pub mod system;
pub mod bibliography;
pub mod images;
pub mod gallery;
pub mod reviews;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use heritrail_common::ApiError;

/// The access token from `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Please sign in to continue.".to_string()))
}

/// Record ids are UUIDs; anything else never reaches the backend.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<String, ApiError> {
    uuid::Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(bearer_token(&headers).is_err());
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id("5f0c6a1e-8d1b-4a43-9d0e-2b0f3c1a7e11", "review id").is_ok());
        let err = parse_id("1 OR 1=1", "review id").unwrap_err();
        assert_eq!(err.user_message(), "Invalid review id");
    }
}
