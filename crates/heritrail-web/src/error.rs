//! Mapping library errors onto user-facing API errors.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use heritrail_backend::BackendError;
use heritrail_common::ApiError;
use heritrail_media::MediaError;
use heritrail_resolver::ResolverError;

pub trait IntoApiError {
    fn into_api(self) -> ApiError;
}

impl IntoApiError for ResolverError {
    fn into_api(self) -> ApiError {
        match self {
            e if e.is_input_error() => ApiError::BadRequest(e.to_string()),
            ResolverError::Common(e) => ApiError::from(e),
            ResolverError::Config(msg) => ApiError::Internal(msg),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl IntoApiError for BackendError {
    fn into_api(self) -> ApiError {
        match self {
            BackendError::Unauthorized(_) => ApiError::Unauthorized("Please sign in again.".to_string()),
            BackendError::Forbidden(msg) => ApiError::Forbidden(capitalise(&msg)),
            BackendError::NotFound(msg) => ApiError::NotFound(format!("Not found: {msg}")),
            e @ (BackendError::Http(_) | BackendError::Status { .. }) => {
                tracing::warn!(error = %e, "Backend request failed");
                ApiError::Upstream("The database is unavailable. Please try again.".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoApiError for MediaError {
    fn into_api(self) -> ApiError {
        match self {
            MediaError::Fetch(msg) => ApiError::Upstream(format!("Could not fetch image: {msg}")),
            e @ MediaError::TooLarge { .. } => ApiError::PayloadTooLarge(e.to_string()),
            e @ (MediaError::NotAnImage(_) | MediaError::Decode(_)) => ApiError::UnsupportedMedia(e.to_string()),
            MediaError::Blocked(msg) => ApiError::Forbidden(msg),
            e @ MediaError::Encode(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoApiError for JsonRejection {
    fn into_api(self) -> ApiError {
        match self.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge("Request body is too large".to_string()),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => ApiError::UnsupportedMedia("Expected a JSON body".to_string()),
            _ => ApiError::BadRequest(self.body_text()),
        }
    }
}

impl IntoApiError for QueryRejection {
    fn into_api(self) -> ApiError {
        ApiError::BadRequest(self.body_text())
    }
}

impl IntoApiError for MultipartError {
    fn into_api(self) -> ApiError {
        match self.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge("Upload is too large".to_string()),
            _ => ApiError::BadRequest(self.body_text()),
        }
    }
}

fn capitalise(msg: &str) -> String {
    let mut chars = msg.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_input_errors_are_bad_requests() {
        let api = ResolverError::EmptyInput.into_api();
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.user_message(), "Input is empty");
    }

    #[test]
    fn test_backend_mapping() {
        assert_eq!(BackendError::Unauthorized("jwt expired".into()).into_api().status(), StatusCode::UNAUTHORIZED);
        let forbidden = BackendError::Forbidden("you can only delete your own reviews".into()).into_api();
        assert_eq!(forbidden.user_message(), "You can only delete your own reviews");
        let upstream = BackendError::Status { status: 500, message: "relation does not exist".into() }.into_api();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert!(!upstream.user_message().contains("relation"));
    }

    #[test]
    fn test_media_mapping() {
        assert_eq!(MediaError::TooLarge { size: 2, max: 1 }.into_api().status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(MediaError::NotAnImage("text/html".into()).into_api().status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(MediaError::Blocked("private".into()).into_api().status(), StatusCode::FORBIDDEN);
        assert_eq!(MediaError::Fetch("404".into()).into_api().status(), StatusCode::BAD_GATEWAY);
    }
}
