use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeritrailError {
    #[error("HTTP request error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, HeritrailError>;

/// Transport errors caused by the sandbox guard are security errors, not outages.
impl From<reqwest::Error> for HeritrailError {
    fn from(err: reqwest::Error) -> Self {
        match crate::sandbox::blocked_reason(&err) {
            Some(reason) => HeritrailError::Security(reason),
            None => HeritrailError::Http(err),
        }
    }
}

/// Errors returned from HTTP handlers. The message is shown to the user as-is,
/// except for `Internal`, whose detail only goes to the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    UnsupportedMedia(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)       => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_)     => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_)        => StatusCode::FORBIDDEN,
            ApiError::NotFound(_)         => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_)  => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Upstream(_)         => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_)         => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the `error` field of the response body.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Something went wrong. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        let body = serde_json::json!({ "error": self.user_message() });
        (status, Json(body)).into_response()
    }
}

impl From<HeritrailError> for ApiError {
    fn from(err: HeritrailError) -> Self {
        match err {
            HeritrailError::InvalidUrl(msg) => ApiError::BadRequest(format!("Invalid URL: {msg}")),
            HeritrailError::Security(msg)   => ApiError::Forbidden(msg),
            HeritrailError::Http(e)         => ApiError::Upstream(format!("Upstream request failed: {e}")),
            other                           => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::PayloadTooLarge("x".into()).status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let err = ApiError::Internal("connection string leaked".into());
        assert!(!err.user_message().contains("leaked"));
        let err = ApiError::NotFound("Review not found".into());
        assert_eq!(err.user_message(), "Review not found");
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let resp = ApiError::BadRequest("Input is empty".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Input is empty");
    }

    #[test]
    fn test_security_error_maps_to_forbidden() {
        let api: ApiError = HeritrailError::Security("blocked".into()).into();
        assert_eq!(api.status(), StatusCode::FORBIDDEN);
    }
}
