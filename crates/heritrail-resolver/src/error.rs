use heritrail_common::{HeritrailError, SourceKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Input is too long ({len} characters, maximum {max})")]
    InputTooLong { len: usize, max: usize },

    #[error("{provider} returned HTTP {status}")]
    Status { provider: SourceKind, status: u16 },

    #[error("{provider}: {message}")]
    Provider { provider: SourceKind, message: String },

    #[error("HTTP request error: {0}")]
    Http(#[source] reqwest::Error),

    #[error(transparent)]
    Common(#[from] HeritrailError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResolverError {
    /// Errors caused by what the user typed rather than by a provider.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ResolverError::EmptyInput | ResolverError::InputTooLong { .. })
    }
}

impl From<reqwest::Error> for ResolverError {
    fn from(err: reqwest::Error) -> Self {
        match HeritrailError::from(err) {
            HeritrailError::Http(e) => ResolverError::Http(e),
            other => ResolverError::Common(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;
