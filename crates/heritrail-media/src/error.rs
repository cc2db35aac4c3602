use heritrail_common::HeritrailError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to fetch image: {0}")]
    Fetch(String),

    #[error("Image is too large ({size} bytes, maximum {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Could not encode image: {0}")]
    Encode(String),

    #[error("Blocked: {0}")]
    Blocked(String),
}

impl From<reqwest::Error> for MediaError {
    fn from(e: reqwest::Error) -> Self {
        MediaError::from(HeritrailError::from(e))
    }
}

impl From<HeritrailError> for MediaError {
    fn from(e: HeritrailError) -> Self {
        match e {
            HeritrailError::Security(msg) | HeritrailError::InvalidUrl(msg) => MediaError::Blocked(msg),
            other => MediaError::Fetch(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
