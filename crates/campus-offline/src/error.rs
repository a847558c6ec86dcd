use campus_core::AppError;
use thiserror::Error;

/// The network could not produce a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Cache storage could not be opened or read.
    #[error("Cache storage unavailable: {0}")]
    CacheUnavailable(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Precache of {path} failed: {reason}")]
    InstallFailed { path: String, reason: String },

    #[error("Cannot {action} while {state}")]
    InvalidLifecycle {
        action: &'static str,
        state: &'static str,
    },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Fetch(e) => AppError::Network(e.to_string()),
            invalid @ GatewayError::InvalidUrl { .. } => AppError::InvalidInput(invalid.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}
