use campus_core::AppError;
use thiserror::Error;

/// Data service errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Data service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    /// Classify a non-success response. `code` is the PostgREST/Postgres error code, if any.
    pub fn from_status(status: u16, code: Option<&str>, message: String) -> Self {
        match (status, code) {
            (401 | 403, _) | (_, Some("42501")) => DataError::PermissionDenied(message),
            (404, _) => DataError::NotFound(message),
            (409, _) | (_, Some("23505")) => DataError::Conflict(message),
            (400, Some(code)) if code.starts_with("PGRST") || code == "42703" => {
                DataError::InvalidQuery(message)
            }
            _ => DataError::Service { status, message },
        }
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Network(msg) => AppError::Network(msg),
            DataError::NotFound(msg) => AppError::NotFound(msg),
            DataError::PermissionDenied(msg) => AppError::PermissionDenied(msg),
            DataError::InvalidQuery(msg) => AppError::InvalidInput(msg),
            DataError::Config(msg) => AppError::Config(msg),
            other => AppError::DataService(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            DataError::from_status(401, None, "jwt expired".into()),
            DataError::PermissionDenied(_)
        ));
        assert!(matches!(
            DataError::from_status(400, Some("42501"), "rls".into()),
            DataError::PermissionDenied(_)
        ));
        assert!(matches!(
            DataError::from_status(409, Some("23505"), "duplicate key".into()),
            DataError::Conflict(_)
        ));
        assert!(matches!(
            DataError::from_status(400, Some("PGRST100"), "bad filter".into()),
            DataError::InvalidQuery(_)
        ));
        assert!(matches!(
            DataError::from_status(500, None, "boom".into()),
            DataError::Service { status: 500, .. }
        ));
    }

    #[test]
    fn converts_into_app_error() {
        let app: AppError = DataError::NotFound("courses".into()).into();
        assert!(matches!(app, AppError::NotFound(_)));
    }
}
