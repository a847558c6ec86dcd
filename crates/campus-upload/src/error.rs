use crate::validator::ValidationError;
use campus_core::models::MissingPathParam;
use campus_core::AppError;
use campus_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid upload state transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<MissingPathParam> for UploadError {
    fn from(err: MissingPathParam) -> Self {
        UploadError::Validation(ValidationError::MissingPathParam(err))
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Storage(e) => e.into(),
            UploadError::Validation(ValidationError::Rejected(rejection)) => match rejection {
                crate::Rejection::TooLarge { .. } => AppError::PayloadTooLarge(rejection.to_string()),
                crate::Rejection::TypeNotAllowed { .. } => {
                    AppError::UnsupportedMediaType(rejection.to_string())
                }
            },
            UploadError::Validation(e) => AppError::InvalidInput(e.to_string()),
            UploadError::InvalidTransition { .. } => AppError::Internal(err.to_string()),
        }
    }
}
