use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("User already exists")]
    UserAlreadyExists,

    /// Unknown login and wrong secret are deliberately indistinguishable.
    #[error("User has not been found")]
    InvalidCredentials,

    #[error("Token has not been authorized")]
    Unauthenticated,

    #[error("Item has not been found")]
    ItemNotFound,

    #[error("Recipient has not been found")]
    RecipientNotFound,

    #[error("Cannot send an item to yourself")]
    SelfTransferRejected,

    #[error("Item belongs to another user")]
    NotItemOwner,

    #[error("Sending has not been found")]
    TransferNotFound,

    #[error("User has not been authorized for the confirmation")]
    NotAuthorizedForConfirmation,

    #[error("Item has already been received")]
    AlreadyCompleted,
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Store(e) => AppError::InternalError(e),
            ServiceError::UserAlreadyExists => AppError::Conflict(anyhow::anyhow!(message)),
            ServiceError::InvalidCredentials
            | ServiceError::Unauthenticated
            | ServiceError::NotAuthorizedForConfirmation => {
                AppError::Unauthorized(anyhow::anyhow!(message))
            }
            ServiceError::ItemNotFound
            | ServiceError::RecipientNotFound
            | ServiceError::TransferNotFound => AppError::NotFound(anyhow::anyhow!(message)),
            ServiceError::SelfTransferRejected | ServiceError::AlreadyCompleted => {
                AppError::BadRequest(anyhow::anyhow!(message))
            }
            ServiceError::NotItemOwner => AppError::Forbidden(anyhow::anyhow!(message)),
        }
    }
}
