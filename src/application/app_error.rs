use thiserror::Error;

use crate::{
    application::ports::payment_processor::TransportError,
    domain::entities::payment_processor::PaymentProcessor,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Fetch failure during reconciliation, propagated as-is.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Failure of a lifecycle command, scoped to the processor it was sent to.
    #[error("{processor} request failed: {source}")]
    Processor {
        processor: PaymentProcessor,
        #[source]
        source: TransportError,
    },

    #[error("Payment processor not supported")]
    ProcessorNotSupported,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn processor(processor: PaymentProcessor, source: TransportError) -> Self {
        AppError::Processor { processor, source }
    }

    /// Whether retrying the same operation later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(_) | AppError::Internal(_) => true,
            AppError::Transport(source) | AppError::Processor { source, .. } => {
                source.is_retryable()
            }
            AppError::InvalidInput(_)
            | AppError::Validation(_)
            | AppError::Precondition(_)
            | AppError::NotImplemented(_)
            | AppError::ProcessorNotSupported
            | AppError::Unauthorized
            | AppError::NotFound => false,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::Precondition(_) => ErrorCode::PreconditionFailed,
            AppError::NotImplemented(_) => ErrorCode::NotImplemented,
            AppError::Transport(_) => ErrorCode::TransportError,
            AppError::Processor { .. } => ErrorCode::ProcessorError,
            AppError::ProcessorNotSupported => ErrorCode::ProcessorNotSupported,
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseError,
    InvalidInput,
    ValidationError,
    PreconditionFailed,
    NotImplemented,
    TransportError,
    ProcessorError,
    ProcessorNotSupported,
    Unauthorized,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::ProcessorError => "PROCESSOR_ERROR",
            ErrorCode::ProcessorNotSupported => "PROCESSOR_NOT_SUPPORTED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
