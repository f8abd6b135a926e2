use sqlx::PgPool;

use crate::app_error::AppError;

pub mod billable_owner;
pub mod subscription;

/// Postgres `invalid_text_representation`, raised for unknown enum labels
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::InvalidInput("A record with this value already exists".into())
                } else if db_err.is_foreign_key_violation() {
                    AppError::InvalidInput("Referenced record not found".into())
                } else if db_err.is_check_violation() {
                    AppError::Validation(format!(
                        "Value rejected by {}",
                        db_err.constraint().unwrap_or("check constraint")
                    ))
                } else if db_err.code().as_deref() == Some(INVALID_TEXT_REPRESENTATION) {
                    AppError::Validation(db_err.message().to_string())
                } else {
                    // Log the actual error for debugging, but don't expose details
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
