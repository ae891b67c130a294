use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::domain::validate::{FieldLimits, enforce_length, require_meaningful_text};

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("violates foreign key constraint")
                || db.message().contains("invalid input syntax") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("violates") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}

/// Runs the domain text check at the persistence boundary. The database
/// carries matching CHECK constraints, but failing here keeps the error a
/// plain validation message rather than a decoded constraint violation.
pub fn check_text(field: &'static str, text: &str, limits: &FieldLimits) -> Result<(), RepoError> {
    match require_meaningful_text(field, text, limits) {
        Ok(_) => Ok(()),
        Err(DomainError::Validation { message }) => Err(RepoError::InvalidInput { message }),
        Err(other) => Err(RepoError::invalid_input(other.to_string())),
    }
}

/// Length-only variant of [`check_text`] for fields that may stay empty.
pub fn check_length(
    field: &'static str,
    text: &str,
    limits: &FieldLimits,
) -> Result<(), RepoError> {
    match enforce_length(field, text, limits) {
        Ok(_) => Ok(()),
        Err(DomainError::Validation { message }) => Err(RepoError::InvalidInput { message }),
        Err(other) => Err(RepoError::invalid_input(other.to_string())),
    }
}

/// Group slugs address URLs, so only the canonical spelling is stored; two
/// renderings of the same slug would split one group across URLs.
pub fn check_slug(field: &'static str, value: &str, limits: &FieldLimits) -> Result<(), RepoError> {
    check_text(field, value, limits)?;
    if slug::slugify(value) != value {
        return Err(RepoError::InvalidInput {
            message: format!("{field} `{value}` is not a canonical slug"),
        });
    }
    Ok(())
}
