pub mod cars;
pub mod claims;
pub mod policies;

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod test_support;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Handles database errors and maps them to application errors.
 *
 * # Arguments
 * `error`: The database error to handle.
 *
 * # Returns
 * An `ApplicationError` corresponding to the database error.
 */
pub fn handle_database_error(error: &sqlx::Error) -> ApplicationError {
    if let Some(db_error) = error.as_database_error() {
        tracing::debug!("Database error: {}", db_error);
        tracing::info!("Add/Update error: {:?}", db_error.code());
        if let Some(application_error) = db_error.code().as_deref().and_then(map_sql_state) {
            return application_error;
        }
        tracing::error!("Unhandled database error: {}", db_error);
        return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
    }
    tracing::error!("Failed to execute database operation: {}", error);
    ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
}

/**
 * Maps the Postgres SQLSTATEs caused by client input to application errors.
 */
fn map_sql_state(code: &str) -> Option<ApplicationError> {
    match code {
        // Unique violation
        "23505" => Some(ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string())),
        // Foreign key violation
        "23503" => Some(ApplicationError::new(ErrorType::ConstraintViolation, "Missing parent value".to_string())),
        "23514" => Some(ApplicationError::new(ErrorType::Validation, "Value violates a check constraint".to_string())),
        "22001" => Some(ApplicationError::new(ErrorType::Validation, "Value too long".to_string())),
        "22003" => Some(ApplicationError::new(ErrorType::Validation, "Numeric value out of range".to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_handle_non_database_error() {
        let error = handle_database_error(&sqlx::Error::RowNotFound);
        assert_eq!(error.error_type, ErrorType::DatabaseError);
        assert_eq!(error.message, "Failed to execute database operation");
    }

    #[test]
    fn test_map_sql_state() {
        assert_eq!(map_sql_state("23505").unwrap().error_type, ErrorType::ConstraintViolation);
        assert_eq!(map_sql_state("23503").unwrap().error_type, ErrorType::ConstraintViolation);
        assert_eq!(map_sql_state("23514").unwrap().error_type, ErrorType::Validation);
        assert_eq!(map_sql_state("22001").unwrap().error_type, ErrorType::Validation);
        assert_eq!(map_sql_state("22003").unwrap().error_type, ErrorType::Validation);
        assert!(map_sql_state("40001").is_none());
    }
}
