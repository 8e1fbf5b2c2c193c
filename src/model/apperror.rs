use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorType {
    Initialization,
    DatabaseError,
    NotFound,
    BadRequest,
    Validation,
    ConstraintViolation,
}

/**
 * A single failed constraint on an input field.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /**
     * Name of the field as it appears in the request.
     */
    pub field: String,
    /**
     * Human readable constraint message.
     */
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        FieldError { field: field.to_string(), message: message.to_string() }
    }
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
    /**
     * Field level failures. Only populated for validation errors.
     */
    pub field_errors: Vec<FieldError>,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message, field_errors: vec![] }
    }

    /**
     * Creates a validation error from a list of field errors.
     *
     * #Arguments
     * `field_errors`: The fields that failed validation.
     */
    pub fn validation(field_errors: Vec<FieldError>) -> Self {
        ApplicationError { error_type: ErrorType::Validation, message: "Validation failed".to_string(), field_errors }
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.field_errors.is_empty() {
            return write!(f, "{}", self.message);
        }
        let fields: Vec<String> = self.field_errors.iter().map(|field_error| format!("{}: {}", field_error.field, field_error.message)).collect();
        write!(f, "{} ({})", self.message, fields.join(", "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_plain() {
        let error = ApplicationError::new(ErrorType::NotFound, "Car not found".to_string());
        assert_eq!(error.to_string(), "Car not found");
    }

    #[test]
    fn test_display_validation() {
        let error = ApplicationError::validation(vec![FieldError::new("endDate", "must not be null"), FieldError::new("provider", "must not be blank")]);
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.to_string(), "Validation failed (endDate: must not be null, provider: must not be blank)");
    }
}
