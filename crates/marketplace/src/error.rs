//! Marketplace input errors.

use thiserror::Error;
use workflow::WorkflowError;

/// Reasons an input is rejected before any step runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required text field is missing or blank.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// The address is not a usable email.
    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),

    /// Currency codes are three ASCII letters.
    #[error("Invalid currency code: '{0}'")]
    InvalidCurrency(String),

    /// Amounts must not be negative.
    #[error("{field} must not be negative (got {amount})")]
    NegativeAmount { field: &'static str, amount: i64 },

    /// A time range ends before it starts.
    #[error("start must be before end")]
    InvalidDateRange,

    /// The password is too short to be accepted.
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    /// The password is longer than the hasher accepts.
    #[error("Password must be at most {max} bytes")]
    PasswordTooLong { max: usize },

    /// A string did not name a known variant.
    #[error("Unknown {kind}: '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    /// The target is in a state that does not allow the operation.
    #[error("{0}")]
    NotAllowed(String),
}

impl From<ValidationError> for WorkflowError {
    fn from(err: ValidationError) -> Self {
        WorkflowError::Validation(err.to_string())
    }
}

/// Fails with [`ValidationError::Required`] if `value` is blank.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Fails with [`ValidationError::NegativeAmount`] if `amount` is below zero.
pub(crate) fn non_negative(field: &'static str, amount: i64) -> Result<(), ValidationError> {
    if amount < 0 {
        return Err(ValidationError::NegativeAmount { field, amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use workflow::ErrorKind;

    use super::*;

    #[test]
    fn converts_to_a_validation_workflow_error() {
        let err: WorkflowError = ValidationError::Required { field: "title" }.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Validation failed: title is required");
    }

    #[test]
    fn require_rejects_blank_values() {
        assert!(require("title", "  ").is_err());
        assert!(require("title", "Maize").is_ok());
    }

    #[test]
    fn non_negative_accepts_zero() {
        assert!(non_negative("price", 0).is_ok());
        assert_eq!(
            non_negative("price", -5),
            Err(ValidationError::NegativeAmount {
                field: "price",
                amount: -5
            })
        );
    }
}
