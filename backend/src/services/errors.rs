//! # Payroll Errors
//!
//! The error taxonomy every payroll operation reports through.
//!
//! | Variant | Raised when | Code |
//! |---------|-------------|------|
//! | `InvalidInput` | Bad wage, month, date, rate or pagination | `INVALID_INPUT` |
//! | `ComponentsExceedWage` | Percentages leave a negative residual | `COMPONENTS_EXCEED_WAGE` |
//! | `NotFound` | Addressed record does not exist | `NOT_FOUND` |
//! | `PersistenceFailure` | A store read or write failed | `PERSISTENCE_FAILURE` |
//! | `Timeout` | A payrun ran past its bound | `TIMEOUT` |
//! | `DuplicatePayrun` | Month already has a payrun (guard enabled) | `DUPLICATE_PAYRUN` |

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::db::{DatabaseError, PayMonth};

/// Errors returned by the payroll engine.
#[derive(Error, Debug)]
pub enum PayrollError {
    /// Input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Component percentages allocate more than the wage.
    #[error("Components exceed wage: allocated {allocated}, wage {wage}")]
    ComponentsExceedWage { allocated: Decimal, wage: Decimal },

    /// Addressed record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store read or write failed.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Payrun generation exceeded its time bound.
    #[error("Payrun timed out after {0:?}")]
    Timeout(Duration),

    /// The tenant already has a payrun for this month.
    #[error("A payrun already exists for {0}")]
    DuplicatePayrun(PayMonth),
}

impl PayrollError {
    /// Stable machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            PayrollError::InvalidInput(_) => "INVALID_INPUT",
            PayrollError::ComponentsExceedWage { .. } => "COMPONENTS_EXCEED_WAGE",
            PayrollError::NotFound(_) => "NOT_FOUND",
            PayrollError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            PayrollError::Timeout(_) => "TIMEOUT",
            PayrollError::DuplicatePayrun(_) => "DUPLICATE_PAYRUN",
        }
    }
}

impl From<DatabaseError> for PayrollError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => PayrollError::NotFound(what),
            other => PayrollError::PersistenceFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: PayrollError = DatabaseError::NotFound("Payroll not found: x".to_string()).into();
        assert!(matches!(err, PayrollError::NotFound(_)));
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_other_store_errors_are_persistence_failures() {
        let err: PayrollError = DatabaseError::Unavailable("down".to_string()).into();
        assert!(matches!(err, PayrollError::PersistenceFailure(ref m) if m.contains("down")));
    }
}
