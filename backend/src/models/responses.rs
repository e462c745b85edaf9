//! # Response Models
//!
//! Structures for outgoing results of the payroll engine.
//! All results are wrapped in a standard envelope.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{PayMonth, Payrun};

/// Standard response wrapper.
///
/// ## Success Response
///
/// ```json
/// {
///     "success": true,
///     "data": { ... },
///     "error": null
/// }
/// ```
///
/// ## Error Response
///
/// ```json
/// {
///     "success": false,
///     "data": null,
///     "error": {
///         "code": "COMPONENTS_EXCEED_WAGE",
///         "message": "Components exceed wage: allocated 43333.20, wage 40000"
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded.
    pub success: bool,

    /// Result data (null on error).
    pub data: Option<T>,

    /// Error information (null on success).
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// Error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Error code (e.g., "NOT_FOUND").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// Payrun list with pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrunListResponse {
    /// Payruns on this page, newest first.
    pub payruns: Vec<Payrun>,

    /// Total payruns for the tenant.
    pub total: i64,

    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

/// One payrun summary written by reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveredPayrun {
    pub payrun_id: Uuid,
    pub tenant_id: Uuid,
    pub month: PayMonth,
    pub record_count: i32,
    pub total_payroll: Decimal,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    /// Orphaned payroll records found.
    pub orphan_records: usize,

    /// Summaries written.
    pub recovered: Vec<RecoveredPayrun>,

    /// Batches whose recovered summary could not be written.
    pub failed: Vec<Uuid>,
}
