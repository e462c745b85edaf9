//! # Request Models
//!
//! Structures for incoming requests to the payroll engine.
//! Each struct is the JSON body (or argument set) of one operation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{ComponentRates, StatutoryRates};

/// Request to create or replace a tenant's payroll configuration.
///
/// Omitted rates fall back to the built-in defaults; an omitted currency
/// falls back to the engine's default currency.
///
/// ## Example JSON
///
/// ```json
/// {
///     "pfEmployeePercent": "12",
///     "pfEmployerPercent": "12",
///     "professionalTax": "200",
///     "basicPercent": "50",
///     "currency": "INR"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfigurationRequest {
    pub pf_employee_percent: Option<Decimal>,
    pub pf_employer_percent: Option<Decimal>,
    pub professional_tax: Option<Decimal>,
    pub basic_percent: Option<Decimal>,
    pub hra_percent_of_basic: Option<Decimal>,
    pub standard_allowance_percent: Option<Decimal>,
    pub performance_bonus_percent: Option<Decimal>,
    pub lta_percent: Option<Decimal>,
    pub currency: Option<String>,
}

impl CreateConfigurationRequest {
    pub fn statutory_rates(&self) -> StatutoryRates {
        let defaults = StatutoryRates::default();
        StatutoryRates {
            pf_employee_percent: self.pf_employee_percent.unwrap_or(defaults.pf_employee_percent),
            pf_employer_percent: self.pf_employer_percent.unwrap_or(defaults.pf_employer_percent),
            professional_tax: self.professional_tax.unwrap_or(defaults.professional_tax),
        }
    }

    pub fn component_rates(&self) -> ComponentRates {
        let defaults = ComponentRates::default();
        ComponentRates {
            basic_percent: self.basic_percent.unwrap_or(defaults.basic_percent),
            hra_percent_of_basic: self.hra_percent_of_basic.unwrap_or(defaults.hra_percent_of_basic),
            standard_allowance_percent: self
                .standard_allowance_percent
                .unwrap_or(defaults.standard_allowance_percent),
            performance_bonus_percent: self
                .performance_bonus_percent
                .unwrap_or(defaults.performance_bonus_percent),
            lta_percent: self.lta_percent.unwrap_or(defaults.lta_percent),
        }
    }
}

/// Request to give an employee a new salary structure.
///
/// ## Example JSON
///
/// ```json
/// {
///     "employeeId": "550e8400-e29b-41d4-a716-446655440000",
///     "monthlyWage": "40000",
///     "effectiveFrom": "2025-04-01"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalaryStructureRequest {
    pub employee_id: Uuid,
    pub monthly_wage: Decimal,

    /// `YYYY-MM-DD`. Today when omitted.
    pub effective_from: Option<String>,
}

/// Query parameters for listing payruns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPayrunsQuery {
    /// 1-based page number (default: 1).
    pub page: Option<u32>,

    /// Page size, 1 to 100 (default: 10).
    pub limit: Option<u32>,
}
