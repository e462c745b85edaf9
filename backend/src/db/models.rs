//! # Database Models
//!
//! This module defines the data structures that map to database tables.
//! Each struct represents a row in a table.
//!
//! ## Table Overview
//!
//! | Table | Description |
//! |-------|-------------|
//! | `employees` | Roster snapshot (owned by the HR subsystem, read-only here) |
//! | `payroll_configurations` | One row per tenant, upserted |
//! | `salary_structures` | Versioned structures, one active per employee |
//! | `payrolls` | One row per employee per payrun |
//! | `payruns` | One summary row per batch execution |
//!
//! ## Relationship Diagram
//!
//! ```text
//! ┌─────────────┐       ┌────────────────────┐
//! │  employees  │──────<│ salary_structures  │
//! │             │       │ employee_id (FK)   │
//! │ id (PK)     │       │ is_active          │
//! └─────────────┘       └────────────────────┘
//!        │
//!        │              ┌──────────────┐
//!        └─────────────<│   payrolls   │>──────┐
//!                       │ payrun_id    │       │
//!                       │ month        │       │
//!                       └──────────────┘       │
//!                                        ┌─────┴──────┐
//!                                        │  payruns   │
//!                                        │ id (PK)    │
//!                                        └────────────┘
//! ```
//!
//! ## Note on Money
//!
//! Every monetary field is a [`Decimal`] in the tenant's currency. Amounts
//! are serialized as strings so JSON clients never see float rounding.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================
// PAY MONTH
// ============================================

/// A calendar month in `YYYY-MM` form.
///
/// Parsing rejects anything that is not exactly four digits, a dash and
/// a month between `01` and `12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PayMonth {
    year: i32,
    month: u32,
}

impl PayMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, String> {
        if !(1..=12).contains(&month) {
            return Err(format!("Invalid month number: {}", month));
        }
        if !(1..=9999).contains(&year) {
            return Err(format!("Invalid year: {}", year));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of the month.
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }
}

impl FromStr for PayMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(format!("Invalid month '{}': expected YYYY-MM", s));
        }

        let year = s[..4]
            .parse()
            .map_err(|_| format!("Invalid month '{}': expected YYYY-MM", s))?;
        let month = s[5..]
            .parse()
            .map_err(|_| format!("Invalid month '{}': expected YYYY-MM", s))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for PayMonth {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PayMonth> for String {
    fn from(value: PayMonth) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PayMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ============================================
// EMPLOYEE ROSTER
// ============================================

/// Employment status as recorded by the HR subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Inactive,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for EmployeeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EmployeeStatus::Active),
            "inactive" => Ok(EmployeeStatus::Inactive),
            other => Err(format!("Unknown employee status: {}", other)),
        }
    }
}

/// Platform role. Super admins operate the platform and are never paid
/// through a tenant's payrun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    SuperAdmin,
    Admin,
    HrOfficer,
    PayrollOfficer,
    Employee,
}

impl EmployeeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeRole::SuperAdmin => "super_admin",
            EmployeeRole::Admin => "admin",
            EmployeeRole::HrOfficer => "hr_officer",
            EmployeeRole::PayrollOfficer => "payroll_officer",
            EmployeeRole::Employee => "employee",
        }
    }
}

impl FromStr for EmployeeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(EmployeeRole::SuperAdmin),
            "admin" => Ok(EmployeeRole::Admin),
            "hr_officer" => Ok(EmployeeRole::HrOfficer),
            "payroll_officer" => Ok(EmployeeRole::PayrollOfficer),
            "employee" => Ok(EmployeeRole::Employee),
            other => Err(format!("Unknown employee role: {}", other)),
        }
    }
}

/// The slice of an employee record the payrun needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSnapshot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub status: EmployeeStatus,
    pub role: EmployeeRole,

    /// Bank account number, if the employee has filed bank details.
    pub bank_account_number: Option<String>,

    /// Reporting manager, if assigned.
    pub manager_id: Option<Uuid>,
}

impl EmployeeSnapshot {
    pub fn has_bank_account(&self) -> bool {
        self.bank_account_number
            .as_deref()
            .map(|n| !n.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn has_manager(&self) -> bool {
        self.manager_id.is_some()
    }

    /// Whether this employee belongs on a payrun roster.
    pub fn is_payable(&self) -> bool {
        self.status == EmployeeStatus::Active && self.role != EmployeeRole::SuperAdmin
    }
}

// ============================================
// PAYROLL CONFIGURATION
// ============================================

/// Default allocation percentages for the salary breakdown.
///
/// All values are percentages of the monthly wage, except
/// `hra_percent_of_basic`, which applies to the computed basic amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRates {
    pub basic_percent: Decimal,
    pub hra_percent_of_basic: Decimal,
    pub standard_allowance_percent: Decimal,
    pub performance_bonus_percent: Decimal,
    pub lta_percent: Decimal,
}

impl Default for ComponentRates {
    fn default() -> Self {
        Self {
            basic_percent: dec!(40),
            hra_percent_of_basic: dec!(40),
            standard_allowance_percent: dec!(15),
            performance_bonus_percent: dec!(10),
            lta_percent: dec!(10),
        }
    }
}

/// Statutory deduction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatutoryRates {
    /// Employee provident-fund share, percent of basic.
    pub pf_employee_percent: Decimal,

    /// Employer provident-fund share, percent of basic. Informational only.
    pub pf_employer_percent: Decimal,

    /// Flat monthly professional tax.
    pub professional_tax: Decimal,
}

impl Default for StatutoryRates {
    fn default() -> Self {
        Self {
            pf_employee_percent: dec!(12),
            pf_employer_percent: dec!(12),
            professional_tax: dec!(200),
        }
    }
}

/// Per-tenant payroll settings. At most one per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollConfiguration {
    pub id: Uuid,
    pub tenant_id: Uuid,

    #[serde(flatten)]
    pub statutory: StatutoryRates,

    #[serde(flatten)]
    pub components: ComponentRates,

    /// ISO currency code for every amount computed for this tenant.
    pub currency: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayrollConfiguration {
    /// Every rate on the configuration, labelled, for validation.
    pub fn rates(&self) -> [(&'static str, Decimal); 8] {
        [
            ("pfEmployeePercent", self.statutory.pf_employee_percent),
            ("pfEmployerPercent", self.statutory.pf_employer_percent),
            ("professionalTax", self.statutory.professional_tax),
            ("basicPercent", self.components.basic_percent),
            ("hraPercentOfBasic", self.components.hra_percent_of_basic),
            ("standardAllowancePercent", self.components.standard_allowance_percent),
            ("performanceBonusPercent", self.components.performance_bonus_percent),
            ("ltaPercent", self.components.lta_percent),
        ]
    }
}

// ============================================
// SALARY STRUCTURE
// ============================================

/// How a component's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// `value` is a percentage.
    Percentage,
    /// `value` is a currency amount.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WageType {
    Fixed,
    Variable,
}

impl WageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WageType::Fixed => "fixed",
            WageType::Variable => "variable",
        }
    }
}

impl FromStr for WageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(WageType::Fixed),
            "variable" => Ok(WageType::Variable),
            other => Err(format!("Unknown wage type: {}", other)),
        }
    }
}

/// One line of a salary breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryComponent {
    pub name: String,
    pub kind: ComponentKind,

    /// Configured percentage, or the fixed amount.
    pub value: Decimal,

    /// Computed currency amount.
    pub amount: Decimal,
}

/// The six components of a structure, in payslip order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryComponents {
    pub basic_salary: SalaryComponent,
    pub house_rent_allowance: SalaryComponent,
    pub standard_allowance: SalaryComponent,
    pub performance_bonus: SalaryComponent,
    pub leave_travel_allowance: SalaryComponent,
    pub fixed_allowance: SalaryComponent,
}

impl SalaryComponents {
    pub fn iter(&self) -> impl Iterator<Item = &SalaryComponent> {
        [
            &self.basic_salary,
            &self.house_rent_allowance,
            &self.standard_allowance,
            &self.performance_bonus,
            &self.leave_travel_allowance,
            &self.fixed_allowance,
        ]
        .into_iter()
    }

    /// Sum of all six component amounts.
    pub fn total(&self) -> Decimal {
        self.iter().map(|c| c.amount).sum()
    }
}

/// What the salary calculator produces: a wage and its breakdown, not yet
/// bound to an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryBreakdown {
    pub monthly_wage: Decimal,
    pub yearly_wage: Decimal,
    pub wage_type: WageType,
    pub currency: String,
    pub components: SalaryComponents,

    /// Always equal to `monthly_wage`.
    pub total_earnings: Decimal,
}

/// A versioned salary structure.
///
/// Structures are never edited in place; a new version replaces the active
/// one and the old row keeps `is_active = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryStructure {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub tenant_id: Uuid,
    pub effective_from: NaiveDate,

    #[serde(flatten)]
    pub breakdown: SalaryBreakdown,

    /// Employee PF plus professional tax at creation time.
    pub total_deductions: Decimal,
    pub net_pay: Decimal,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SalaryStructure {
    /// Basic salary amount, the base for provident-fund deductions.
    pub fn basic_amount(&self) -> Decimal {
        self.breakdown.components.basic_salary.amount
    }
}

// ============================================
// PAYROLL
// ============================================

/// Payroll record status.
///
/// `Pending` exists for completeness; the generator always writes
/// `Processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayrollStatus {
    Pending,
    Processed,
    Paid,
}

impl PayrollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayrollStatus::Pending => "pending",
            PayrollStatus::Processed => "processed",
            PayrollStatus::Paid => "paid",
        }
    }
}

impl FromStr for PayrollStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PayrollStatus::Pending),
            "processed" => Ok(PayrollStatus::Processed),
            "paid" => Ok(PayrollStatus::Paid),
            other => Err(format!("Unknown payroll status: {}", other)),
        }
    }
}

/// One employee's pay for one month within one payrun.
///
/// Component amounts are copied from the structure at generation time, so
/// later structure changes never alter an issued payroll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payroll {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub employee_id: Uuid,
    pub payrun_id: Uuid,
    pub month: PayMonth,

    pub basic_salary: Decimal,
    pub house_rent_allowance: Decimal,
    pub standard_allowance: Decimal,
    pub performance_bonus: Decimal,
    pub leave_travel_allowance: Decimal,
    pub fixed_allowance: Decimal,

    pub gross_salary: Decimal,
    pub pf_employee: Decimal,
    pub pf_employer: Decimal,
    pub professional_tax: Decimal,
    pub total_deductions: Decimal,
    pub net_pay: Decimal,

    /// Data-quality warnings captured at generation time.
    pub has_bank_account: bool,
    pub has_manager: bool,

    /// Attendance counters. Filled by the attendance subsystem, zero here.
    pub working_days: i32,
    pub present_days: i32,
    pub leave_days: i32,
    pub absent_days: i32,

    pub status: PayrollStatus,
    pub generated_by: Uuid,
    pub generated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================
// PAYRUN
// ============================================

/// Payrun status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayrunStatus {
    /// Summary recovered by reconciliation, awaiting review.
    Draft,
    /// Written by the batch generator.
    Generated,
    /// Every payroll in the batch has been paid.
    Completed,
}

impl PayrunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayrunStatus::Draft => "draft",
            PayrunStatus::Generated => "generated",
            PayrunStatus::Completed => "completed",
        }
    }
}

impl FromStr for PayrunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PayrunStatus::Draft),
            "generated" => Ok(PayrunStatus::Generated),
            "completed" => Ok(PayrunStatus::Completed),
            other => Err(format!("Unknown payrun status: {}", other)),
        }
    }
}

/// Summary of one batch execution.
///
/// ## Invariants
///
/// - `total_employees == processed_count + missing_structure_count + failed_count`
/// - `total_payroll` is the sum of `net_pay` over the payrolls referencing it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payrun {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub month: PayMonth,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,

    /// Roster size considered.
    pub total_employees: i32,
    /// Payroll records actually written.
    pub processed_count: i32,
    /// Employees skipped for lack of an active structure.
    pub missing_structure_count: i32,
    /// Employees whose payroll write failed.
    pub failed_count: i32,

    pub total_payroll: Decimal,
    pub missing_bank_count: i32,
    pub missing_manager_count: i32,

    pub status: PayrunStatus,
    pub generated_by: Uuid,
    pub generated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pay_month_parse() {
        let month: PayMonth = "2025-02".parse().unwrap();
        assert_eq!(month.year(), 2025);
        assert_eq!(month.month(), 2);
        assert_eq!(month.to_string(), "2025-02");
    }

    #[test]
    fn test_employee_role_and_status_parse() {
        assert_eq!("hr_officer".parse::<EmployeeRole>().unwrap(), EmployeeRole::HrOfficer);
        assert_eq!(EmployeeRole::SuperAdmin.as_str(), "super_admin");
        assert_eq!("inactive".parse::<EmployeeStatus>().unwrap(), EmployeeStatus::Inactive);
        assert!("manager".parse::<EmployeeRole>().is_err());
        assert!("on_leave".parse::<EmployeeStatus>().is_err());
    }

    #[test]
    fn test_pay_month_rejects_malformed() {
        for bad in ["2025-13", "2025-00", "2025-1", "25-01", "2025/01", "", "2025-01-01", "abcd-ef"] {
            assert!(bad.parse::<PayMonth>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_pay_month_bounds() {
        let feb: PayMonth = "2024-02".parse().unwrap();
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let dec: PayMonth = "2025-12".parse().unwrap();
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn test_pay_month_serde_as_string() {
        let month: PayMonth = "2025-07".parse().unwrap();
        assert_eq!(serde_json::to_string(&month).unwrap(), "\"2025-07\"");
        assert!(serde_json::from_str::<PayMonth>("\"2025-7\"").is_err());
    }

    #[test]
    fn test_employee_warnings() {
        let mut employee = EmployeeSnapshot {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Asha".to_string(),
            status: EmployeeStatus::Active,
            role: EmployeeRole::Employee,
            bank_account_number: Some("   ".to_string()),
            manager_id: None,
        };
        assert!(!employee.has_bank_account());
        assert!(!employee.has_manager());

        employee.bank_account_number = Some("001122334455".to_string());
        employee.manager_id = Some(Uuid::new_v4());
        assert!(employee.has_bank_account());
        assert!(employee.has_manager());
    }

    #[test]
    fn test_super_admin_not_payable() {
        let employee = EmployeeSnapshot {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Root".to_string(),
            status: EmployeeStatus::Active,
            role: EmployeeRole::SuperAdmin,
            bank_account_number: None,
            manager_id: None,
        };
        assert!(!employee.is_payable());
    }

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!("paid".parse::<PayrollStatus>().unwrap(), PayrollStatus::Paid);
        assert_eq!(PayrunStatus::Generated.as_str(), "generated");
        assert!("archived".parse::<PayrunStatus>().is_err());
    }
}
