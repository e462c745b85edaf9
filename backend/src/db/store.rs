//! # Store Traits
//!
//! The read/write contracts the payroll engine relies on. The engine never
//! sees SQL; it sees these traits.
//!
//! | Trait | Owner of |
//! |-------|----------|
//! | [`EmployeeRoster`] | Active employee snapshots (read-only) |
//! | [`SalaryStructureStore`] | Versioned structures, one active per employee |
//! | [`ConfigurationStore`] | One payroll configuration per tenant |
//! | [`PayrollStore`] | Payroll records and payrun summaries |
//!
//! [`PayrollRepository`] bundles all four so services can hold a single
//! `Arc<dyn PayrollRepository>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::*;
use super::DatabaseError;

/// Source of the employee roster.
#[async_trait]
pub trait EmployeeRoster: Send + Sync {
    /// Active employees of a tenant, super admins excluded.
    async fn list_active_employees(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<EmployeeSnapshot>, DatabaseError>;
}

/// Versioned salary structures.
#[async_trait]
pub trait SalaryStructureStore: Send + Sync {
    /// The employee's active structure, if any.
    async fn get_active_structure(
        &self,
        employee_id: Uuid,
    ) -> Result<Option<SalaryStructure>, DatabaseError>;

    /// Mark the employee's active structure inactive. No-op when none is active.
    async fn deactivate_active(&self, employee_id: Uuid) -> Result<(), DatabaseError>;

    /// Insert a structure row as given.
    async fn insert_structure(&self, structure: &SalaryStructure) -> Result<(), DatabaseError>;

    /// Make `structure` the employee's only active structure.
    ///
    /// The default performs two separate writes; a crash in between leaves
    /// the employee with no active structure. Backends override this with
    /// an atomic swap.
    async fn replace_active(&self, structure: &SalaryStructure) -> Result<(), DatabaseError> {
        self.deactivate_active(structure.employee_id).await?;
        self.insert_structure(structure).await
    }

    /// Every version for an employee, newest first.
    async fn structure_history(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<SalaryStructure>, DatabaseError>;
}

/// Per-tenant payroll configuration.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn get_configuration(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<PayrollConfiguration>, DatabaseError>;

    /// Insert or replace the tenant's configuration.
    ///
    /// On replace, the stored `id` and `created_at` are kept. Returns the
    /// row as stored.
    async fn upsert_configuration(
        &self,
        config: &PayrollConfiguration,
    ) -> Result<PayrollConfiguration, DatabaseError>;
}

/// Payroll records and payrun summaries.
#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn insert_payroll(&self, payroll: &Payroll) -> Result<(), DatabaseError>;

    async fn insert_payrun(&self, payrun: &Payrun) -> Result<(), DatabaseError>;

    /// Set status `paid` and the payment time. Returns the updated record,
    /// or `DatabaseError::NotFound`.
    async fn mark_paid(
        &self,
        payroll_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Payroll, DatabaseError>;

    /// A page of the tenant's payruns, newest first, plus the total count.
    async fn list_payruns(
        &self,
        tenant_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payrun>, i64), DatabaseError>;

    async fn get_payrun(&self, payrun_id: Uuid) -> Result<Option<Payrun>, DatabaseError>;

    /// Payruns of a tenant for one month, in any status.
    async fn payruns_for_month(
        &self,
        tenant_id: Uuid,
        month: PayMonth,
    ) -> Result<Vec<Payrun>, DatabaseError>;

    /// Move a payrun to `status`. Returns `DatabaseError::NotFound` for an
    /// unknown id.
    async fn update_payrun_status(
        &self,
        payrun_id: Uuid,
        status: PayrunStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// The most recently generated payroll for an employee and month.
    async fn get_employee_payroll(
        &self,
        employee_id: Uuid,
        month: PayMonth,
    ) -> Result<Option<Payroll>, DatabaseError>;

    async fn payrolls_for_payrun(&self, payrun_id: Uuid) -> Result<Vec<Payroll>, DatabaseError>;

    /// Payrolls created before `created_before` whose payrun summary was
    /// never written.
    async fn find_orphan_payrolls(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Payroll>, DatabaseError>;
}

/// Everything the payroll engine needs from storage.
pub trait PayrollRepository:
    EmployeeRoster + SalaryStructureStore + ConfigurationStore + PayrollStore
{
}

impl<T> PayrollRepository for T where
    T: EmployeeRoster + SalaryStructureStore + ConfigurationStore + PayrollStore
{
}
