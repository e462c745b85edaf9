//! # Database Queries
//!
//! This module contains all the SQL for the PostgreSQL store and the
//! [`PgStore`] implementation of the store traits.
//!
//! ## Query Organization
//!
//! Queries are grouped by the table they operate on:
//! - roster - `employees` (read-only)
//! - configuration - `payroll_configurations`
//! - structure - `salary_structures`
//! - payroll / payrun - `payrolls`, `payruns`
//!
//! ## Error Handling
//!
//! All queries return `Result<T, DatabaseError>`. Common errors:
//! - `NotFound` - Addressed record doesn't exist
//! - `QueryError` - SQL execution failed
//! - `DecodeError` - A stored status or month string is not recognised

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Object;
use tokio_postgres::types::Json;
use tokio_postgres::{GenericClient, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::models::*;
use super::store::*;
use super::{Database, DatabaseError};

macro_rules! employee_columns {
    () => {
        "id, tenant_id, name, status, role, bank_account_number, manager_id"
    };
}

macro_rules! configuration_columns {
    () => {
        "id, tenant_id, pf_employee_percent, pf_employer_percent, professional_tax, \
         basic_percent, hra_percent_of_basic, standard_allowance_percent, \
         performance_bonus_percent, lta_percent, currency, created_at, updated_at"
    };
}

macro_rules! structure_columns {
    () => {
        "id, employee_id, tenant_id, effective_from, monthly_wage, yearly_wage, \
         wage_type, currency, components, total_earnings, total_deductions, net_pay, \
         is_active, created_at, updated_at"
    };
}

macro_rules! payroll_columns {
    () => {
        "id, tenant_id, employee_id, payrun_id, month, basic_salary, \
         house_rent_allowance, standard_allowance, performance_bonus, \
         leave_travel_allowance, fixed_allowance, gross_salary, pf_employee, \
         pf_employer, professional_tax, total_deductions, net_pay, has_bank_account, \
         has_manager, working_days, present_days, leave_days, absent_days, status, \
         generated_by, generated_at, paid_at, created_at, updated_at"
    };
}

macro_rules! payrun_columns {
    () => {
        "id, tenant_id, month, period_start, period_end, total_employees, \
         processed_count, missing_structure_count, failed_count, total_payroll, \
         missing_bank_count, missing_manager_count, status, generated_by, \
         generated_at, created_at, updated_at"
    };
}

// ============================================
// HELPER FUNCTIONS
// ============================================

fn decode<T>(value: String) -> Result<T, DatabaseError>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(DatabaseError::DecodeError)
}

fn row_to_employee(row: &Row) -> Result<EmployeeSnapshot, DatabaseError> {
    Ok(EmployeeSnapshot {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        name: row.try_get("name")?,
        status: decode(row.try_get("status")?)?,
        role: decode(row.try_get("role")?)?,
        bank_account_number: row.try_get("bank_account_number")?,
        manager_id: row.try_get("manager_id")?,
    })
}

fn row_to_configuration(row: &Row) -> Result<PayrollConfiguration, DatabaseError> {
    Ok(PayrollConfiguration {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        statutory: StatutoryRates {
            pf_employee_percent: row.try_get("pf_employee_percent")?,
            pf_employer_percent: row.try_get("pf_employer_percent")?,
            professional_tax: row.try_get("professional_tax")?,
        },
        components: ComponentRates {
            basic_percent: row.try_get("basic_percent")?,
            hra_percent_of_basic: row.try_get("hra_percent_of_basic")?,
            standard_allowance_percent: row.try_get("standard_allowance_percent")?,
            performance_bonus_percent: row.try_get("performance_bonus_percent")?,
            lta_percent: row.try_get("lta_percent")?,
        },
        currency: row.try_get("currency")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_structure(row: &Row) -> Result<SalaryStructure, DatabaseError> {
    let Json(components): Json<SalaryComponents> = row.try_get("components")?;

    Ok(SalaryStructure {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        tenant_id: row.try_get("tenant_id")?,
        effective_from: row.try_get("effective_from")?,
        breakdown: SalaryBreakdown {
            monthly_wage: row.try_get("monthly_wage")?,
            yearly_wage: row.try_get("yearly_wage")?,
            wage_type: decode(row.try_get("wage_type")?)?,
            currency: row.try_get("currency")?,
            components,
            total_earnings: row.try_get("total_earnings")?,
        },
        total_deductions: row.try_get("total_deductions")?,
        net_pay: row.try_get("net_pay")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_payroll(row: &Row) -> Result<Payroll, DatabaseError> {
    Ok(Payroll {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        employee_id: row.try_get("employee_id")?,
        payrun_id: row.try_get("payrun_id")?,
        month: decode(row.try_get("month")?)?,
        basic_salary: row.try_get("basic_salary")?,
        house_rent_allowance: row.try_get("house_rent_allowance")?,
        standard_allowance: row.try_get("standard_allowance")?,
        performance_bonus: row.try_get("performance_bonus")?,
        leave_travel_allowance: row.try_get("leave_travel_allowance")?,
        fixed_allowance: row.try_get("fixed_allowance")?,
        gross_salary: row.try_get("gross_salary")?,
        pf_employee: row.try_get("pf_employee")?,
        pf_employer: row.try_get("pf_employer")?,
        professional_tax: row.try_get("professional_tax")?,
        total_deductions: row.try_get("total_deductions")?,
        net_pay: row.try_get("net_pay")?,
        has_bank_account: row.try_get("has_bank_account")?,
        has_manager: row.try_get("has_manager")?,
        working_days: row.try_get("working_days")?,
        present_days: row.try_get("present_days")?,
        leave_days: row.try_get("leave_days")?,
        absent_days: row.try_get("absent_days")?,
        status: decode(row.try_get("status")?)?,
        generated_by: row.try_get("generated_by")?,
        generated_at: row.try_get("generated_at")?,
        paid_at: row.try_get("paid_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_payrun(row: &Row) -> Result<Payrun, DatabaseError> {
    Ok(Payrun {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        month: decode(row.try_get("month")?)?,
        period_start: row.try_get("period_start")?,
        period_end: row.try_get("period_end")?,
        total_employees: row.try_get("total_employees")?,
        processed_count: row.try_get("processed_count")?,
        missing_structure_count: row.try_get("missing_structure_count")?,
        failed_count: row.try_get("failed_count")?,
        total_payroll: row.try_get("total_payroll")?,
        missing_bank_count: row.try_get("missing_bank_count")?,
        missing_manager_count: row.try_get("missing_manager_count")?,
        status: decode(row.try_get("status")?)?,
        generated_by: row.try_get("generated_by")?,
        generated_at: row.try_get("generated_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn collect<T>(
    rows: Vec<Row>,
    convert: fn(&Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    rows.iter().map(convert).collect()
}

async fn insert_structure_row<C: GenericClient + Sync>(
    client: &C,
    structure: &SalaryStructure,
) -> Result<(), DatabaseError> {
    let breakdown = &structure.breakdown;
    client
        .execute(
            concat!(
                "INSERT INTO salary_structures (",
                structure_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
            ),
            &[
                &structure.id,
                &structure.employee_id,
                &structure.tenant_id,
                &structure.effective_from,
                &breakdown.monthly_wage,
                &breakdown.yearly_wage,
                &breakdown.wage_type.as_str(),
                &breakdown.currency,
                &Json(&breakdown.components),
                &breakdown.total_earnings,
                &structure.total_deductions,
                &structure.net_pay,
                &structure.is_active,
                &structure.created_at,
                &structure.updated_at,
            ],
        )
        .await?;
    Ok(())
}

// ============================================
// POSTGRES STORE
// ============================================

/// PostgreSQL implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn client(&self) -> Result<Object, DatabaseError> {
        self.db
            .pool()
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))
    }
}

// ============================================
// ROSTER QUERIES
// ============================================

#[async_trait]
impl EmployeeRoster for PgStore {
    async fn list_active_employees(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<EmployeeSnapshot>, DatabaseError> {
        debug!("Fetching active roster for tenant: {}", tenant_id);

        let client = self.client().await?;
        let rows = client
            .query(
                concat!(
                    "SELECT ",
                    employee_columns!(),
                    " FROM employees \
                     WHERE tenant_id = $1 AND status = $2 AND role <> $3 \
                     ORDER BY name"
                ),
                &[
                    &tenant_id,
                    &EmployeeStatus::Active.as_str(),
                    &EmployeeRole::SuperAdmin.as_str(),
                ],
            )
            .await?;

        collect(rows, row_to_employee)
    }
}

// ============================================
// STRUCTURE QUERIES
// ============================================

#[async_trait]
impl SalaryStructureStore for PgStore {
    async fn get_active_structure(
        &self,
        employee_id: Uuid,
    ) -> Result<Option<SalaryStructure>, DatabaseError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                concat!(
                    "SELECT ",
                    structure_columns!(),
                    " FROM salary_structures WHERE employee_id = $1 AND is_active"
                ),
                &[&employee_id],
            )
            .await?;

        row.as_ref().map(row_to_structure).transpose()
    }

    async fn deactivate_active(&self, employee_id: Uuid) -> Result<(), DatabaseError> {
        let client = self.client().await?;
        client
            .execute(
                "UPDATE salary_structures SET is_active = FALSE, updated_at = NOW() \
                 WHERE employee_id = $1 AND is_active",
                &[&employee_id],
            )
            .await?;
        Ok(())
    }

    async fn insert_structure(&self, structure: &SalaryStructure) -> Result<(), DatabaseError> {
        let client = self.client().await?;
        insert_structure_row(&**client, structure).await
    }

    async fn replace_active(&self, structure: &SalaryStructure) -> Result<(), DatabaseError> {
        debug!("Replacing active structure for employee: {}", structure.employee_id);

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        tx.execute(
            "UPDATE salary_structures SET is_active = FALSE, updated_at = $2 \
             WHERE employee_id = $1 AND is_active",
            &[&structure.employee_id, &structure.created_at],
        )
        .await?;
        insert_structure_row(&*tx, structure).await?;
        tx.commit().await?;

        info!(
            "Structure {} is now active for employee {}",
            structure.id, structure.employee_id
        );
        Ok(())
    }

    async fn structure_history(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<SalaryStructure>, DatabaseError> {
        let client = self.client().await?;
        let rows = client
            .query(
                concat!(
                    "SELECT ",
                    structure_columns!(),
                    " FROM salary_structures WHERE employee_id = $1 ORDER BY created_at DESC"
                ),
                &[&employee_id],
            )
            .await?;

        collect(rows, row_to_structure)
    }
}

// ============================================
// CONFIGURATION QUERIES
// ============================================

#[async_trait]
impl ConfigurationStore for PgStore {
    async fn get_configuration(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<PayrollConfiguration>, DatabaseError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                concat!(
                    "SELECT ",
                    configuration_columns!(),
                    " FROM payroll_configurations WHERE tenant_id = $1"
                ),
                &[&tenant_id],
            )
            .await?;

        row.as_ref().map(row_to_configuration).transpose()
    }

    async fn upsert_configuration(
        &self,
        config: &PayrollConfiguration,
    ) -> Result<PayrollConfiguration, DatabaseError> {
        debug!("Upserting payroll configuration for tenant: {}", config.tenant_id);

        let client = self.client().await?;
        let row = client
            .query_one(
                concat!(
                    "INSERT INTO payroll_configurations (",
                    configuration_columns!(),
                    ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
                     ON CONFLICT (tenant_id) DO UPDATE SET \
                        pf_employee_percent = EXCLUDED.pf_employee_percent, \
                        pf_employer_percent = EXCLUDED.pf_employer_percent, \
                        professional_tax = EXCLUDED.professional_tax, \
                        basic_percent = EXCLUDED.basic_percent, \
                        hra_percent_of_basic = EXCLUDED.hra_percent_of_basic, \
                        standard_allowance_percent = EXCLUDED.standard_allowance_percent, \
                        performance_bonus_percent = EXCLUDED.performance_bonus_percent, \
                        lta_percent = EXCLUDED.lta_percent, \
                        currency = EXCLUDED.currency, \
                        updated_at = EXCLUDED.updated_at \
                     RETURNING ",
                    configuration_columns!()
                ),
                &[
                    &config.id,
                    &config.tenant_id,
                    &config.statutory.pf_employee_percent,
                    &config.statutory.pf_employer_percent,
                    &config.statutory.professional_tax,
                    &config.components.basic_percent,
                    &config.components.hra_percent_of_basic,
                    &config.components.standard_allowance_percent,
                    &config.components.performance_bonus_percent,
                    &config.components.lta_percent,
                    &config.currency,
                    &config.created_at,
                    &config.updated_at,
                ],
            )
            .await?;

        info!("Payroll configuration saved for tenant: {}", config.tenant_id);
        row_to_configuration(&row)
    }
}

// ============================================
// PAYROLL & PAYRUN QUERIES
// ============================================

#[async_trait]
impl PayrollStore for PgStore {
    async fn insert_payroll(&self, payroll: &Payroll) -> Result<(), DatabaseError> {
        let client = self.client().await?;
        client
            .execute(
                concat!(
                    "INSERT INTO payrolls (",
                    payroll_columns!(),
                    ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                     $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29)"
                ),
                &[
                    &payroll.id,
                    &payroll.tenant_id,
                    &payroll.employee_id,
                    &payroll.payrun_id,
                    &payroll.month.to_string(),
                    &payroll.basic_salary,
                    &payroll.house_rent_allowance,
                    &payroll.standard_allowance,
                    &payroll.performance_bonus,
                    &payroll.leave_travel_allowance,
                    &payroll.fixed_allowance,
                    &payroll.gross_salary,
                    &payroll.pf_employee,
                    &payroll.pf_employer,
                    &payroll.professional_tax,
                    &payroll.total_deductions,
                    &payroll.net_pay,
                    &payroll.has_bank_account,
                    &payroll.has_manager,
                    &payroll.working_days,
                    &payroll.present_days,
                    &payroll.leave_days,
                    &payroll.absent_days,
                    &payroll.status.as_str(),
                    &payroll.generated_by,
                    &payroll.generated_at,
                    &payroll.paid_at,
                    &payroll.created_at,
                    &payroll.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn insert_payrun(&self, payrun: &Payrun) -> Result<(), DatabaseError> {
        let client = self.client().await?;
        client
            .execute(
                concat!(
                    "INSERT INTO payruns (",
                    payrun_columns!(),
                    ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                     $15, $16, $17)"
                ),
                &[
                    &payrun.id,
                    &payrun.tenant_id,
                    &payrun.month.to_string(),
                    &payrun.period_start,
                    &payrun.period_end,
                    &payrun.total_employees,
                    &payrun.processed_count,
                    &payrun.missing_structure_count,
                    &payrun.failed_count,
                    &payrun.total_payroll,
                    &payrun.missing_bank_count,
                    &payrun.missing_manager_count,
                    &payrun.status.as_str(),
                    &payrun.generated_by,
                    &payrun.generated_at,
                    &payrun.created_at,
                    &payrun.updated_at,
                ],
            )
            .await?;

        info!("Payrun {} written for tenant {}", payrun.id, payrun.tenant_id);
        Ok(())
    }

    async fn mark_paid(
        &self,
        payroll_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Payroll, DatabaseError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                concat!(
                    "UPDATE payrolls SET status = 'paid', paid_at = $2, updated_at = $2 \
                     WHERE id = $1 RETURNING ",
                    payroll_columns!()
                ),
                &[&payroll_id, &paid_at],
            )
            .await?;

        match row {
            Some(row) => row_to_payroll(&row),
            None => Err(DatabaseError::NotFound(format!("Payroll not found: {}", payroll_id))),
        }
    }

    async fn list_payruns(
        &self,
        tenant_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payrun>, i64), DatabaseError> {
        debug!(
            "Fetching payruns for tenant {} (limit: {}, offset: {})",
            tenant_id, limit, offset
        );

        let client = self.client().await?;
        let rows = client
            .query(
                concat!(
                    "SELECT ",
                    payrun_columns!(),
                    " FROM payruns WHERE tenant_id = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ),
                &[&tenant_id, &limit, &offset],
            )
            .await?;
        let total: i64 = client
            .query_one(
                "SELECT COUNT(*) AS count FROM payruns WHERE tenant_id = $1",
                &[&tenant_id],
            )
            .await?
            .try_get("count")?;

        Ok((collect(rows, row_to_payrun)?, total))
    }

    async fn get_payrun(&self, payrun_id: Uuid) -> Result<Option<Payrun>, DatabaseError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                concat!("SELECT ", payrun_columns!(), " FROM payruns WHERE id = $1"),
                &[&payrun_id],
            )
            .await?;

        row.as_ref().map(row_to_payrun).transpose()
    }

    async fn payruns_for_month(
        &self,
        tenant_id: Uuid,
        month: PayMonth,
    ) -> Result<Vec<Payrun>, DatabaseError> {
        let client = self.client().await?;
        let rows = client
            .query(
                concat!(
                    "SELECT ",
                    payrun_columns!(),
                    " FROM payruns WHERE tenant_id = $1 AND month = $2 ORDER BY created_at DESC"
                ),
                &[&tenant_id, &month.to_string()],
            )
            .await?;

        collect(rows, row_to_payrun)
    }

    async fn update_payrun_status(
        &self,
        payrun_id: Uuid,
        status: PayrunStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let client = self.client().await?;
        let rows_affected = client
            .execute(
                "UPDATE payruns SET status = $2, updated_at = $3 WHERE id = $1",
                &[&payrun_id, &status.as_str(), &updated_at],
            )
            .await?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Payrun not found: {}", payrun_id)));
        }

        info!("Payrun {} moved to {}", payrun_id, status.as_str());
        Ok(())
    }

    async fn get_employee_payroll(
        &self,
        employee_id: Uuid,
        month: PayMonth,
    ) -> Result<Option<Payroll>, DatabaseError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                concat!(
                    "SELECT ",
                    payroll_columns!(),
                    " FROM payrolls WHERE employee_id = $1 AND month = $2 \
                     ORDER BY generated_at DESC LIMIT 1"
                ),
                &[&employee_id, &month.to_string()],
            )
            .await?;

        row.as_ref().map(row_to_payroll).transpose()
    }

    async fn payrolls_for_payrun(&self, payrun_id: Uuid) -> Result<Vec<Payroll>, DatabaseError> {
        let client = self.client().await?;
        let rows = client
            .query(
                concat!(
                    "SELECT ",
                    payroll_columns!(),
                    " FROM payrolls WHERE payrun_id = $1 ORDER BY created_at"
                ),
                &[&payrun_id],
            )
            .await?;

        collect(rows, row_to_payroll)
    }

    async fn find_orphan_payrolls(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Payroll>, DatabaseError> {
        let client = self.client().await?;
        let rows = client
            .query(
                concat!(
                    "SELECT ",
                    payroll_columns!(),
                    " FROM payrolls p \
                     WHERE p.created_at < $1 \
                       AND NOT EXISTS (SELECT 1 FROM payruns r WHERE r.id = p.payrun_id) \
                     ORDER BY p.payrun_id, p.created_at"
                ),
                &[&created_before],
            )
            .await?;

        collect(rows, row_to_payroll)
    }
}
