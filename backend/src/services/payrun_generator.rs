//! # Payrun Generator
//!
//! Executes one payrun: a payroll record per eligible employee, then one
//! summary row for the batch.
//!
//! ## Generation Flow
//!
//! ```text
//! 1. Load tenant configuration (defaults when absent)
//!               ↓
//! 2. Load roster (active, no super admins)      ── fails → abort, no payrun
//!               ↓
//! 3. For each employee, one at a time:
//!    a. Active structure?            no → skip, missing_structure_count++
//!    b. Deductions on basic amount  fails → log, failed_count++
//!    c. Bank account / manager warnings
//!    d. Write payroll (processed)    fails → log, failed_count++
//!    e. processed_count++, total_payroll += net pay
//!               ↓
//! 4. Write payrun summary (generated)           ── fails → abort
//! ```
//!
//! A failed summary write leaves the step 3 records behind without a
//! payrun. The reconciler picks those up later.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::{
    EmployeeSnapshot, PayMonth, Payroll, PayrollConfiguration, PayrollRepository, PayrollStatus,
    Payrun, PayrunStatus, SalaryStructure,
};
use crate::services::deductions::{compute_deductions, net_pay};
use crate::services::errors::PayrollError;
use crate::utils::format_amount;

/// Running aggregates for one batch.
#[derive(Debug, Default)]
struct BatchTally {
    processed: i32,
    missing_structure: i32,
    failed: i32,
    total_payroll: Decimal,
    missing_bank: i32,
    missing_manager: i32,
}

impl BatchTally {
    fn record(&mut self, payroll: &Payroll) {
        self.processed += 1;
        self.total_payroll += payroll.net_pay;
        if !payroll.has_bank_account {
            self.missing_bank += 1;
        }
        if !payroll.has_manager {
            self.missing_manager += 1;
        }
    }
}

/// Builds the payroll record for one employee from their active structure.
fn build_payroll(
    employee: &EmployeeSnapshot,
    structure: &SalaryStructure,
    config: Option<&PayrollConfiguration>,
    payrun_id: Uuid,
    month: PayMonth,
    initiated_by: Uuid,
    now: DateTime<Utc>,
) -> Result<Payroll, PayrollError> {
    let c = &structure.breakdown.components;
    let gross = structure.breakdown.total_earnings;
    let deductions =
        compute_deductions(structure.basic_amount(), config.map(|cfg| &cfg.statutory))?;

    Ok(Payroll {
        id: Uuid::new_v4(),
        tenant_id: employee.tenant_id,
        employee_id: employee.id,
        payrun_id,
        month,
        basic_salary: c.basic_salary.amount,
        house_rent_allowance: c.house_rent_allowance.amount,
        standard_allowance: c.standard_allowance.amount,
        performance_bonus: c.performance_bonus.amount,
        leave_travel_allowance: c.leave_travel_allowance.amount,
        fixed_allowance: c.fixed_allowance.amount,
        gross_salary: gross,
        pf_employee: deductions.pf_employee,
        pf_employer: deductions.pf_employer,
        professional_tax: deductions.professional_tax,
        total_deductions: deductions.withheld(),
        net_pay: net_pay(gross, &deductions),
        has_bank_account: employee.has_bank_account(),
        has_manager: employee.has_manager(),
        working_days: 0,
        present_days: 0,
        leave_days: 0,
        absent_days: 0,
        status: PayrollStatus::Processed,
        generated_by: initiated_by,
        generated_at: now,
        paid_at: None,
        created_at: now,
        updated_at: now,
    })
}

/// Runs payrun batches against a store.
#[derive(Clone)]
pub struct PayrunGenerator {
    store: Arc<dyn PayrollRepository>,

    /// Currency used in log lines when the tenant has no configuration.
    default_currency: String,
}

impl PayrunGenerator {
    pub fn new(store: Arc<dyn PayrollRepository>, default_currency: impl Into<String>) -> Self {
        Self {
            store,
            default_currency: default_currency.into(),
        }
    }

    /// Generate the payrun for `tenant_id` and `month`.
    ///
    /// Employees are processed sequentially. A missing structure or a
    /// failed record write only affects that employee; a failed roster
    /// load or summary write aborts the run with `PersistenceFailure`.
    pub async fn generate(
        &self,
        tenant_id: Uuid,
        month: PayMonth,
        initiated_by: Uuid,
    ) -> Result<Payrun, PayrollError> {
        info!("Generating payrun for tenant {} month {}", tenant_id, month);

        let config = self.store.get_configuration(tenant_id).await.map_err(|e| {
            error!("Failed to load configuration for tenant {}: {}", tenant_id, e);
            PayrollError::PersistenceFailure(e.to_string())
        })?;
        if config.is_none() {
            debug!("Tenant {} has no configuration; using defaults", tenant_id);
        }

        let roster = self.store.list_active_employees(tenant_id).await.map_err(|e| {
            error!("Failed to load roster for tenant {}: {}", tenant_id, e);
            PayrollError::PersistenceFailure(e.to_string())
        })?;

        let payrun_id = Uuid::new_v4();
        let now = Utc::now();
        let mut tally = BatchTally::default();

        for employee in &roster {
            let structure = match self.store.get_active_structure(employee.id).await {
                Ok(Some(structure)) => structure,
                Ok(None) => {
                    warn!(
                        "Employee {} has no active salary structure; skipping",
                        employee.id
                    );
                    tally.missing_structure += 1;
                    continue;
                }
                Err(e) => {
                    error!("Failed to load structure for employee {}: {}", employee.id, e);
                    tally.failed += 1;
                    continue;
                }
            };

            let payroll = match build_payroll(
                employee,
                &structure,
                config.as_ref(),
                payrun_id,
                month,
                initiated_by,
                now,
            ) {
                Ok(payroll) => payroll,
                Err(e) => {
                    error!("Failed to compute payroll for employee {}: {}", employee.id, e);
                    tally.failed += 1;
                    continue;
                }
            };

            match self.store.insert_payroll(&payroll).await {
                Ok(()) => {
                    debug!(
                        "Payroll {} written for employee {} (net {})",
                        payroll.id, employee.id, payroll.net_pay
                    );
                    tally.record(&payroll);
                }
                Err(e) => {
                    error!("Failed to write payroll for employee {}: {}", employee.id, e);
                    tally.failed += 1;
                }
            }
        }

        let payrun = Payrun {
            id: payrun_id,
            tenant_id,
            month,
            period_start: month.first_day(),
            period_end: month.last_day(),
            total_employees: roster.len() as i32,
            processed_count: tally.processed,
            missing_structure_count: tally.missing_structure,
            failed_count: tally.failed,
            total_payroll: tally.total_payroll,
            missing_bank_count: tally.missing_bank,
            missing_manager_count: tally.missing_manager,
            status: PayrunStatus::Generated,
            generated_by: initiated_by,
            generated_at: now,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_payrun(&payrun).await.map_err(|e| {
            error!(
                "Failed to write payrun {} ({} payroll records left without a summary): {}",
                payrun_id, tally.processed, e
            );
            PayrollError::PersistenceFailure(e.to_string())
        })?;

        let currency = config
            .as_ref()
            .map(|c| c.currency.as_str())
            .unwrap_or(&self.default_currency);
        info!(
            "Payrun {} generated: {}/{} processed, {} missing structure, {} failed, total {}",
            payrun.id,
            payrun.processed_count,
            payrun.total_employees,
            payrun.missing_structure_count,
            payrun.failed_count,
            format_amount(payrun.total_payroll, currency)
        );

        Ok(payrun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        ComponentRates, ConfigurationStore, EmployeeRole, EmployeeStatus, MemoryStore,
        PayrollStore, SalaryStructureStore, StatutoryRates,
    };
    use crate::services::salary_calculator::compute_structure;
    use rust_decimal_macros::dec;

    fn employee(tenant_id: Uuid, name: &str, bank: bool, manager: bool) -> EmployeeSnapshot {
        EmployeeSnapshot {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            status: EmployeeStatus::Active,
            role: EmployeeRole::Employee,
            bank_account_number: bank.then(|| "001122334455".to_string()),
            manager_id: manager.then(Uuid::new_v4),
        }
    }

    async fn give_structure(store: &MemoryStore, employee: &EmployeeSnapshot, wage: Decimal) {
        let breakdown = compute_structure(wage, None, "INR").unwrap();
        let now = Utc::now();
        let structure = SalaryStructure {
            id: Uuid::new_v4(),
            employee_id: employee.id,
            tenant_id: employee.tenant_id,
            effective_from: now.date_naive(),
            breakdown,
            total_deductions: dec!(0),
            net_pay: wage,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        store.replace_active(&structure).await.unwrap();
    }

    fn month() -> PayMonth {
        "2025-03".parse().unwrap()
    }

    #[tokio::test]
    async fn test_skips_employee_without_structure() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();

        let a = employee(tenant_id, "Asha", true, true);
        let b = employee(tenant_id, "Bilal", false, true);
        let c = employee(tenant_id, "Chen", true, false);
        for e in [&a, &b, &c] {
            store.add_employee(e.clone()).await;
        }
        give_structure(&store, &a, dec!(40000)).await;
        give_structure(&store, &b, dec!(30000)).await;

        let generator = PayrunGenerator::new(Arc::new(store.clone()), "INR");
        let payrun = generator.generate(tenant_id, month(), Uuid::nil()).await.unwrap();

        assert_eq!(payrun.total_employees, 3);
        assert_eq!(payrun.processed_count, 2);
        assert_eq!(payrun.missing_structure_count, 1);
        assert_eq!(payrun.failed_count, 0);
        assert_eq!(payrun.status, PayrunStatus::Generated);

        // 40000 -> 37880; 30000 -> basic 12000, PF 1440 + 200 -> 28360
        assert_eq!(payrun.total_payroll, dec!(66240));
        // Only processed employees are counted; Chen has no manager but was skipped.
        assert_eq!(payrun.missing_bank_count, 1);
        assert_eq!(payrun.missing_manager_count, 0);

        let records = store.payrolls_for_payrun(payrun.id).await.unwrap();
        assert_eq!(records.len(), 2);
        let sum: Decimal = records.iter().map(|p| p.net_pay).sum();
        assert_eq!(sum, payrun.total_payroll);
        assert!(records.iter().all(|p| p.status == PayrollStatus::Processed));
        assert_eq!(payrun.period_start.to_string(), "2025-03-01");
        assert_eq!(payrun.period_end.to_string(), "2025-03-31");
    }

    #[tokio::test]
    async fn test_excludes_inactive_and_super_admin() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();

        let active = employee(tenant_id, "Asha", true, true);
        let mut inactive = employee(tenant_id, "Dev", true, true);
        inactive.status = EmployeeStatus::Inactive;
        let mut root = employee(tenant_id, "Root", true, true);
        root.role = EmployeeRole::SuperAdmin;
        let other_tenant = employee(Uuid::new_v4(), "Eve", true, true);

        for e in [&active, &inactive, &root, &other_tenant] {
            store.add_employee(e.clone()).await;
            give_structure(&store, e, dec!(20000)).await;
        }

        let generator = PayrunGenerator::new(Arc::new(store), "INR");
        let payrun = generator.generate(tenant_id, month(), Uuid::nil()).await.unwrap();

        assert_eq!(payrun.total_employees, 1);
        assert_eq!(payrun.processed_count, 1);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_batch() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();

        let a = employee(tenant_id, "Asha", true, true);
        let b = employee(tenant_id, "Bilal", true, true);
        for e in [&a, &b] {
            store.add_employee(e.clone()).await;
            give_structure(&store, e, dec!(40000)).await;
        }
        store.fail_payroll_insert_for(a.id).await;

        let generator = PayrunGenerator::new(Arc::new(store.clone()), "INR");
        let payrun = generator.generate(tenant_id, month(), Uuid::nil()).await.unwrap();

        assert_eq!(payrun.total_employees, 2);
        assert_eq!(payrun.processed_count, 1);
        assert_eq!(payrun.failed_count, 1);
        assert_eq!(payrun.total_payroll, dec!(37880));
        assert_eq!(
            payrun.total_employees,
            payrun.processed_count + payrun.missing_structure_count + payrun.failed_count
        );
    }

    #[tokio::test]
    async fn test_roster_failure_is_fatal() {
        let store = MemoryStore::new();
        store.fail_roster().await;

        let generator = PayrunGenerator::new(Arc::new(store.clone()), "INR");
        let err = generator
            .generate(Uuid::new_v4(), month(), Uuid::nil())
            .await
            .unwrap_err();

        assert!(matches!(err, PayrollError::PersistenceFailure(_)));
        assert_eq!(store.payroll_count().await, 0);
    }

    #[tokio::test]
    async fn test_payrun_write_failure_leaves_records() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();
        let a = employee(tenant_id, "Asha", true, true);
        store.add_employee(a.clone()).await;
        give_structure(&store, &a, dec!(40000)).await;
        store.fail_payrun_insert().await;

        let generator = PayrunGenerator::new(Arc::new(store.clone()), "INR");
        let err = generator
            .generate(tenant_id, month(), Uuid::nil())
            .await
            .unwrap_err();

        assert!(matches!(err, PayrollError::PersistenceFailure(_)));
        assert_eq!(store.payroll_count().await, 1);
        let (payruns, total) = store.list_payruns(tenant_id, 10, 0).await.unwrap();
        assert!(payruns.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_empty_roster_writes_empty_payrun() {
        let store = MemoryStore::new();
        let generator = PayrunGenerator::new(Arc::new(store), "INR");
        let payrun = generator
            .generate(Uuid::new_v4(), month(), Uuid::nil())
            .await
            .unwrap();

        assert_eq!(payrun.total_employees, 0);
        assert_eq!(payrun.total_payroll, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_overflowing_deduction_counts_as_failed() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();
        let a = employee(tenant_id, "Asha", true, true);
        store.add_employee(a.clone()).await;
        give_structure(&store, &a, dec!(40000)).await;

        let now = Utc::now();
        store
            .upsert_configuration(&PayrollConfiguration {
                id: Uuid::new_v4(),
                tenant_id,
                statutory: StatutoryRates {
                    pf_employee_percent: Decimal::MAX,
                    pf_employer_percent: dec!(12),
                    professional_tax: dec!(200),
                },
                components: ComponentRates::default(),
                currency: "INR".to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let generator = PayrunGenerator::new(Arc::new(store.clone()), "INR");
        let payrun = generator.generate(tenant_id, month(), Uuid::nil()).await.unwrap();

        assert_eq!(payrun.failed_count, 1);
        assert_eq!(payrun.processed_count, 0);
        assert_eq!(payrun.total_payroll, Decimal::ZERO);
        assert_eq!(store.payroll_count().await, 0);
    }
}
