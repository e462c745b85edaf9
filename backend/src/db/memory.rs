//! # In-Memory Store
//!
//! [`MemoryStore`] implements every store trait over plain collections
//! guarded by one `tokio::sync::RwLock`. It backs embedded use of the
//! engine and the test-suite.
//!
//! Salary structures live in an append-only arena. A per-employee index
//! points at the active version, so a replacement is one index update
//! under the write lock:
//!
//! ```text
//! structures: [ v1(emp A) | v1(emp B) | v2(emp A) | ... ]
//!                              ▲            ▲
//! active:     { B ─────────────┘   A ───────┘ }
//! ```

use std::collections::HashMap;
#[cfg(test)]
use std::collections::HashSet;
use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::models::*;
use super::store::*;
use super::DatabaseError;

/// Injected failures for exercising the engine's error paths.
#[cfg(test)]
#[derive(Debug, Default)]
struct Faults {
    payroll_insert_for: HashSet<Uuid>,
    payrun_insert: bool,
    roster: bool,
    roster_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    employees: Vec<EmployeeSnapshot>,
    configurations: HashMap<Uuid, PayrollConfiguration>,

    /// Every structure version ever written.
    structures: Vec<SalaryStructure>,
    /// Employee id -> arena slot of the active version.
    active_structure: HashMap<Uuid, usize>,

    payrolls: Vec<Payroll>,
    payruns: Vec<Payrun>,

    #[cfg(test)]
    faults: Faults,
}

impl Inner {
    fn push_structure(&mut self, structure: &SalaryStructure) {
        let slot = self.structures.len();
        self.structures.push(structure.clone());
        if structure.is_active {
            if let Some(previous) = self.active_structure.insert(structure.employee_id, slot) {
                self.structures[previous].is_active = false;
                self.structures[previous].updated_at = structure.created_at;
            }
        }
    }
}

/// Store backed by process memory. Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an employee on the roster.
    pub async fn add_employee(&self, employee: EmployeeSnapshot) {
        let mut inner = self.inner.write().await;
        inner.employees.retain(|e| e.id != employee.id);
        inner.employees.push(employee);
    }

    #[cfg(test)]
    pub(crate) async fn fail_payroll_insert_for(&self, employee_id: Uuid) {
        self.inner.write().await.faults.payroll_insert_for.insert(employee_id);
    }

    #[cfg(test)]
    pub(crate) async fn fail_payrun_insert(&self) {
        self.inner.write().await.faults.payrun_insert = true;
    }

    #[cfg(test)]
    pub(crate) async fn fail_roster(&self) {
        self.inner.write().await.faults.roster = true;
    }

    #[cfg(test)]
    pub(crate) async fn delay_roster(&self, delay: Duration) {
        self.inner.write().await.faults.roster_delay = Some(delay);
    }

    #[cfg(test)]
    pub(crate) async fn clear_faults(&self) {
        self.inner.write().await.faults = Faults::default();
    }

    #[cfg(test)]
    pub(crate) async fn payroll_count(&self) -> usize {
        self.inner.read().await.payrolls.len()
    }
}

#[async_trait]
impl EmployeeRoster for MemoryStore {
    async fn list_active_employees(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<EmployeeSnapshot>, DatabaseError> {
        #[cfg(test)]
        {
            let (fail, delay) = {
                let inner = self.inner.read().await;
                (inner.faults.roster, inner.faults.roster_delay)
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(DatabaseError::Unavailable("roster offline".to_string()));
            }
        }

        let inner = self.inner.read().await;
        Ok(inner
            .employees
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.is_payable())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SalaryStructureStore for MemoryStore {
    async fn get_active_structure(
        &self,
        employee_id: Uuid,
    ) -> Result<Option<SalaryStructure>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .active_structure
            .get(&employee_id)
            .map(|&slot| inner.structures[slot].clone()))
    }

    async fn deactivate_active(&self, employee_id: Uuid) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner.active_structure.remove(&employee_id) {
            inner.structures[slot].is_active = false;
            inner.structures[slot].updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_structure(&self, structure: &SalaryStructure) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        if structure.is_active && inner.active_structure.contains_key(&structure.employee_id) {
            return Err(DatabaseError::Unavailable(format!(
                "Employee {} already has an active structure",
                structure.employee_id
            )));
        }
        inner.push_structure(structure);
        Ok(())
    }

    async fn replace_active(&self, structure: &SalaryStructure) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.push_structure(structure);
        debug!("Structure {} active for employee {}", structure.id, structure.employee_id);
        Ok(())
    }

    async fn structure_history(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<SalaryStructure>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .structures
            .iter()
            .rev()
            .filter(|s| s.employee_id == employee_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConfigurationStore for MemoryStore {
    async fn get_configuration(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<PayrollConfiguration>, DatabaseError> {
        Ok(self.inner.read().await.configurations.get(&tenant_id).cloned())
    }

    async fn upsert_configuration(
        &self,
        config: &PayrollConfiguration,
    ) -> Result<PayrollConfiguration, DatabaseError> {
        let mut inner = self.inner.write().await;
        let mut stored = config.clone();
        if let Some(existing) = inner.configurations.get(&config.tenant_id) {
            stored.id = existing.id;
            stored.created_at = existing.created_at;
        }
        inner.configurations.insert(config.tenant_id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn insert_payroll(&self, payroll: &Payroll) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;

        #[cfg(test)]
        {
            if inner.faults.payroll_insert_for.contains(&payroll.employee_id) {
                return Err(DatabaseError::Unavailable(format!(
                    "payroll write rejected for {}",
                    payroll.employee_id
                )));
            }
        }

        inner.payrolls.push(payroll.clone());
        Ok(())
    }

    async fn insert_payrun(&self, payrun: &Payrun) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;

        #[cfg(test)]
        {
            if inner.faults.payrun_insert {
                return Err(DatabaseError::Unavailable("payrun write rejected".to_string()));
            }
        }

        inner.payruns.push(payrun.clone());
        Ok(())
    }

    async fn mark_paid(
        &self,
        payroll_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Payroll, DatabaseError> {
        let mut inner = self.inner.write().await;
        let payroll = inner
            .payrolls
            .iter_mut()
            .find(|p| p.id == payroll_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Payroll not found: {}", payroll_id)))?;

        payroll.status = PayrollStatus::Paid;
        payroll.paid_at = Some(paid_at);
        payroll.updated_at = paid_at;
        Ok(payroll.clone())
    }

    async fn list_payruns(
        &self,
        tenant_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payrun>, i64), DatabaseError> {
        let inner = self.inner.read().await;
        let mut payruns: Vec<&Payrun> = inner
            .payruns
            .iter()
            .filter(|p| p.tenant_id == tenant_id)
            .collect();
        payruns.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = payruns.len() as i64;
        let page = payruns
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_payrun(&self, payrun_id: Uuid) -> Result<Option<Payrun>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.payruns.iter().find(|p| p.id == payrun_id).cloned())
    }

    async fn payruns_for_month(
        &self,
        tenant_id: Uuid,
        month: PayMonth,
    ) -> Result<Vec<Payrun>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .payruns
            .iter()
            .filter(|p| p.tenant_id == tenant_id && p.month == month)
            .cloned()
            .collect())
    }

    async fn update_payrun_status(
        &self,
        payrun_id: Uuid,
        status: PayrunStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let payrun = inner
            .payruns
            .iter_mut()
            .find(|p| p.id == payrun_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Payrun not found: {}", payrun_id)))?;

        payrun.status = status;
        payrun.updated_at = updated_at;
        Ok(())
    }

    async fn get_employee_payroll(
        &self,
        employee_id: Uuid,
        month: PayMonth,
    ) -> Result<Option<Payroll>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .payrolls
            .iter()
            .filter(|p| p.employee_id == employee_id && p.month == month)
            .max_by_key(|p| p.generated_at)
            .cloned())
    }

    async fn payrolls_for_payrun(&self, payrun_id: Uuid) -> Result<Vec<Payroll>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .payrolls
            .iter()
            .filter(|p| p.payrun_id == payrun_id)
            .cloned()
            .collect())
    }

    async fn find_orphan_payrolls(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Payroll>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut orphans: Vec<Payroll> = inner
            .payrolls
            .iter()
            .filter(|p| p.created_at < created_before)
            .filter(|p| !inner.payruns.iter().any(|r| r.id == p.payrun_id))
            .cloned()
            .collect();
        orphans.sort_by(|a, b| (a.payrun_id, a.created_at).cmp(&(b.payrun_id, b.created_at)));
        Ok(orphans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use rust_decimal_macros::dec;

    fn component(name: &str, amount: rust_decimal::Decimal) -> SalaryComponent {
        SalaryComponent {
            name: name.to_string(),
            kind: ComponentKind::Fixed,
            value: amount,
            amount,
        }
    }

    fn structure(employee_id: Uuid, wage: rust_decimal::Decimal) -> SalaryStructure {
        let now = Utc::now();
        SalaryStructure {
            id: Uuid::new_v4(),
            employee_id,
            tenant_id: Uuid::nil(),
            effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            breakdown: SalaryBreakdown {
                monthly_wage: wage,
                yearly_wage: wage * dec!(12),
                wage_type: WageType::Fixed,
                currency: "INR".to_string(),
                components: SalaryComponents {
                    basic_salary: component("Basic Salary", wage),
                    house_rent_allowance: component("House Rent Allowance", dec!(0)),
                    standard_allowance: component("Standard Allowance", dec!(0)),
                    performance_bonus: component("Performance Bonus", dec!(0)),
                    leave_travel_allowance: component("Leave Travel Allowance", dec!(0)),
                    fixed_allowance: component("Fixed Allowance", dec!(0)),
                },
                total_earnings: wage,
            },
            total_deductions: dec!(0),
            net_pay: wage,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn payroll(payrun_id: Uuid, created_at: DateTime<Utc>) -> Payroll {
        Payroll {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            employee_id: Uuid::new_v4(),
            payrun_id,
            month: "2025-03".parse().unwrap(),
            basic_salary: dec!(0),
            house_rent_allowance: dec!(0),
            standard_allowance: dec!(0),
            performance_bonus: dec!(0),
            leave_travel_allowance: dec!(0),
            fixed_allowance: dec!(0),
            gross_salary: dec!(1000),
            pf_employee: dec!(0),
            pf_employer: dec!(0),
            professional_tax: dec!(0),
            total_deductions: dec!(0),
            net_pay: dec!(1000),
            has_bank_account: true,
            has_manager: true,
            working_days: 0,
            present_days: 0,
            leave_days: 0,
            absent_days: 0,
            status: PayrollStatus::Processed,
            generated_by: Uuid::nil(),
            generated_at: created_at,
            paid_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_replace_keeps_one_active() {
        let store = MemoryStore::new();
        let employee_id = Uuid::new_v4();

        for wage in [dec!(30000), dec!(35000), dec!(40000)] {
            store.replace_active(&structure(employee_id, wage)).await.unwrap();
        }

        let history = store.structure_history(employee_id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().filter(|s| s.is_active).count(), 1);

        let active = store.get_active_structure(employee_id).await.unwrap().unwrap();
        assert_eq!(active.breakdown.monthly_wage, dec!(40000));
        assert_eq!(history[0].id, active.id);
    }

    #[tokio::test]
    async fn test_plain_insert_refuses_second_active() {
        let store = MemoryStore::new();
        let employee_id = Uuid::new_v4();

        store.insert_structure(&structure(employee_id, dec!(1000))).await.unwrap();
        assert!(store.insert_structure(&structure(employee_id, dec!(2000))).await.is_err());

        store.deactivate_active(employee_id).await.unwrap();
        assert!(store.get_active_structure(employee_id).await.unwrap().is_none());
        store.insert_structure(&structure(employee_id, dec!(2000))).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_keeps_identity() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();
        let now = Utc::now();
        let first = PayrollConfiguration {
            id: Uuid::new_v4(),
            tenant_id,
            statutory: StatutoryRates::default(),
            components: ComponentRates::default(),
            currency: "INR".to_string(),
            created_at: now,
            updated_at: now,
        };
        let stored = store.upsert_configuration(&first).await.unwrap();
        assert_eq!(stored.id, first.id);

        let mut second = first.clone();
        second.id = Uuid::new_v4();
        second.statutory.professional_tax = dec!(250);
        second.created_at = now + ChronoDuration::seconds(5);
        let stored = store.upsert_configuration(&second).await.unwrap();

        assert_eq!(stored.id, first.id);
        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(stored.statutory.professional_tax, dec!(250));
    }

    #[tokio::test]
    async fn test_mark_paid_unknown() {
        let store = MemoryStore::new();
        let err = store.mark_paid(Uuid::new_v4(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_orphans_respect_cutoff() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old = now - ChronoDuration::minutes(10);

        let orphan_run = Uuid::new_v4();
        store.insert_payroll(&payroll(orphan_run, old)).await.unwrap();
        // Too recent to count.
        store.insert_payroll(&payroll(Uuid::new_v4(), now)).await.unwrap();

        let orphans = store
            .find_orphan_payrolls(now - ChronoDuration::minutes(2))
            .await
            .unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].payrun_id, orphan_run);
    }
}
