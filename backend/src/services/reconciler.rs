//! # Orphan Reconciler
//!
//! Finds payroll records whose payrun summary was never written and writes
//! a recovered summary for each such batch.
//!
//! ## How Orphans Appear
//!
//! The generator writes every payroll record before the payrun row. If
//! the run times out or the final write fails, the records stay behind
//! and reference a payrun id that does not exist.
//!
//! ## Reconciliation Flow
//!
//! ```text
//! Every N seconds (or once):
//! 1. List payroll records older than the grace period with no payrun
//!               ↓
//! 2. Group them by payrun id
//!               ↓
//! 3. For each group, write a payrun with status `draft`:
//!    total_employees = processed_count = record count
//!    total_payroll = sum of net pay
//!    warning counts recomputed from the records
//! ```
//!
//! The grace period keeps the scan away from a batch that is still being
//! generated. Recovered payruns wait in `draft` until an operator promotes
//! them.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use tokio::time::interval;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::{Payroll, PayrollRepository, Payrun, PayrunStatus};
use crate::models::{ReconciliationReport, RecoveredPayrun};
use crate::services::errors::PayrollError;

/// Shortest interval the watch loop runs at.
pub const MIN_WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Builds the recovered summary for one orphaned batch.
///
/// `records` must be non-empty and share one payrun id.
fn recover_payrun(payrun_id: Uuid, records: &[Payroll]) -> Option<Payrun> {
    let first = records.first()?;
    let now = Utc::now();
    let count = records.len() as i32;

    Some(Payrun {
        id: payrun_id,
        tenant_id: first.tenant_id,
        month: first.month,
        period_start: first.month.first_day(),
        period_end: first.month.last_day(),
        total_employees: count,
        processed_count: count,
        missing_structure_count: 0,
        failed_count: 0,
        total_payroll: records.iter().map(|p| p.net_pay).sum::<Decimal>(),
        missing_bank_count: records.iter().filter(|p| !p.has_bank_account).count() as i32,
        missing_manager_count: records.iter().filter(|p| !p.has_manager).count() as i32,
        status: PayrunStatus::Draft,
        generated_by: first.generated_by,
        generated_at: records.iter().map(|p| p.generated_at).min().unwrap_or(now),
        created_at: now,
        updated_at: now,
    })
}

/// Restores payrun summaries for orphaned payroll records.
///
/// ## Usage
///
/// ```rust,ignore
/// let reconciler = OrphanReconciler::new(store, Duration::from_secs(120));
///
/// // One pass
/// let report = reconciler.reconcile_once().await?;
///
/// // Or keep scanning in the background
/// tokio::spawn(async move {
///     reconciler.start_watch_loop(Duration::from_secs(300)).await;
/// });
/// ```
#[derive(Clone)]
pub struct OrphanReconciler {
    store: Arc<dyn PayrollRepository>,

    /// Minimum record age before it counts as orphaned.
    grace: Duration,
}

impl OrphanReconciler {
    pub fn new(store: Arc<dyn PayrollRepository>, grace: Duration) -> Self {
        Self { store, grace }
    }

    /// Scan forever, one pass per `every` (at least [`MIN_WATCH_INTERVAL`]).
    pub async fn start_watch_loop(&self, every: Duration) {
        let every = if every < MIN_WATCH_INTERVAL {
            warn!(
                "Watch interval {:?} is below the minimum; using {:?}",
                every, MIN_WATCH_INTERVAL
            );
            MIN_WATCH_INTERVAL
        } else {
            every
        };
        info!(
            "Starting orphan reconciliation loop (interval: {}s)",
            every.as_secs()
        );

        let mut ticker = interval(every);

        loop {
            ticker.tick().await;

            match self.reconcile_once().await {
                Ok(report) if !report.recovered.is_empty() || !report.failed.is_empty() => {
                    info!(
                        "Reconciliation pass: {} recovered, {} failed",
                        report.recovered.len(),
                        report.failed.len()
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Reconciliation failed: {}", e),
            }
        }
    }

    /// Run one reconciliation pass.
    ///
    /// A failed summary write is reported in `failed` and does not stop
    /// the pass. Only a failed orphan scan is an error.
    pub async fn reconcile_once(&self) -> Result<ReconciliationReport, PayrollError> {
        let grace = ChronoDuration::from_std(self.grace).unwrap_or_else(|_| ChronoDuration::zero());
        let cutoff = Utc::now() - grace;

        let orphans = self.store.find_orphan_payrolls(cutoff).await.map_err(|e| {
            error!("Orphan scan failed: {}", e);
            PayrollError::PersistenceFailure(e.to_string())
        })?;

        let mut report = ReconciliationReport {
            orphan_records: orphans.len(),
            ..Default::default()
        };
        if orphans.is_empty() {
            return Ok(report);
        }

        let mut batches: BTreeMap<Uuid, Vec<Payroll>> = BTreeMap::new();
        for payroll in orphans {
            batches.entry(payroll.payrun_id).or_default().push(payroll);
        }

        for (payrun_id, records) in batches {
            let Some(payrun) = recover_payrun(payrun_id, &records) else {
                continue;
            };

            warn!(
                "Recovering payrun {} from {} orphaned payroll records",
                payrun_id,
                records.len()
            );

            match self.store.insert_payrun(&payrun).await {
                Ok(()) => report.recovered.push(RecoveredPayrun {
                    payrun_id,
                    tenant_id: payrun.tenant_id,
                    month: payrun.month,
                    record_count: payrun.processed_count,
                    total_payroll: payrun.total_payroll,
                }),
                Err(e) => {
                    error!("Failed to write recovered payrun {}: {}", payrun_id, e);
                    report.failed.push(payrun_id);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, PayMonth, PayrollStatus, PayrollStore};
    use rust_decimal_macros::dec;

    fn orphan(payrun_id: Uuid, tenant_id: Uuid, net: Decimal, bank: bool, age_secs: i64) -> Payroll {
        let at = Utc::now() - ChronoDuration::seconds(age_secs);
        Payroll {
            id: Uuid::new_v4(),
            tenant_id,
            employee_id: Uuid::new_v4(),
            payrun_id,
            month: "2025-05".parse::<PayMonth>().unwrap(),
            basic_salary: dec!(0),
            house_rent_allowance: dec!(0),
            standard_allowance: dec!(0),
            performance_bonus: dec!(0),
            leave_travel_allowance: dec!(0),
            fixed_allowance: net,
            gross_salary: net,
            pf_employee: dec!(0),
            pf_employer: dec!(0),
            professional_tax: dec!(0),
            total_deductions: dec!(0),
            net_pay: net,
            has_bank_account: bank,
            has_manager: true,
            working_days: 0,
            present_days: 0,
            leave_days: 0,
            absent_days: 0,
            status: PayrollStatus::Processed,
            generated_by: Uuid::nil(),
            generated_at: at,
            paid_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_recovers_orphaned_batch_as_draft() {
        let store = MemoryStore::new();
        let tenant_id = Uuid::new_v4();
        let payrun_id = Uuid::new_v4();

        store.insert_payroll(&orphan(payrun_id, tenant_id, dec!(37880), true, 600)).await.unwrap();
        store.insert_payroll(&orphan(payrun_id, tenant_id, dec!(28360), false, 600)).await.unwrap();

        let reconciler = OrphanReconciler::new(Arc::new(store.clone()), Duration::from_secs(120));
        let report = reconciler.reconcile_once().await.unwrap();

        assert_eq!(report.orphan_records, 2);
        assert_eq!(report.recovered.len(), 1);
        assert!(report.failed.is_empty());

        let payrun = store.get_payrun(payrun_id).await.unwrap().unwrap();
        assert_eq!(payrun.status, PayrunStatus::Draft);
        assert_eq!(payrun.total_employees, 2);
        assert_eq!(payrun.processed_count, 2);
        assert_eq!(payrun.total_payroll, dec!(66240));
        assert_eq!(payrun.missing_bank_count, 1);
        assert_eq!(payrun.missing_manager_count, 0);

        // Second pass finds nothing.
        let report = reconciler.reconcile_once().await.unwrap();
        assert_eq!(report.orphan_records, 0);
    }

    #[tokio::test]
    async fn test_grace_period_protects_running_batch() {
        let store = MemoryStore::new();
        store
            .insert_payroll(&orphan(Uuid::new_v4(), Uuid::new_v4(), dec!(1000), true, 5))
            .await
            .unwrap();

        let reconciler = OrphanReconciler::new(Arc::new(store), Duration::from_secs(120));
        let report = reconciler.reconcile_once().await.unwrap();

        assert_eq!(report.orphan_records, 0);
        assert!(report.recovered.is_empty());
    }

    #[tokio::test]
    async fn test_failed_summary_write_reported() {
        let store = MemoryStore::new();
        let payrun_id = Uuid::new_v4();
        store
            .insert_payroll(&orphan(payrun_id, Uuid::new_v4(), dec!(1000), true, 600))
            .await
            .unwrap();
        store.fail_payrun_insert().await;

        let reconciler = OrphanReconciler::new(Arc::new(store), Duration::from_secs(120));
        let report = reconciler.reconcile_once().await.unwrap();

        assert!(report.recovered.is_empty());
        assert_eq!(report.failed, vec![payrun_id]);
    }

    #[tokio::test]
    async fn test_watch_loop_survives_zero_interval() {
        let reconciler = OrphanReconciler::new(Arc::new(MemoryStore::new()), Duration::ZERO);
        let handle = tokio::spawn(async move {
            reconciler.start_watch_loop(Duration::ZERO).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        handle.abort();
    }
}
