//! # Payroll Service
//!
//! The entry point for every payroll operation. Validates input, loads
//! tenant configuration, calls the calculators and the payrun generator,
//! and maps store errors into [`PayrollError`].
//!
//! ## Operations
//!
//! | Operation | Result |
//! |-----------|--------|
//! | `create_configuration` | Upserted tenant configuration |
//! | `get_configuration` | Tenant configuration or `NotFound` |
//! | `create_salary_structure` | New active structure (old one deactivated) |
//! | `get_salary_structure` | Active structure or `NotFound` |
//! | `salary_history` | All structure versions, newest first |
//! | `create_payrun` | Generated payrun summary |
//! | `list_payruns` | A page of payruns, newest first |
//! | `complete_run` | Payrun advanced one status step |
//! | `get_employee_payroll` | Latest payroll for an employee and month |
//! | `mark_as_paid` | Payroll in `paid` with a payment time |
//! | `reconcile_orphans` | Report of recovered payrun summaries |

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::db::{
    PayMonth, Payroll, PayrollConfiguration, PayrollRepository, PayrollStatus, Payrun,
    PayrunStatus, SalaryStructure,
};
use crate::models::{
    CreateConfigurationRequest, CreateSalaryStructureRequest, ListPayrunsQuery,
    PayrunListResponse, ReconciliationReport,
};
use crate::services::deductions::{compute_deductions, net_pay};
use crate::services::errors::PayrollError;
use crate::services::payrun_generator::PayrunGenerator;
use crate::services::reconciler::OrphanReconciler;
use crate::services::salary_calculator::compute_structure;
use crate::utils::{page_window, parse_date, DEFAULT_PAGE_LIMIT, MAX_MONEY, MAX_PERCENT};

fn parse_month(month: &str) -> Result<PayMonth, PayrollError> {
    month.parse().map_err(PayrollError::InvalidInput)
}

fn validate_currency(currency: &str) -> Result<(), PayrollError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(PayrollError::InvalidInput(format!(
            "Currency must be a 3-letter ISO code, got '{}'",
            currency
        )))
    }
}

/// The payroll engine.
///
/// ## Usage
///
/// ```rust,ignore
/// let store: Arc<dyn PayrollRepository> = Arc::new(MemoryStore::new());
/// let service = PayrollService::new(store, EngineSettings::default());
///
/// let payrun = service.create_payrun(tenant_id, "2025-03", admin_id).await?;
/// ```
#[derive(Clone)]
pub struct PayrollService {
    store: Arc<dyn PayrollRepository>,
    generator: PayrunGenerator,
    settings: EngineSettings,
}

impl PayrollService {
    pub fn new(store: Arc<dyn PayrollRepository>, settings: EngineSettings) -> Self {
        let generator = PayrunGenerator::new(store.clone(), settings.default_currency.clone());
        Self {
            store,
            generator,
            settings,
        }
    }

    // ============================================
    // CONFIGURATION
    // ============================================

    /// Create or replace the tenant's payroll configuration.
    ///
    /// Every rate must be non-negative and fit its column. Omitted values
    /// take the defaults.
    pub async fn create_configuration(
        &self,
        tenant_id: Uuid,
        request: &CreateConfigurationRequest,
    ) -> Result<PayrollConfiguration, PayrollError> {
        let now = Utc::now();
        let currency = request
            .currency
            .clone()
            .unwrap_or_else(|| self.settings.default_currency.clone());
        validate_currency(&currency)?;

        let config = PayrollConfiguration {
            id: Uuid::new_v4(),
            tenant_id,
            statutory: request.statutory_rates(),
            components: request.component_rates(),
            currency,
            created_at: now,
            updated_at: now,
        };

        for (name, value) in config.rates() {
            let limit = if name == "professionalTax" { MAX_MONEY } else { MAX_PERCENT };
            if value < Decimal::ZERO || value > limit {
                return Err(PayrollError::InvalidInput(format!(
                    "{} must be between 0 and {} (got {})",
                    name, limit, value
                )));
            }
        }

        let stored = self.store.upsert_configuration(&config).await?;
        info!("Payroll configuration {} saved for tenant {}", stored.id, tenant_id);
        Ok(stored)
    }

    pub async fn get_configuration(
        &self,
        tenant_id: Uuid,
    ) -> Result<PayrollConfiguration, PayrollError> {
        self.store
            .get_configuration(tenant_id)
            .await?
            .ok_or_else(|| {
                PayrollError::NotFound(format!("No payroll configuration for tenant {}", tenant_id))
            })
    }

    // ============================================
    // SALARY STRUCTURES
    // ============================================

    /// Compute and store a new active structure for an employee.
    ///
    /// The previous active structure, if any, is deactivated in the same
    /// store operation. Nothing is stored when the calculator rejects the
    /// wage.
    pub async fn create_salary_structure(
        &self,
        tenant_id: Uuid,
        request: &CreateSalaryStructureRequest,
    ) -> Result<SalaryStructure, PayrollError> {
        let effective_from = match request.effective_from.as_deref() {
            Some(date) => parse_date(date).map_err(PayrollError::InvalidInput)?,
            None => Utc::now().date_naive(),
        };

        let config = self.store.get_configuration(tenant_id).await?;
        let currency = config
            .as_ref()
            .map(|c| c.currency.clone())
            .unwrap_or_else(|| self.settings.default_currency.clone());

        let breakdown = compute_structure(
            request.monthly_wage,
            config.as_ref().map(|c| &c.components),
            &currency,
        )?;
        let deductions = compute_deductions(
            breakdown.components.basic_salary.amount,
            config.as_ref().map(|c| &c.statutory),
        )?;

        let now = Utc::now();
        let structure = SalaryStructure {
            id: Uuid::new_v4(),
            employee_id: request.employee_id,
            tenant_id,
            effective_from,
            total_deductions: deductions.withheld(),
            net_pay: net_pay(breakdown.total_earnings, &deductions),
            breakdown,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.store.replace_active(&structure).await?;
        info!(
            "Salary structure {} active for employee {} from {}",
            structure.id, structure.employee_id, structure.effective_from
        );
        Ok(structure)
    }

    pub async fn get_salary_structure(
        &self,
        employee_id: Uuid,
    ) -> Result<SalaryStructure, PayrollError> {
        self.store
            .get_active_structure(employee_id)
            .await?
            .ok_or_else(|| {
                PayrollError::NotFound(format!(
                    "No active salary structure for employee {}",
                    employee_id
                ))
            })
    }

    pub async fn salary_history(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<SalaryStructure>, PayrollError> {
        Ok(self.store.structure_history(employee_id).await?)
    }

    // ============================================
    // PAYRUNS
    // ============================================

    /// Run payroll for `month` (`YYYY-MM`).
    ///
    /// Bounded by the configured payrun timeout. On timeout, records
    /// already written stay in place without a payrun.
    pub async fn create_payrun(
        &self,
        tenant_id: Uuid,
        month: &str,
        initiated_by: Uuid,
    ) -> Result<Payrun, PayrollError> {
        let month = parse_month(month)?;

        if self.settings.enforce_unique_month {
            let existing = self.store.payruns_for_month(tenant_id, month).await?;
            if existing.iter().any(|p| p.status != PayrunStatus::Draft) {
                warn!("Tenant {} already has a payrun for {}", tenant_id, month);
                return Err(PayrollError::DuplicatePayrun(month));
            }
        }

        let bound = self.settings.payrun_timeout;
        timeout(bound, self.generator.generate(tenant_id, month, initiated_by))
            .await
            .map_err(|_| {
                warn!("Payrun for tenant {} month {} timed out after {:?}", tenant_id, month, bound);
                PayrollError::Timeout(bound)
            })?
    }

    pub async fn list_payruns(
        &self,
        tenant_id: Uuid,
        query: &ListPayrunsQuery,
    ) -> Result<PayrunListResponse, PayrollError> {
        let (limit, offset) =
            page_window(query.page, query.limit).map_err(PayrollError::InvalidInput)?;
        let (payruns, total) = self.store.list_payruns(tenant_id, limit, offset).await?;

        Ok(PayrunListResponse {
            payruns,
            total,
            page: query.page.unwrap_or(1),
            limit: query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            total_pages: (total + limit - 1) / limit,
        })
    }

    /// Advance a payrun one status step.
    ///
    /// - `draft` becomes `generated`
    /// - `generated` becomes `completed` once every payroll in it is paid
    /// - `completed` is final
    pub async fn complete_run(&self, payrun_id: Uuid) -> Result<Payrun, PayrollError> {
        let mut payrun = self
            .store
            .get_payrun(payrun_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("Payrun not found: {}", payrun_id)))?;

        let next = match payrun.status {
            PayrunStatus::Draft => PayrunStatus::Generated,
            PayrunStatus::Generated => {
                let payrolls = self.store.payrolls_for_payrun(payrun_id).await?;
                let unpaid = payrolls
                    .iter()
                    .filter(|p| p.status != PayrollStatus::Paid)
                    .count();
                if unpaid > 0 {
                    return Err(PayrollError::InvalidInput(format!(
                        "Payrun {} has {} unpaid payroll records",
                        payrun_id, unpaid
                    )));
                }
                PayrunStatus::Completed
            }
            PayrunStatus::Completed => {
                return Err(PayrollError::InvalidInput(format!(
                    "Payrun {} is already completed",
                    payrun_id
                )));
            }
        };

        let now = Utc::now();
        self.store.update_payrun_status(payrun_id, next, now).await?;
        info!("Payrun {} moved from {} to {}", payrun_id, payrun.status.as_str(), next.as_str());

        payrun.status = next;
        payrun.updated_at = now;
        Ok(payrun)
    }

    // ============================================
    // PAYROLL RECORDS
    // ============================================

    /// The most recent payroll for an employee in `month` (`YYYY-MM`).
    pub async fn get_employee_payroll(
        &self,
        employee_id: Uuid,
        month: &str,
    ) -> Result<Payroll, PayrollError> {
        let month = parse_month(month)?;
        self.store
            .get_employee_payroll(employee_id, month)
            .await?
            .ok_or_else(|| {
                PayrollError::NotFound(format!(
                    "No payroll for employee {} in {}",
                    employee_id, month
                ))
            })
    }

    /// Mark a payroll as paid now. Calling again re-stamps the payment time.
    pub async fn mark_as_paid(&self, payroll_id: Uuid) -> Result<Payroll, PayrollError> {
        let payroll = self.store.mark_paid(payroll_id, Utc::now()).await?;
        info!("Payroll {} marked as paid", payroll_id);
        Ok(payroll)
    }

    // ============================================
    // RECONCILIATION
    // ============================================

    pub fn reconciler(&self) -> OrphanReconciler {
        OrphanReconciler::new(self.store.clone(), self.settings.orphan_grace)
    }

    pub async fn reconcile_orphans(&self) -> Result<ReconciliationReport, PayrollError> {
        self.reconciler().reconcile_once().await
    }
}
