//! # Admin CLI
//!
//! Command-line surface of the payroll engine. Every subcommand maps to
//! one [`PayrollService`] operation and prints the result wrapped in the
//! [`ApiResponse`] envelope.
//!
//! ```text
//! payroll-admin config    set | get
//! payroll-admin structure set | get | history
//! payroll-admin payrun    create | list | complete
//! payroll-admin payroll   get | mark-paid
//! payroll-admin reconcile [--watch]
//! ```

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::error;
use uuid::Uuid;

use crate::models::{
    ApiResponse, CreateConfigurationRequest, CreateSalaryStructureRequest, ListPayrunsQuery,
};
use crate::services::{PayrollError, PayrollService};
use crate::utils::parse_amount;

/// Payroll administration: configuration, salary structures, payruns.
#[derive(Parser, Debug)]
#[command(name = "payroll-admin", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tenant payroll configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Employee salary structures.
    #[command(subcommand)]
    Structure(StructureCommand),
    /// Monthly payrun batches.
    #[command(subcommand)]
    Payrun(PayrunCommand),
    /// Individual payroll records.
    #[command(subcommand)]
    Payroll(PayrollCommand),
    /// Restore payrun summaries for orphaned payroll records.
    Reconcile {
        /// Keep scanning on the configured interval.
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Create or replace a tenant's configuration.
    Set(ConfigSetArgs),
    /// Show a tenant's configuration.
    Get {
        #[arg(long)]
        tenant: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    #[arg(long)]
    pub tenant: Uuid,
    #[arg(long, value_parser = parse_amount)]
    pub pf_employee_percent: Option<Decimal>,
    #[arg(long, value_parser = parse_amount)]
    pub pf_employer_percent: Option<Decimal>,
    #[arg(long, value_parser = parse_amount)]
    pub professional_tax: Option<Decimal>,
    #[arg(long, value_parser = parse_amount)]
    pub basic_percent: Option<Decimal>,
    #[arg(long, value_parser = parse_amount)]
    pub hra_percent_of_basic: Option<Decimal>,
    #[arg(long, value_parser = parse_amount)]
    pub standard_allowance_percent: Option<Decimal>,
    #[arg(long, value_parser = parse_amount)]
    pub performance_bonus_percent: Option<Decimal>,
    #[arg(long, value_parser = parse_amount)]
    pub lta_percent: Option<Decimal>,
    /// ISO currency code (e.g. INR).
    #[arg(long)]
    pub currency: Option<String>,
}

impl From<ConfigSetArgs> for CreateConfigurationRequest {
    fn from(args: ConfigSetArgs) -> Self {
        Self {
            pf_employee_percent: args.pf_employee_percent,
            pf_employer_percent: args.pf_employer_percent,
            professional_tax: args.professional_tax,
            basic_percent: args.basic_percent,
            hra_percent_of_basic: args.hra_percent_of_basic,
            standard_allowance_percent: args.standard_allowance_percent,
            performance_bonus_percent: args.performance_bonus_percent,
            lta_percent: args.lta_percent,
            currency: args.currency,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum StructureCommand {
    /// Compute and activate a new structure for an employee.
    Set {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        employee: Uuid,
        /// Monthly wage in the tenant's currency.
        #[arg(long, value_parser = parse_amount)]
        wage: Decimal,
        /// YYYY-MM-DD (default: today).
        #[arg(long)]
        effective_from: Option<String>,
    },
    /// Show an employee's active structure.
    Get {
        #[arg(long)]
        employee: Uuid,
    },
    /// List every structure version for an employee.
    History {
        #[arg(long)]
        employee: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum PayrunCommand {
    /// Generate payroll for every eligible employee for a month.
    Create {
        #[arg(long)]
        tenant: Uuid,
        /// YYYY-MM
        #[arg(long)]
        month: String,
        /// Id of the operator starting the run.
        #[arg(long)]
        initiated_by: Uuid,
    },
    /// List a tenant's payruns, newest first.
    List {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Advance a payrun one status step.
    Complete {
        #[arg(long)]
        payrun: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum PayrollCommand {
    /// Show an employee's payroll for a month.
    Get {
        #[arg(long)]
        employee: Uuid,
        /// YYYY-MM
        #[arg(long)]
        month: String,
    },
    /// Mark a payroll record as paid.
    MarkPaid {
        #[arg(long)]
        payroll: Uuid,
    },
}

fn respond<T: Serialize>(result: Result<T, PayrollError>) -> ApiResponse<Value> {
    match result.map(serde_json::to_value) {
        Ok(Ok(data)) => ApiResponse::success(data),
        Ok(Err(e)) => ApiResponse::error("SERIALIZATION_FAILED", &e.to_string()),
        Err(e) => {
            error!("{}", e);
            ApiResponse::error(e.code(), &e.to_string())
        }
    }
}

/// Run one command against the service.
///
/// `reconcile --watch` never returns from the binary; here it runs a
/// single pass.
pub async fn execute(service: &PayrollService, command: Commands) -> ApiResponse<Value> {
    match command {
        Commands::Config(ConfigCommand::Set(args)) => {
            let tenant = args.tenant;
            let request = CreateConfigurationRequest::from(args);
            respond(service.create_configuration(tenant, &request).await)
        }
        Commands::Config(ConfigCommand::Get { tenant }) => {
            respond(service.get_configuration(tenant).await)
        }

        Commands::Structure(StructureCommand::Set {
            tenant,
            employee,
            wage,
            effective_from,
        }) => {
            let request = CreateSalaryStructureRequest {
                employee_id: employee,
                monthly_wage: wage,
                effective_from,
            };
            respond(service.create_salary_structure(tenant, &request).await)
        }
        Commands::Structure(StructureCommand::Get { employee }) => {
            respond(service.get_salary_structure(employee).await)
        }
        Commands::Structure(StructureCommand::History { employee }) => {
            respond(service.salary_history(employee).await)
        }

        Commands::Payrun(PayrunCommand::Create {
            tenant,
            month,
            initiated_by,
        }) => respond(service.create_payrun(tenant, &month, initiated_by).await),
        Commands::Payrun(PayrunCommand::List { tenant, page, limit }) => {
            respond(service.list_payruns(tenant, &ListPayrunsQuery { page, limit }).await)
        }
        Commands::Payrun(PayrunCommand::Complete { payrun }) => {
            respond(service.complete_run(payrun).await)
        }

        Commands::Payroll(PayrollCommand::Get { employee, month }) => {
            respond(service.get_employee_payroll(employee, &month).await)
        }
        Commands::Payroll(PayrollCommand::MarkPaid { payroll }) => {
            respond(service.mark_as_paid(payroll).await)
        }

        Commands::Reconcile { .. } => respond(service.reconcile_orphans().await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::db::MemoryStore;
    use std::sync::Arc;

    fn parse(args: &[&str]) -> Commands {
        let mut argv = vec!["payroll-admin"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    fn service() -> PayrollService {
        PayrollService::new(Arc::new(MemoryStore::new()), EngineSettings::default())
    }

    #[test]
    fn test_parses_nested_subcommands() {
        let tenant = Uuid::new_v4().to_string();
        let command = parse(&["structure", "set", "--tenant", &tenant, "--employee", &tenant, "--wage", "40,000"]);
        assert!(matches!(
            command,
            Commands::Structure(StructureCommand::Set { wage, .. }) if wage == Decimal::from(40000)
        ));

        assert!(matches!(parse(&["reconcile", "--watch"]), Commands::Reconcile { watch: true }));
        assert!(Cli::try_parse_from(["payroll-admin", "payroll", "get", "--employee", "nope", "--month", "2025-03"]).is_err());
    }

    #[tokio::test]
    async fn test_structure_set_then_get() {
        let service = service();
        let tenant = Uuid::new_v4().to_string();
        let employee = Uuid::new_v4().to_string();

        let response = execute(
            &service,
            parse(&["structure", "set", "--tenant", &tenant, "--employee", &employee, "--wage", "40000"]),
        )
        .await;
        assert!(response.success);

        let response = execute(&service, parse(&["structure", "get", "--employee", &employee])).await;
        let data = response.data.unwrap();
        let amount = |v: &Value| v.as_str().unwrap().parse::<Decimal>().unwrap();
        assert_eq!(amount(&data["monthlyWage"]), Decimal::from(40000));
        assert_eq!(amount(&data["netPay"]), Decimal::from(37880));
        assert_eq!(amount(&data["components"]["fixedAllowance"]["amount"]), Decimal::from(3600));
    }

    #[tokio::test]
    async fn test_errors_use_envelope() {
        let service = service();
        let tenant = Uuid::new_v4().to_string();

        let response = execute(&service, parse(&["config", "get", "--tenant", &tenant])).await;
        assert!(!response.success);
        assert_eq!(response.error.unwrap().code, "NOT_FOUND");

        let response = execute(
            &service,
            parse(&["payrun", "create", "--tenant", &tenant, "--month", "March", "--initiated-by", &tenant]),
        )
        .await;
        assert_eq!(response.error.unwrap().code, "INVALID_INPUT");
    }
}
