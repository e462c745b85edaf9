//! # Salary Structure Calculator
//!
//! Derives a six-component breakdown from a monthly wage.
//!
//! ## Allocation
//!
//! ```text
//! monthly wage
//!   ├── Basic Salary ............ basic% of wage
//!   │     └── HRA ............... hra% of (rounded) basic
//!   ├── Standard Allowance ...... standard% of wage
//!   ├── Performance Bonus ....... bonus% of wage
//!   ├── Leave Travel Allowance .. lta% of wage
//!   └── Fixed Allowance ......... whatever is left
//! ```
//!
//! Each percentage component is rounded to the minor unit before the
//! residual is taken, so the six amounts always sum to the wage exactly.
//! A negative residual is an error, never clamped.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::db::{
    ComponentKind, ComponentRates, SalaryBreakdown, SalaryComponent, SalaryComponents, WageType,
};
use crate::services::errors::PayrollError;
use crate::utils::{is_whole_minor_units, percent_of, MAX_MONEY, MAX_PERCENT};

fn percentage(name: &str, percent: Decimal, amount: Decimal) -> SalaryComponent {
    SalaryComponent {
        name: name.to_string(),
        kind: ComponentKind::Percentage,
        value: percent,
        amount,
    }
}

/// Compute the salary breakdown for `monthly_wage`.
///
/// `rates` of `None` means the built-in defaults (40 / 40 of basic / 15 /
/// 10 / 10). The result is not bound to an employee; persisting it is the
/// caller's job.
///
/// ## Errors
///
/// - `InvalidInput` when `monthly_wage <= 0`, above [`MAX_MONEY`], finer
///   than the minor unit, or a rate is outside `0..=MAX_PERCENT`
/// - `ComponentsExceedWage` when the percentages allocate more than the wage
pub fn compute_structure(
    monthly_wage: Decimal,
    rates: Option<&ComponentRates>,
    currency: &str,
) -> Result<SalaryBreakdown, PayrollError> {
    if monthly_wage <= Decimal::ZERO {
        return Err(PayrollError::InvalidInput(
            "Monthly wage must be greater than zero".to_string(),
        ));
    }
    if monthly_wage > MAX_MONEY {
        return Err(PayrollError::InvalidInput(format!(
            "Monthly wage must not exceed {}",
            MAX_MONEY
        )));
    }
    if !is_whole_minor_units(monthly_wage) {
        return Err(PayrollError::InvalidInput(format!(
            "Monthly wage {} has more than two decimal places",
            monthly_wage
        )));
    }

    let defaults = ComponentRates::default();
    let rates = rates.unwrap_or(&defaults);

    let share = |base: Decimal, name: &str, percent: Decimal| {
        if percent < Decimal::ZERO || percent > MAX_PERCENT {
            return Err(PayrollError::InvalidInput(format!(
                "{} must be between 0 and {} (got {})",
                name, MAX_PERCENT, percent
            )));
        }
        percent_of(base, percent).ok_or_else(|| {
            PayrollError::InvalidInput(format!("{}% of {} is out of range", percent, base))
        })
    };

    let basic = share(monthly_wage, "basicPercent", rates.basic_percent)?;
    let hra = share(basic, "hraPercentOfBasic", rates.hra_percent_of_basic)?;
    let standard = share(monthly_wage, "standardAllowancePercent", rates.standard_allowance_percent)?;
    let bonus = share(monthly_wage, "performanceBonusPercent", rates.performance_bonus_percent)?;
    let lta = share(monthly_wage, "ltaPercent", rates.lta_percent)?;

    let allocated = basic + hra + standard + bonus + lta;
    let residual = monthly_wage - allocated;
    if residual < Decimal::ZERO {
        return Err(PayrollError::ComponentsExceedWage {
            allocated,
            wage: monthly_wage,
        });
    }

    let components = SalaryComponents {
        basic_salary: percentage("Basic Salary", rates.basic_percent, basic),
        house_rent_allowance: percentage("House Rent Allowance", rates.hra_percent_of_basic, hra),
        standard_allowance: percentage(
            "Standard Allowance",
            rates.standard_allowance_percent,
            standard,
        ),
        performance_bonus: percentage("Performance Bonus", rates.performance_bonus_percent, bonus),
        leave_travel_allowance: percentage("Leave Travel Allowance", rates.lta_percent, lta),
        fixed_allowance: SalaryComponent {
            name: "Fixed Allowance".to_string(),
            kind: ComponentKind::Fixed,
            value: residual,
            amount: residual,
        },
    };

    Ok(SalaryBreakdown {
        monthly_wage,
        yearly_wage: monthly_wage * dec!(12),
        wage_type: WageType::Fixed,
        currency: currency.to_string(),
        total_earnings: components.total(),
        components,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_breakdown_of_40000() {
        let breakdown = compute_structure(dec!(40000), None, "INR").unwrap();
        let c = &breakdown.components;

        assert_eq!(c.basic_salary.amount, dec!(16000));
        assert_eq!(c.house_rent_allowance.amount, dec!(6400));
        assert_eq!(c.standard_allowance.amount, dec!(6000));
        assert_eq!(c.performance_bonus.amount, dec!(4000));
        assert_eq!(c.leave_travel_allowance.amount, dec!(4000));
        assert_eq!(c.fixed_allowance.amount, dec!(3600));
        assert_eq!(c.fixed_allowance.value, dec!(3600));
        assert_eq!(c.fixed_allowance.kind, ComponentKind::Fixed);

        assert_eq!(breakdown.total_earnings, dec!(40000));
        assert_eq!(breakdown.yearly_wage, dec!(480000));
        assert_eq!(breakdown.wage_type, WageType::Fixed);
        assert_eq!(breakdown.currency, "INR");
    }

    #[test]
    fn test_non_positive_wage_rejected() {
        for wage in [dec!(0), dec!(-1)] {
            let err = compute_structure(wage, None, "INR").unwrap_err();
            assert!(matches!(err, PayrollError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_huge_wage_rejected() {
        for wage in [Decimal::MAX / dec!(2), MAX_MONEY + dec!(0.01)] {
            let err = compute_structure(wage, None, "INR").unwrap_err();
            assert!(matches!(err, PayrollError::InvalidInput(_)), "wage {}", wage);
        }

        let breakdown = compute_structure(MAX_MONEY, None, "INR").unwrap();
        assert_eq!(breakdown.components.total(), MAX_MONEY);
    }

    #[test]
    fn test_sub_cent_wage_rejected() {
        let err = compute_structure(dec!(40000.005), None, "INR").unwrap_err();
        assert!(matches!(err, PayrollError::InvalidInput(_)));

        // Trailing zeros are not sub-cent precision.
        let breakdown = compute_structure(dec!(40000.0000), None, "INR").unwrap();
        assert_eq!(breakdown.components.fixed_allowance.amount, dec!(3600));
    }

    #[test]
    fn test_out_of_range_rate_rejected() {
        let rates = ComponentRates {
            basic_percent: Decimal::MAX,
            ..ComponentRates::default()
        };
        let err = compute_structure(dec!(40000), Some(&rates), "INR").unwrap_err();
        assert!(matches!(err, PayrollError::InvalidInput(_)));
    }

    #[test]
    fn test_overallocation_rejected() {
        let rates = ComponentRates {
            basic_percent: dec!(50),
            hra_percent_of_basic: dec!(50),
            standard_allowance_percent: dec!(16.67),
            performance_bonus_percent: dec!(8.33),
            lta_percent: dec!(8.33),
        };
        let err = compute_structure(dec!(40000), Some(&rates), "INR").unwrap_err();
        assert!(matches!(err, PayrollError::ComponentsExceedWage { .. }));
    }

    #[test]
    fn test_components_sum_to_wage() {
        let odd_rates = ComponentRates {
            basic_percent: dec!(33.33),
            hra_percent_of_basic: dec!(47.5),
            standard_allowance_percent: dec!(12.345),
            performance_bonus_percent: dec!(7.77),
            lta_percent: dec!(3.1),
        };
        let wages = [
            dec!(0.01),
            dec!(1),
            dec!(999.99),
            dec!(12345.67),
            dec!(40000),
            dec!(87654.33),
            dec!(1000000),
        ];

        for rates in [ComponentRates::default(), odd_rates] {
            for wage in wages {
                let breakdown = compute_structure(wage, Some(&rates), "INR").unwrap();
                assert_eq!(breakdown.components.total(), wage, "wage {}", wage);
                assert_eq!(breakdown.total_earnings, wage);
                assert!(breakdown.components.fixed_allowance.amount >= Decimal::ZERO);
            }
        }
    }

    #[test]
    fn test_hra_uses_rounded_basic() {
        let rates = ComponentRates {
            basic_percent: dec!(33.333),
            hra_percent_of_basic: dec!(50),
            standard_allowance_percent: dec!(0),
            performance_bonus_percent: dec!(0),
            lta_percent: dec!(0),
        };
        let breakdown = compute_structure(dec!(100), Some(&rates), "INR").unwrap();
        // basic 33.333 -> 33.33, HRA 50% of 33.33 = 16.665 -> 16.67
        assert_eq!(breakdown.components.basic_salary.amount, dec!(33.33));
        assert_eq!(breakdown.components.house_rent_allowance.amount, dec!(16.67));
        assert_eq!(breakdown.components.fixed_allowance.amount, dec!(50.00));
    }
}
