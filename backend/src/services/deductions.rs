//! # Deduction Calculator
//!
//! Statutory deductions on a basic salary amount and the net-pay rule
//! shared by structure creation and payrun generation.
//!
//! | Deduction | Basis | Reduces net pay |
//! |-----------|-------|-----------------|
//! | PF (employee) | pf_employee% of basic | yes |
//! | PF (employer) | pf_employer% of basic | no, informational |
//! | Professional tax | flat amount | yes |

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::db::StatutoryRates;
use crate::services::errors::PayrollError;
use crate::utils::{percent_of, round_money};

/// Deductions for one employee-month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deductions {
    pub pf_employee: Decimal,
    pub pf_employer: Decimal,
    pub professional_tax: Decimal,
}

impl Deductions {
    /// Deductions withheld from the employee. Employer PF is excluded.
    pub fn withheld(&self) -> Decimal {
        self.pf_employee + self.professional_tax
    }
}

/// Compute deductions for a basic amount. `None` means 12 / 12 / 200.
///
/// Fails with `InvalidInput` only when a PF share overflows.
pub fn compute_deductions(
    basic: Decimal,
    rates: Option<&StatutoryRates>,
) -> Result<Deductions, PayrollError> {
    let defaults = StatutoryRates::default();
    let rates = rates.unwrap_or(&defaults);
    let pf = |percent: Decimal| {
        percent_of(basic, percent).ok_or_else(|| {
            PayrollError::InvalidInput(format!("PF at {}% of {} is out of range", percent, basic))
        })
    };

    Ok(Deductions {
        pf_employee: pf(rates.pf_employee_percent)?,
        pf_employer: pf(rates.pf_employer_percent)?,
        professional_tax: round_money(rates.professional_tax),
    })
}

/// Gross minus withheld deductions.
///
/// The result is not floored at zero. A negative value is logged and
/// returned as is so batch totals stay exact.
pub fn net_pay(gross: Decimal, deductions: &Deductions) -> Decimal {
    let net = gross - deductions.withheld();
    if net < Decimal::ZERO {
        warn!(
            "Deductions {} exceed gross {}; net pay is negative",
            deductions.withheld(),
            gross
        );
    }
    net
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_deductions() {
        let d = compute_deductions(dec!(16000), None).unwrap();
        assert_eq!(d.pf_employee, dec!(1920));
        assert_eq!(d.pf_employer, dec!(1920));
        assert_eq!(d.professional_tax, dec!(200));
        assert_eq!(d.withheld(), dec!(2120));
    }

    #[test]
    fn test_net_pay_excludes_employer_pf() {
        let d = compute_deductions(dec!(16000), None).unwrap();
        assert_eq!(net_pay(dec!(40000), &d), dec!(37880));
    }

    #[test]
    fn test_configured_rates() {
        let rates = StatutoryRates {
            pf_employee_percent: dec!(10),
            pf_employer_percent: dec!(13.61),
            professional_tax: dec!(0),
        };
        let d = compute_deductions(dec!(12345.67), Some(&rates)).unwrap();
        assert_eq!(d.pf_employee, dec!(1234.57));
        assert_eq!(d.pf_employer, dec!(1680.25));
        assert_eq!(d.professional_tax, dec!(0));
    }

    #[test]
    fn test_net_pay_not_clamped() {
        let d = compute_deductions(dec!(100), None).unwrap();
        assert_eq!(net_pay(dec!(150), &d), dec!(-62));
    }

    #[test]
    fn test_overflowing_rate_is_an_error() {
        let rates = StatutoryRates {
            pf_employee_percent: Decimal::MAX,
            pf_employer_percent: dec!(12),
            professional_tax: dec!(200),
        };
        let err = compute_deductions(dec!(16000), Some(&rates)).unwrap_err();
        assert!(matches!(err, PayrollError::InvalidInput(_)));
    }
}
