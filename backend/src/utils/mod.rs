//! # Utilities Module
//!
//! This module contains helper functions for money, dates and paging
//! used across the payroll engine and the admin binary.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Decimal places of the currency's minor unit.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(14, 2)` money column holds.
pub const MAX_MONEY: Decimal = dec!(999999999999.99);

/// Largest rate a `NUMERIC(7, 4)` percentage column holds.
pub const MAX_PERCENT: Decimal = dec!(999.9999);

/// Default page size for payrun listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Round an amount to the minor unit, halves away from zero.
///
/// ## Examples
///
/// ```rust,ignore
/// assert_eq!(round_money(dec!(10.005)), dec!(10.01));
/// assert_eq!(round_money(dec!(-10.005)), dec!(-10.01));
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `percent`% of `base`, rounded to the minor unit.
///
/// `None` when the product overflows `Decimal`.
pub fn percent_of(base: Decimal, percent: Decimal) -> Option<Decimal> {
    base.checked_mul(percent)
        .and_then(|v| v.checked_div(dec!(100)))
        .map(round_money)
}

/// Whether `amount` has no digits below the minor unit.
pub fn is_whole_minor_units(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Format an amount with thousands separators and its currency code.
///
/// ## Examples
///
/// ```rust,ignore
/// assert_eq!(format_amount(dec!(37880), "INR"), "37,880.00 INR");
/// ```
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = round_money(amount);
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let whole: String = grouped.chars().rev().collect();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };

    format!("{}{}.{} {}", sign, whole, frac, currency)
}

/// Parse a decimal amount such as `"40000"` or `"1,234.50"`.
pub fn parse_amount(amount_str: &str) -> Result<Decimal, String> {
    let cleaned = amount_str.trim().replace(',', "");
    cleaned
        .parse::<Decimal>()
        .map_err(|_| format!("Invalid amount: {}", amount_str))
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(date_str: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}': expected YYYY-MM-DD", date_str))
}

/// Validate paging parameters and convert them to `(limit, offset)`.
///
/// `page` defaults to 1 and `limit` to [`DEFAULT_PAGE_LIMIT`].
pub fn page_window(page: Option<u32>, limit: Option<u32>) -> Result<(i64, i64), String> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    if page == 0 {
        return Err("Page must be at least 1".to_string());
    }
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(format!("Limit must be between 1 and {}", MAX_PAGE_LIMIT));
    }

    let offset = (i64::from(page) - 1) * i64::from(limit);
    Ok((i64::from(limit), offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(-10.005)), dec!(-10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec!(40000), dec!(40)), Some(dec!(16000)));
        assert_eq!(percent_of(dec!(12345), dec!(16.67)), Some(dec!(2057.91)));
        assert_eq!(percent_of(Decimal::MAX / dec!(2), dec!(40)), None);
    }

    #[test]
    fn test_is_whole_minor_units() {
        assert!(is_whole_minor_units(dec!(40000)));
        assert!(is_whole_minor_units(dec!(0.01)));
        assert!(is_whole_minor_units(dec!(12.5000)));
        assert!(!is_whole_minor_units(dec!(40000.005)));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec!(37880), "INR"), "37,880.00 INR");
        assert_eq!(format_amount(dec!(0.5), "USD"), "0.50 USD");
        assert_eq!(format_amount(dec!(1234567.891), "INR"), "1,234,567.89 INR");
        assert_eq!(format_amount(dec!(-1200), "INR"), "-1,200.00 INR");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("40000").unwrap(), dec!(40000));
        assert_eq!(parse_amount("1,234.50").unwrap(), dec!(1234.50));
        assert!(parse_amount("forty").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-04-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
        );
        assert!(parse_date("2025-02-30").is_err());
        assert!(parse_date("01/04/2025").is_err());
    }

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(None, None).unwrap(), (10, 0));
        assert_eq!(page_window(Some(3), Some(20)).unwrap(), (20, 40));
        assert!(page_window(Some(0), None).is_err());
        assert!(page_window(None, Some(0)).is_err());
        assert!(page_window(None, Some(101)).is_err());
    }
}
