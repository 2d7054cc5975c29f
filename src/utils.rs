use crate::error::{RefundError, Result};
use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;

/// Fiscal years begin in April.
pub const FISCAL_YEAR_START_MONTH: u32 = 4;

/// Parses a "YYYY-MM" month string into (year, month).
pub fn parse_month(month: &str) -> Result<(i32, u32)> {
    let start_str = format!("{}-01", month.trim());
    let date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d")
        .map_err(|_| RefundError::InvalidMonth(month.to_string()))?;
    Ok((date.year(), date.month()))
}

/// Returns the fiscal year a calendar month belongs to, named by the calendar
/// year in which it starts. January-March fall in the previous fiscal year.
pub fn fiscal_year_of(year: i32, month: u32) -> i32 {
    if month >= FISCAL_YEAR_START_MONTH {
        year
    } else {
        year - 1
    }
}

/// Returns the 0-based index of the month within the fiscal year.
///
/// # Examples
/// - If FY ends in Dec (12): Jan=0, Feb=1, ..., Dec=11
/// - If FY ends in March (3): Apr=0, May=1, ..., Mar=11
pub fn get_fiscal_month_index(calendar_month: u32, fiscal_year_end_month: u32) -> usize {
    let fy_start_month = if fiscal_year_end_month == 12 {
        1
    } else {
        fiscal_year_end_month + 1
    };

    if calendar_month >= fy_start_month {
        (calendar_month - fy_start_month) as usize
    } else {
        (calendar_month + 12 - fy_start_month) as usize
    }
}

/// Sort key placing a month in fiscal order: (fiscal year, position in year).
pub fn fiscal_sort_key(month: &str) -> Option<(i32, usize)> {
    let (year, month) = parse_month(month).ok()?;
    Some((
        fiscal_year_of(year, month),
        get_fiscal_month_index(month, FISCAL_YEAR_START_MONTH - 1),
    ))
}

/// Orders two month strings in fiscal order: the most recent fiscal year
/// first, and April through March within a fiscal year.
/// Unparseable months sort after all valid ones, by plain string order.
pub fn compare_fiscal_months(a: &str, b: &str) -> Ordering {
    match (fiscal_sort_key(a), fiscal_sort_key(b)) {
        (Some((year_a, idx_a)), Some((year_b, idx_b))) => {
            year_b.cmp(&year_a).then(idx_a.cmp(&idx_b))
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Rounds to the nearest whole currency unit. Halves round up toward
/// positive infinity, so -2.5 becomes -2.
pub fn round_currency(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-04").unwrap(), (2024, 4));
        assert_eq!(parse_month(" 2025-12 ").unwrap(), (2025, 12));
        assert!(matches!(
            parse_month("2024-13"),
            Err(RefundError::InvalidMonth(_))
        ));
        assert!(parse_month("April").is_err());
    }

    #[test]
    fn test_fiscal_month_index() {
        // Standard calendar year (Ends Dec)
        assert_eq!(get_fiscal_month_index(1, 12), 0);
        assert_eq!(get_fiscal_month_index(12, 12), 11);

        // April start (Ends March)
        assert_eq!(get_fiscal_month_index(4, 3), 0);
        assert_eq!(get_fiscal_month_index(12, 3), 8);
        assert_eq!(get_fiscal_month_index(1, 3), 9);
        assert_eq!(get_fiscal_month_index(3, 3), 11);
    }

    #[test]
    fn test_fiscal_year_of() {
        assert_eq!(fiscal_year_of(2024, 4), 2024);
        assert_eq!(fiscal_year_of(2025, 3), 2024);
        assert_eq!(fiscal_year_of(2024, 1), 2023);
    }

    #[test]
    fn test_fiscal_sort() {
        let mut months = vec!["2024-04", "2025-03", "2024-12", "2024-01"];
        months.sort_by(|a, b| compare_fiscal_months(a, b));
        assert_eq!(months, vec!["2024-04", "2024-12", "2025-03", "2024-01"]);
    }

    #[test]
    fn test_fiscal_sort_full_year() {
        let mut months: Vec<String> = (1..=12).map(|m| format!("2025-{:02}", m)).collect();
        months.sort_by(|a, b| compare_fiscal_months(a, b));
        assert_eq!(
            months,
            vec![
                "2025-04", "2025-05", "2025-06", "2025-07", "2025-08", "2025-09", "2025-10",
                "2025-11", "2025-12", "2025-01", "2025-02", "2025-03",
            ]
        );

        let mut fy: Vec<String> = (4..=12)
            .map(|m| format!("2024-{:02}", m))
            .chain((1..=3).map(|m| format!("2025-{:02}", m)))
            .rev()
            .collect();
        fy.sort_by(|a, b| compare_fiscal_months(a, b));
        assert_eq!(fy.first().unwrap(), "2024-04");
        assert_eq!(fy[8], "2024-12");
        assert_eq!(fy[9], "2025-01");
        assert_eq!(fy.last().unwrap(), "2025-03");
    }

    #[test]
    fn test_unparseable_months_sort_last() {
        let mut months = vec!["bad", "2024-05", "2024-04"];
        months.sort_by(|a, b| compare_fiscal_months(a, b));
        assert_eq!(months, vec!["2024-04", "2024-05", "bad"]);
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(7499.5), 7500);
        assert_eq!(round_currency(-2.5), -2);
        assert_eq!(round_currency(-500.5), -500);
        assert_eq!(round_currency(-2.6), -3);
        assert_eq!(round_currency(0.4), 0);
    }
}
