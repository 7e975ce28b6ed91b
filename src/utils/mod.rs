use chrono::{Months, NaiveDate};

/// Round half away from zero to a fixed number of decimal places
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Date with separators stripped, e.g. 2024-01-10 -> "20240110"
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Calendar date `years` before `date`; Feb 29 clamps to Feb 28, out-of-range windows give MIN
pub fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    years
        .checked_mul(12)
        .and_then(|months| date.checked_sub_months(Months::new(months)))
        .unwrap_or(NaiveDate::MIN)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")?)
}

/// Percentage with `places` decimals, None when there is nothing to divide by
pub fn percentage(part: i64, whole: i64, places: u32) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    Some(round_to(part as f64 * 100.0 / whole as f64, places))
}

/// Treat empty or whitespace-only strings as absent
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.666_666, 2), 66.67);
        assert_eq!(round_to(1512.25, 1), 1512.3);
        assert_eq!(round_to(-2.5, 0), -3.0);
    }

    #[test]
    fn test_compact_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(compact_date(date), "20240110");
    }

    #[test]
    fn test_years_before() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(years_before(date, 2), NaiveDate::from_ymd_opt(2024, 10, 19).unwrap());
        let leap = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(years_before(leap, 1), NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
    }

    #[test]
    fn test_years_before_huge_window_is_min() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(years_before(date, 400_000_000), NaiveDate::MIN);
        assert_eq!(years_before(date, u32::MAX), NaiveDate::MIN);
    }

    #[test]
    fn test_percentage_handles_zero_denominator() {
        assert_eq!(percentage(2, 3, 2), Some(66.67));
        assert_eq!(percentage(0, 0, 2), None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  BOS ")), Some("BOS"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
