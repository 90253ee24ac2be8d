use chrono::{DateTime, Datelike, Months, NaiveDate, SecondsFormat, Utc};

use crate::errors::{Result, ValidationError};

/// Formats the `YYYY-MM` month key a date belongs to.
///
/// Budgets are keyed by this value, so every month lookup must go through here.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parses a `YYYY-MM` month key into its first day.
pub fn parse_month(month: &str) -> Result<NaiveDate> {
    let trimmed = month.trim();
    let well_formed = trimmed.len() == 7
        && trimmed.as_bytes()[4] == b'-'
        && trimmed
            .bytes()
            .enumerate()
            .all(|(i, b)| i == 4 || b.is_ascii_digit());
    if !well_formed {
        return Err(ValidationError::InvalidMonth(month.to_string()).into());
    }
    NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidMonth(month.to_string()).into())
}

/// Returns the first and last day of a `YYYY-MM` month, both inclusive.
pub fn month_bounds(month: &str) -> Result<(NaiveDate, NaiveDate)> {
    let first = parse_month(month)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| ValidationError::InvalidMonth(month.to_string()))?;
    Ok((first, last))
}

/// Formats an instant with a fixed width so that stored values sort lexically.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_key_pads() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(month_key(date), "2024-03");
    }

    #[test]
    fn test_month_bounds_leap_february() {
        let (first, last) = month_bounds("2024-02").unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_month_bounds_december() {
        let (_, last) = month_bounds("2023-12").unwrap();
        assert_eq!(last, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_month_rejects_malformed() {
        for bad in ["2024-13", "2024-1", "24-01", "2024/01", "", "2024-01-01", "abcd-ef"] {
            assert!(parse_month(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_instant_round_trip_keeps_ordering() {
        let early = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let (a, b) = (format_instant(early), format_instant(late));
        assert!(a < b);
        assert_eq!(parse_instant(&a).unwrap(), early);
    }
}
