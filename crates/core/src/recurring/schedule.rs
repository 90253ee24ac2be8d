//! Schedule advancement for recurring jobs.
//!
//! Month-based steps go through chrono's `checked_add_months`, which keeps
//! the day of month and clamps it to the target month's last day, so
//! Jan 31 becomes Feb 28/29 and Feb 29 becomes Feb 28 on common years.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringFrequency::Daily => "DAILY",
            RecurringFrequency::Weekly => "WEEKLY",
            RecurringFrequency::Monthly => "MONTHLY",
            RecurringFrequency::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for RecurringFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurringFrequency {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "DAILY" => Ok(RecurringFrequency::Daily),
            "WEEKLY" => Ok(RecurringFrequency::Weekly),
            "MONTHLY" => Ok(RecurringFrequency::Monthly),
            "YEARLY" => Ok(RecurringFrequency::Yearly),
            other => Err(ValidationError::InvalidFrequency(other.to_string()).into()),
        }
    }
}

/// The instant one period after `from`, keeping the time of day.
pub fn next_run_at(frequency: RecurringFrequency, from: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let next = match frequency {
        RecurringFrequency::Daily => from.checked_add_days(Days::new(1)),
        RecurringFrequency::Weekly => from.checked_add_days(Days::new(7)),
        RecurringFrequency::Monthly => from.checked_add_months(Months::new(1)),
        RecurringFrequency::Yearly => from.checked_add_months(Months::new(12)),
    };
    next.ok_or_else(|| {
        Error::invalid_input(format!(
            "Advancing {} by {} leaves the supported calendar range",
            from, frequency
        ))
    })
}

/// Steps `slot` forward until it lies strictly after `now`.
///
/// Always advances at least once, so a slot in the future still moves by
/// one period.
pub fn advance_past(
    frequency: RecurringFrequency,
    slot: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let mut next = next_run_at(frequency, slot)?;
    while next <= now {
        next = next_run_at(frequency, next)?;
    }
    Ok(next)
}
