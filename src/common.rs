/// Common types and helpers shared across repositories and services
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Inclusive instant range used by every collaborator read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(format!(
                "Invalid date range: {} is after {}",
                from.to_rfc3339(),
                to.to_rfc3339()
            )));
        }
        Ok(Self { from, to })
    }

    /// The `days` days leading up to and including `as_of`.
    pub fn trailing_days(as_of: DateTime<Utc>, days: u32) -> Self {
        Self {
            from: as_of - Duration::days(i64::from(days)),
            to: as_of,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant <= self.to
    }
}

/// Calendar month key, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Short Spanish label, e.g. "Ene 2025".
    pub fn label(&self) -> String {
        let name = self
            .month
            .checked_sub(1)
            .and_then(|idx| MONTH_ABBREVIATIONS.get(idx as usize))
            .copied()
            .unwrap_or("???");
        format!("{} {}", name, self.year)
    }
}

/// Money rounding: 2 decimals, midpoints away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentage-change rounding: 1 decimal, midpoints away from zero.
pub fn round_change(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator * 100`, or zero when the denominator is not positive.
pub fn percent_of(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    numerator
        .checked_div(denominator)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Relative change from `previous` to `current` in percent; zero when `previous` is not positive.
pub fn percent_change(current: Decimal, previous: Decimal) -> Decimal {
    current
        .checked_sub(previous)
        .map(|delta| percent_of(delta, previous))
        .unwrap_or(Decimal::ZERO)
}

/// Number of days in the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}
