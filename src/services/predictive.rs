//! Daily profit series, least-squares fitting and the month-end projection.
//!
//! Everything here is total: degenerate input produces zeroed output instead
//! of an error or a non-finite number.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::common::{days_in_month, round_money};
use crate::models::{
    DailyProfitPoint, MonthProjection, ProfitBreakdown, RegressionResult, Trend,
};
use crate::repositories::{SaleLine, SaleRecord};

/// Slope magnitude under which the trend counts as flat.
const TREND_THRESHOLD: f64 = 0.01;
const SECONDS_PER_DAY: i64 = 86_400;

/// `quantity * (unit_price - unit_cost)`, zero on overflow.
pub fn line_profit(line: &SaleLine) -> Decimal {
    line.unit_price
        .checked_sub(line.unit_cost())
        .and_then(|margin| margin.checked_mul(Decimal::from(line.quantity)))
        .unwrap_or(Decimal::ZERO)
}

pub fn sale_profit(sale: &SaleRecord) -> Decimal {
    sale.lines
        .iter()
        .map(line_profit)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Sums sale profit per UTC calendar day, oldest day first.
///
/// Days without sales are absent from the output.
pub fn daily_profit(sales: &[SaleRecord]) -> Vec<DailyProfitPoint> {
    sales
        .iter()
        .fold(BTreeMap::<NaiveDate, Decimal>::new(), |mut days, sale| {
            let day = days.entry(sale.created_at.date_naive()).or_default();
            *day = day.saturating_add(sale_profit(sale));
            days
        })
        .into_iter()
        .map(|(date, profit)| DailyProfitPoint { date, profit })
        .collect()
}

/// Ordinary least squares over `(x, y)` pairs.
///
/// Fewer than two points, a zero-variance `x` or any non-finite intermediate
/// yields [`RegressionResult::ZERO`].
pub fn linear_regression(points: &[(f64, f64)]) -> RegressionResult {
    if points.len() < 2 {
        return RegressionResult::ZERO;
    }

    let n = points.len() as f64;
    let (sum_x, sum_y, sum_xy, sum_xx) = points.iter().fold(
        (0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sxy, sxx), &(x, y)| (sx + x, sy + y, sxy + x * y, sxx + x * x),
    );

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 || !denominator.is_finite() {
        return RegressionResult::ZERO;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let (ss_tot, ss_res) = points.iter().fold((0.0, 0.0), |(tot, res), &(x, y)| {
        let predicted = slope * x + intercept;
        (tot + (y - mean_y).powi(2), res + (y - predicted).powi(2))
    });
    let r2 = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    if !(slope.is_finite() && intercept.is_finite() && r2.is_finite()) {
        return RegressionResult::ZERO;
    }

    RegressionResult {
        slope,
        intercept,
        r2: r2.clamp(0.0, 1.0),
    }
}

pub fn classify_trend(slope: f64) -> Trend {
    if slope > TREND_THRESHOLD {
        Trend::Up
    } else if slope < -TREND_THRESHOLD {
        Trend::Down
    } else {
        Trend::Stable
    }
}

/// Whole days elapsed between midnight UTC of `date` and `as_of`.
fn days_before(date: NaiveDate, as_of: DateTime<Utc>) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    (as_of - midnight).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Buckets profit into the last 30, 30-60 and 60-90 days before `as_of`.
///
/// Points older than 90 days or dated after `as_of` are ignored.
pub fn profit_breakdown(points: &[DailyProfitPoint], as_of: DateTime<Utc>) -> ProfitBreakdown {
    let (last30, mid, old) = points.iter().fold(
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        |(last30, mid, old), point| match days_before(point.date, as_of) {
            0..=30 => (last30.saturating_add(point.profit), mid, old),
            31..=60 => (last30, mid.saturating_add(point.profit), old),
            61..=90 => (last30, mid, old.saturating_add(point.profit)),
            _ => (last30, mid, old),
        },
    );

    ProfitBreakdown {
        last30_days: round_money(last30),
        days30to60: round_money(mid),
        days60to90: round_money(old),
    }
}

/// Projects profit for the month containing `as_of` from a trailing daily series.
///
/// Regression inputs are `(position + 1, profit)` in series order, so the
/// caller is expected to pass only the window it wants fitted.
pub fn project_month(points: &[DailyProfitPoint], as_of: DateTime<Utc>) -> MonthProjection {
    if points.is_empty() {
        return MonthProjection::default();
    }

    let current = points
        .iter()
        .map(|p| p.profit)
        .fold(Decimal::ZERO, Decimal::saturating_add);

    let series: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(idx, p)| ((idx + 1) as f64, p.profit.to_f64().unwrap_or(0.0)))
        .collect();
    let regression = linear_regression(&series);

    let today = as_of.date_naive();
    let days_remaining = days_in_month(today).saturating_sub(today.day());

    let n = series.len() as f64;
    let projected_additional = if regression.slope != 0.0 {
        (1..=days_remaining)
            .map(|i| (regression.slope * (n + f64::from(i)) + regression.intercept).max(0.0))
            .sum::<f64>()
    } else {
        0.0
    };
    let projected = Decimal::from_f64(projected_additional)
        .map(|extra| current.saturating_add(extra))
        .unwrap_or(current);

    let trend = classify_trend(regression.slope);
    debug!(
        slope = regression.slope,
        r2 = regression.r2,
        days_remaining,
        ?trend,
        "Month projection fitted"
    );

    MonthProjection {
        current: round_money(current),
        projected: round_money(projected),
        confidence: (regression.r2 * 100.0).round() / 100.0,
        trend,
        days_analyzed: points.len(),
        days_remaining,
        breakdown: profit_breakdown(points, as_of),
    }
}
