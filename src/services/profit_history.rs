//! Calendar-month profit history.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::common::{percent_change, round_change, round_money, MonthKey};
use crate::models::{DailyProfitPoint, MonthlyHistory, MonthlyHistoryItem};

/// Months kept in the history table.
pub const HISTORY_MONTHS: usize = 12;

/// Profit per month, newest month first, at most `limit` months.
pub fn monthly_totals(points: &[DailyProfitPoint], limit: usize) -> Vec<(MonthKey, Decimal)> {
    points
        .iter()
        .fold(BTreeMap::<MonthKey, Decimal>::new(), |mut months, point| {
            let total = months.entry(MonthKey::of(point.date)).or_default();
            *total = total.saturating_add(point.profit);
            months
        })
        .into_iter()
        .rev()
        .take(limit)
        .collect()
}

/// Picks the first maximum and first minimum of `value` in iteration order.
///
/// On a newest-first list ties therefore resolve to the most recent entry.
pub(crate) fn best_and_worst<T: Clone>(
    items: &[T],
    value: impl Fn(&T) -> Decimal,
) -> (Option<T>, Option<T>) {
    let mut iter = items.iter();
    let Some(first) = iter.next() else {
        return (None, None);
    };
    let (best, worst) = iter.fold((first, first), |(best, worst), item| {
        let best = if value(item) > value(best) { item } else { best };
        let worst = if value(item) < value(worst) { item } else { worst };
        (best, worst)
    });
    (Some(best.clone()), Some(worst.clone()))
}

/// Rolls a daily series into the twelve most recent calendar months.
///
/// `change_percent` compares each month with the next older retained month and
/// is zero when that month's profit is not positive.
pub fn monthly_history(points: &[DailyProfitPoint]) -> MonthlyHistory {
    let totals = monthly_totals(points, HISTORY_MONTHS);

    let months: Vec<MonthlyHistoryItem> = totals
        .iter()
        .enumerate()
        .map(|(idx, (key, profit))| {
            let change = totals
                .get(idx + 1)
                .map(|(_, older)| percent_change(*profit, *older))
                .unwrap_or(Decimal::ZERO);
            MonthlyHistoryItem {
                month_label: key.label(),
                year: key.year,
                month_number: key.month,
                profit: round_money(*profit),
                change_percent: round_change(change),
            }
        })
        .collect();

    let (best_month, worst_month) = best_and_worst(&months, |m| m.profit);
    MonthlyHistory {
        months,
        best_month,
        worst_month,
    }
}
