//! Month-by-month ROI reconstruction.
//!
//! Each month's inventory value comes from its stored snapshot. Months without
//! one fall back to today's valuation, so older ratios mix current stock into
//! past profit.

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use crate::common::{percent_change, percent_of, round_change, round_money, MonthKey};
use crate::models::{InventorySnapshot, MonthlyHistory, RoiHistory, RoiHistoryItem};
use crate::repositories::{PurchaseRecord, SaleRecord};
use crate::services::profit_history::best_and_worst;

/// Sum of sale totals per month.
pub fn sales_by_month(sales: &[SaleRecord]) -> HashMap<MonthKey, Decimal> {
    sales.iter().fold(HashMap::new(), |mut months, sale| {
        let total = months
            .entry(MonthKey::of(sale.created_at.date_naive()))
            .or_insert(Decimal::ZERO);
        *total = total.saturating_add(sale.total);
        months
    })
}

/// Sum of `quantity * price` over purchase lines per month.
pub fn purchases_by_month(purchases: &[PurchaseRecord]) -> HashMap<MonthKey, Decimal> {
    purchases.iter().fold(HashMap::new(), |mut months, purchase| {
        let amount = purchase
            .lines
            .iter()
            .map(|line| {
                line.price
                    .checked_mul(Decimal::from(line.quantity))
                    .unwrap_or(Decimal::ZERO)
            })
            .fold(Decimal::ZERO, Decimal::saturating_add);
        let total = months
            .entry(MonthKey::of(purchase.created_at.date_naive()))
            .or_insert(Decimal::ZERO);
        *total = total.saturating_add(amount);
        months
    })
}

/// Inputs gathered by the orchestrator for [`roi_history`].
#[derive(Debug, Clone, Copy)]
pub struct RoiHistoryInput<'a> {
    pub history: &'a MonthlyHistory,
    pub current_inventory_value: Decimal,
    pub snapshots: &'a [InventorySnapshot],
    pub sales: &'a [SaleRecord],
    pub purchases: &'a [PurchaseRecord],
}

pub fn roi_history(input: RoiHistoryInput<'_>) -> RoiHistory {
    let snapshot_values: HashMap<MonthKey, Decimal> = input
        .snapshots
        .iter()
        .map(|s| {
            (
                MonthKey {
                    year: s.year,
                    month: s.month,
                },
                s.total_inventory_value,
            )
        })
        .collect();
    let sales = sales_by_month(input.sales);
    let purchases = purchases_by_month(input.purchases);

    // (key, profit, inventory value, from snapshot, roi)
    let rows: Vec<(MonthKey, Decimal, Decimal, bool, Decimal)> = input
        .history
        .months
        .iter()
        .map(|month| {
            let key = MonthKey {
                year: month.year,
                month: month.month_number,
            };
            let snapshot = snapshot_values.get(&key).copied();
            let value = snapshot.unwrap_or(input.current_inventory_value);
            let roi = percent_of(month.profit, value);
            (key, month.profit, value, snapshot.is_some(), roi)
        })
        .collect();

    let months: Vec<RoiHistoryItem> = rows
        .iter()
        .enumerate()
        .map(|(idx, &(key, profit, value, from_snapshot, roi))| {
            let change = rows
                .get(idx + 1)
                .map(|older| percent_change(roi, older.4))
                .unwrap_or(Decimal::ZERO);
            debug!(
                month = %key.label(),
                inventory_value = %value,
                from_snapshot,
                roi_percent = %roi,
                "ROI month reconstructed"
            );
            RoiHistoryItem {
                month_label: key.label(),
                year: key.year,
                month_number: key.month,
                roi_percent: round_money(roi),
                change_percent: round_change(change),
                profit: round_money(profit),
                inventory_value: round_money(value),
                from_snapshot,
                total_sales: round_money(sales.get(&key).copied().unwrap_or(Decimal::ZERO)),
                total_purchases: round_money(
                    purchases.get(&key).copied().unwrap_or(Decimal::ZERO),
                ),
            }
        })
        .collect();

    let (best_month, worst_month) = best_and_worst(&months, |m| m.roi_percent);
    RoiHistory {
        months,
        best_month,
        worst_month,
    }
}
