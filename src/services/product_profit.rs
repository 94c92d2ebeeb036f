//! Per-product revenue, cost and profit over a date range.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::common::round_money;
use crate::models::{ProductInvestmentData, ProductProfitSummary};
use crate::repositories::{ProductRecord, SaleRecord};

/// Products with at most this much profit count as unprofitable when overstocked.
const THIN_PROFIT: Decimal = Decimal::ONE_HUNDRED;
const OVERSTOCK: i64 = 10;

/// Sales totals for one product before catalogue enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTotals {
    pub product_id: i64,
    pub units_sold: i64,
    pub revenue: Decimal,
    pub cost: Decimal,
    /// Unit cost of the line from the latest sale seen
    pub last_unit_cost: Decimal,
    last_seen: DateTime<Utc>,
}

impl ProductTotals {
    pub fn profit(&self) -> Decimal {
        self.revenue.saturating_sub(self.cost)
    }
}

/// Groups sale lines by product, keeping first-occurrence order.
pub fn accumulate(sales: &[SaleRecord]) -> Vec<ProductTotals> {
    let mut order: Vec<ProductTotals> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for sale in sales {
        for line in &sale.lines {
            let quantity = Decimal::from(line.quantity);
            let unit_cost = line.unit_cost();
            let revenue = line
                .unit_price
                .checked_mul(quantity)
                .unwrap_or(Decimal::ZERO);
            let cost = unit_cost.checked_mul(quantity).unwrap_or(Decimal::ZERO);

            let slot = *index.entry(line.product_id).or_insert_with(|| {
                order.push(ProductTotals {
                    product_id: line.product_id,
                    units_sold: 0,
                    revenue: Decimal::ZERO,
                    cost: Decimal::ZERO,
                    last_unit_cost: unit_cost,
                    last_seen: sale.created_at,
                });
                order.len() - 1
            });

            let totals = &mut order[slot];
            totals.units_sold = totals.units_sold.saturating_add(line.quantity);
            totals.revenue = totals.revenue.saturating_add(revenue);
            totals.cost = totals.cost.saturating_add(cost);
            if sale.created_at >= totals.last_seen {
                totals.last_seen = sale.created_at;
                totals.last_unit_cost = unit_cost;
            }
        }
    }
    order
}

/// Ids in first-occurrence order.
pub fn product_ids(totals: &[ProductTotals]) -> Vec<i64> {
    totals.iter().map(|t| t.product_id).collect()
}

/// Per-product figures joined with catalogue data, kept at full precision.
///
/// Ranking, the unprofitable filter and investment scoring all run on these
/// values; rounding happens only in [`ProductProfit::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductProfit {
    pub product_id: i64,
    pub sku: Option<String>,
    pub name: String,
    pub units_sold: i64,
    pub avg_sale_price: Decimal,
    pub avg_purchase_price: Decimal,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub current_stock: i64,
}

impl ProductProfit {
    /// Output row with money rounded to cents.
    pub fn summary(&self) -> ProductProfitSummary {
        ProductProfitSummary {
            product_id: self.product_id,
            sku: self.sku.clone(),
            name: self.name.clone(),
            units_sold: self.units_sold,
            avg_sale_price: round_money(self.avg_sale_price),
            avg_purchase_price: round_money(self.avg_purchase_price),
            revenue: round_money(self.revenue),
            cost: round_money(self.cost),
            profit: round_money(self.profit),
            current_stock: self.current_stock,
        }
    }
}

pub fn summaries(products: &[ProductProfit]) -> Vec<ProductProfitSummary> {
    products.iter().map(ProductProfit::summary).collect()
}

/// Attaches catalogue data to accumulated totals.
///
/// Products missing from `catalogue` keep an empty name, no SKU and zero stock.
pub fn enrich(totals: Vec<ProductTotals>, catalogue: &[ProductRecord]) -> Vec<ProductProfit> {
    let by_id: HashMap<i64, &ProductRecord> = catalogue.iter().map(|p| (p.id, p)).collect();

    totals
        .into_iter()
        .map(|t| {
            let product = by_id.get(&t.product_id);
            let avg_sale_price = if t.units_sold > 0 {
                t.revenue
                    .checked_div(Decimal::from(t.units_sold))
                    .unwrap_or(Decimal::ZERO)
            } else {
                Decimal::ZERO
            };
            ProductProfit {
                product_id: t.product_id,
                sku: product.and_then(|p| p.sku.clone()),
                name: product.map(|p| p.name.clone()).unwrap_or_default(),
                units_sold: t.units_sold,
                avg_sale_price,
                avg_purchase_price: t.last_unit_cost,
                profit: t.profit(),
                revenue: t.revenue,
                cost: t.cost,
                current_stock: product.map(|p| p.total_stock()).unwrap_or(0),
            }
        })
        .collect()
}

/// Highest profit first.
pub fn top_profitable(products: &[ProductProfit], limit: usize) -> Vec<ProductProfit> {
    let mut ranked = products.to_vec();
    ranked.sort_by(|a, b| b.profit.cmp(&a.profit));
    ranked.truncate(limit);
    ranked
}

/// Loss makers and overstocked thin-margin products, worst first.
pub fn top_unprofitable(products: &[ProductProfit], limit: usize) -> Vec<ProductProfit> {
    let mut ranked: Vec<ProductProfit> = products
        .iter()
        .filter(|p| {
            p.profit < Decimal::ZERO || (p.profit < THIN_PROFIT && p.current_stock > OVERSTOCK)
        })
        .cloned()
        .collect();
    ranked.sort_by(|a, b| a.profit.cmp(&b.profit));
    ranked.truncate(limit);
    ranked
}

pub fn investment_data(products: &[ProductProfit], days_analyzed: u32) -> Vec<ProductInvestmentData> {
    products
        .iter()
        .map(|p| ProductInvestmentData {
            product_id: p.product_id,
            name: p.name.clone(),
            sku: p.sku.clone(),
            avg_sale_price: p.avg_sale_price,
            avg_purchase_price: p.avg_purchase_price,
            units_sold: p.units_sold,
            current_stock: p.current_stock,
            days_analyzed,
        })
        .collect()
}
