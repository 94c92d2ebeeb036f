use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tenancy::{TenantFilter, TenantKey};

/// Profit realized on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyProfitPoint {
    pub date: NaiveDate,
    pub profit: Decimal,
}

/// Ordinary least squares fit of `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination in `[0, 1]`
    pub r2: f64,
}

impl RegressionResult {
    pub const ZERO: RegressionResult = RegressionResult {
        slope: 0.0,
        intercept: 0.0,
        r2: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

/// Trailing profit split into 0-30, 30-60 and 60-90 day buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitBreakdown {
    pub last30_days: Decimal,
    pub days30to60: Decimal,
    pub days60to90: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthProjection {
    pub current: Decimal,
    pub projected: Decimal,
    pub confidence: f64,
    pub trend: Trend,
    pub days_analyzed: usize,
    pub days_remaining: u32,
    pub breakdown: ProfitBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyHistoryItem {
    /// Display label, e.g. "Ene 2025"
    #[serde(rename = "month")]
    pub month_label: String,
    pub year: i32,
    pub month_number: u32,
    pub profit: Decimal,
    pub change_percent: Decimal,
}

/// Calendar-month profit totals, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyHistory {
    pub months: Vec<MonthlyHistoryItem>,
    pub best_month: Option<MonthlyHistoryItem>,
    pub worst_month: Option<MonthlyHistoryItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiStatus {
    Critical,
    Warning,
    Healthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRoi {
    pub total_inventory_value: Decimal,
    pub monthly_profit: Decimal,
    pub roi_percent: Decimal,
    pub status: RoiStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiHistoryItem {
    #[serde(rename = "month")]
    pub month_label: String,
    pub year: i32,
    pub month_number: u32,
    pub roi_percent: Decimal,
    pub change_percent: Decimal,
    pub profit: Decimal,
    pub inventory_value: Decimal,
    /// True when `inventory_value` came from a stored snapshot rather than today's valuation
    pub from_snapshot: bool,
    pub total_sales: Decimal,
    pub total_purchases: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiHistory {
    pub months: Vec<RoiHistoryItem>,
    pub best_month: Option<RoiHistoryItem>,
    pub worst_month: Option<RoiHistoryItem>,
}

/// Per-product sales totals over the requested range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductProfitSummary {
    pub product_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub name: String,
    pub units_sold: i64,
    pub avg_sale_price: Decimal,
    /// Cost of the most recent sale line seen for the product, not a weighted average
    pub avg_purchase_price: Decimal,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub current_stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInvestmentData {
    pub product_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub avg_sale_price: Decimal,
    pub avg_purchase_price: Decimal,
    pub units_sold: i64,
    pub current_stock: i64,
    pub days_analyzed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Alta,
    Media,
    Baja,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentRecommendation {
    pub product_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub score: Decimal,
    pub priority: Priority,
    pub reason: String,
    pub profit_margin: Decimal,
    pub rotation_speed: Decimal,
    pub avg_sale_price: Decimal,
    pub avg_purchase_price: Decimal,
    pub units_sold: i64,
    pub current_stock: i64,
}

/// Input to the profit analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitAnalysisRequest {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default)]
    pub organization: TenantKey,
    #[serde(default)]
    pub company: TenantKey,
}

impl ProfitAnalysisRequest {
    pub fn tenant_filter(&self) -> TenantFilter {
        TenantFilter::new(self.organization, self.company)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitAnalysisResponse {
    pub top50_profitable: Vec<ProductProfitSummary>,
    pub top50_unprofitable: Vec<ProductProfitSummary>,
    pub month_projection: MonthProjection,
    pub recommendations: Vec<InvestmentRecommendation>,
    pub monthly_history: MonthlyHistory,
    #[serde(rename = "inventoryROI")]
    pub inventory_roi: InventoryRoi,
    pub roi_history: RoiHistory,
}
